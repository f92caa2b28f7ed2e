pub mod clock;
pub mod models;
pub mod store;


pub use clock::{Clock, ManualClock, SystemClock};
pub use models::{HeartbeatRecord, HeartbeatStatus};
pub use store::{HeartbeatStore, SqliteHeartbeatStore};
