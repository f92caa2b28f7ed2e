pub mod health;
pub mod items;
pub mod routes;

pub use routes::create_routes;
