pub mod settings;

pub use settings::{
    AppConfig, DatabaseConfig, HeartbeatConfig, LivenessKind, ServerConfig, SimulationConfig, TelemetryConfig,
};
