use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Longest heartbeat retention accepted from configuration: ten years.
pub const MAX_RETENTION_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub heartbeat: HeartbeatConfig,
    pub telemetry: TelemetryConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    pub retention_hours: u64,
    pub operation_timeout_ms: u64,
    pub liveness_check: LivenessKind,
}

/// Which liveness check backs `/health`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LivenessKind {
    Database,
    Upstreams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub otlp_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub error_rate: f64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./heartbeats.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 5,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            retention_hours: 24,
            operation_timeout_ms: 5000,
            liveness_check: LivenessKind::Database,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "heartbeat-demo".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            otlp_endpoint: "http://localhost:4318".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            error_rate: 0.1,
            min_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("telemetry.otlp_endpoint", std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok())?
            .set_override_option("telemetry.service_name", std::env::var("OTEL_SERVICE_NAME").ok())?
            .set_override_option("telemetry.environment", std::env::var("DEPLOYMENT_ENVIRONMENT").ok())?;

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "Database min connections cannot exceed max connections".to_string(),
            ));
        }

        if self.heartbeat.retention_hours == 0 {
            return Err(ConfigError::Message(
                "Heartbeat retention must be at least one hour".to_string(),
            ));
        }

        if self.heartbeat.retention_hours > MAX_RETENTION_HOURS {
            return Err(ConfigError::Message(format!(
                "Heartbeat retention cannot exceed {} hours",
                MAX_RETENTION_HOURS
            )));
        }

        if self.heartbeat.operation_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Heartbeat operation timeout must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.service_name.is_empty() {
            return Err(ConfigError::Message(
                "Telemetry service name cannot be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.simulation.error_rate) {
            return Err(ConfigError::Message(
                "Simulation error rate must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.simulation.min_delay_ms > self.simulation.max_delay_ms {
            return Err(ConfigError::Message(
                "Simulation min delay cannot exceed max delay".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Full URL spans would be exported to.
    pub fn otlp_traces_endpoint(&self) -> String {
        format!("{}/v1/traces", self.telemetry.otlp_endpoint.trim_end_matches('/'))
    }
}
