use serde::Serialize;

use crate::config::AppConfig;

/// Identity of this process as attached to every request span.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceResource {
    #[serde(rename = "service.name")]
    pub service_name: String,
    #[serde(rename = "service.version")]
    pub service_version: String,
    #[serde(rename = "deployment.environment")]
    pub environment: String,
}

impl ServiceResource {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            service_name: config.telemetry.service_name.clone(),
            service_version: config.telemetry.service_version.clone(),
            environment: config.telemetry.environment.clone(),
        }
    }
}

impl Default for ServiceResource {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
