use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Healthy,
    Unhealthy,
}

impl HeartbeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatStatus::Healthy => "healthy",
            HeartbeatStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HeartbeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeartbeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HeartbeatStatus::Healthy),
            "unhealthy" => Ok(HeartbeatStatus::Unhealthy),
            other => Err(format!("unknown heartbeat status '{}'", other)),
        }
    }
}

/// One recorded outcome of a health evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub status: HeartbeatStatus,
    pub response_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [HeartbeatStatus::Healthy, HeartbeatStatus::Unhealthy] {
            assert_eq!(status.as_str().parse::<HeartbeatStatus>().unwrap(), status);
        }
        assert!("degraded".parse::<HeartbeatStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(HeartbeatStatus::Unhealthy).unwrap(), "unhealthy");
        assert_eq!(HeartbeatStatus::Healthy.to_string(), "healthy");
    }
}
