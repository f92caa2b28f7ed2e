//! Produces a health verdict, times it and records it as a heartbeat.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::{AppError, Result};
use crate::health::checks::LivenessCheck;
use crate::heartbeat::{HeartbeatRecord, HeartbeatStatus, HeartbeatStore};
use crate::telemetry::{elapsed_ms, traced, SpanRecorder};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub status: HeartbeatStatus,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<LastCheck>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastCheck {
    pub timestamp: DateTime<Utc>,
    pub status: HeartbeatStatus,
    pub response_time_ms: u64,
}

impl From<HeartbeatRecord> for LastCheck {
    fn from(record: HeartbeatRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            status: record.status,
            response_time_ms: record.response_time_ms,
        }
    }
}

pub struct HealthEvaluator {
    store: Arc<dyn HeartbeatStore>,
    liveness: Arc<dyn LivenessCheck>,
    recorder: Arc<dyn SpanRecorder>,
}

impl HealthEvaluator {
    pub fn new(
        store: Arc<dyn HeartbeatStore>,
        liveness: Arc<dyn LivenessCheck>,
        recorder: Arc<dyn SpanRecorder>,
    ) -> Self {
        Self {
            store,
            liveness,
            recorder,
        }
    }

    pub async fn evaluate(&self) -> Result<HealthReport> {
        let attributes = [("health.check", self.liveness.name().to_string())];

        traced(self.recorder.as_ref(), "health.evaluate", &attributes, self.run()).await
    }

    async fn run(&self) -> Result<HealthReport> {
        let started = Instant::now();

        match self.check_and_record(started).await {
            Ok(report) => {
                info!(
                    response_time_ms = report.response_time_ms,
                    had_previous = report.last_check.is_some(),
                    "Health check passed"
                );
                Ok(report)
            }
            Err(err) => {
                let elapsed = elapsed_ms(started);
                error!("Health check failed after {}ms: {}", elapsed, err);

                // Best effort: a failing fallback must not replace the original error.
                if let Err(fallback_err) = self.store.insert(HeartbeatStatus::Unhealthy, elapsed).await {
                    warn!("Could not record unhealthy heartbeat: {}", fallback_err);
                }

                Err(AppError::EvaluationFailed(err.to_string()))
            }
        }
    }

    async fn check_and_record(&self, started: Instant) -> Result<HealthReport> {
        let probe_attributes = [("health.check", self.liveness.name().to_string())];
        let probe = traced(self.recorder.as_ref(), "health.liveness", &probe_attributes, async {
            let report = self.liveness.probe().await;
            if report.healthy {
                Ok(report)
            } else {
                Err(AppError::EvaluationFailed(format!(
                    "liveness check '{}' failed: {}",
                    self.liveness.name(),
                    report.detail
                )))
            }
        })
        .await?;

        let previous = self.store.latest().await?;

        let elapsed = elapsed_ms(started);
        let record = self.store.insert(HeartbeatStatus::Healthy, elapsed).await?;

        tracing::debug!(probe_latency_ms = probe.latency_ms, heartbeat_id = record.id, "Heartbeat recorded");

        Ok(HealthReport {
            status: record.status,
            timestamp: record.timestamp,
            response_time_ms: record.response_time_ms,
            last_check: previous.map(LastCheck::from),
        })
    }
}
