//! Pluggable liveness checks consulted by the health evaluator

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::database::DatabaseManager;
use crate::simulation::UpstreamProbe;
use crate::telemetry::elapsed_ms;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProbeReport {
    pub healthy: bool,
    pub latency_ms: u64,
    pub detail: String,
}

impl ProbeReport {
    pub fn healthy(detail: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            healthy: true,
            latency_ms,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            healthy: false,
            latency_ms,
            detail: detail.into(),
        }
    }
}

/// Decides whether the service should currently report healthy.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    async fn probe(&self) -> ProbeReport;
    fn name(&self) -> &str;
}

/// Healthy when the heartbeat database answers a trivial query.
pub struct DatabaseLivenessCheck {
    db: DatabaseManager,
}

impl DatabaseLivenessCheck {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LivenessCheck for DatabaseLivenessCheck {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();

        match self.db.ping().await {
            Ok(()) => ProbeReport::healthy(
                "Database connection successful",
                elapsed_ms(start),
            ),
            Err(e) => ProbeReport::unhealthy(
                format!("Database connection failed: {}", e),
                elapsed_ms(start),
            ),
        }
    }

    fn name(&self) -> &str {
        "database"
    }
}

/// Healthy when every upstream probe succeeds; latency is the slowest probe.
pub struct UpstreamLivenessCheck {
    probes: Vec<Arc<dyn UpstreamProbe>>,
}

impl UpstreamLivenessCheck {
    pub fn new(probes: Vec<Arc<dyn UpstreamProbe>>) -> Self {
        Self { probes }
    }
}

#[async_trait]
impl LivenessCheck for UpstreamLivenessCheck {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();
        let mut slowest = 0;

        for probe in &self.probes {
            match probe.probe().await {
                Ok(latency_ms) => slowest = slowest.max(latency_ms),
                Err(e) => {
                    return ProbeReport::unhealthy(
                        format!("Upstream '{}' failed: {}", probe.name(), e),
                        elapsed_ms(start),
                    );
                }
            }
        }

        ProbeReport::healthy(format!("{} upstreams reachable", self.probes.len()), slowest)
    }

    fn name(&self) -> &str {
        "upstreams"
    }
}

/// Always reports the verdict it was built with.
pub struct StaticLivenessCheck {
    healthy: bool,
}

impl StaticLivenessCheck {
    pub fn healthy() -> Self {
        Self { healthy: true }
    }

    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }
}

#[async_trait]
impl LivenessCheck for StaticLivenessCheck {
    async fn probe(&self) -> ProbeReport {
        if self.healthy {
            ProbeReport::healthy("static check passed", 0)
        } else {
            ProbeReport::unhealthy("static check configured to fail", 0)
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
