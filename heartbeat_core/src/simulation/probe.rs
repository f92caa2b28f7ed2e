use async_trait::async_trait;

use crate::error::Result;

/// A dependency that can be exercised on demand.
///
/// `probe` succeeds with the observed latency in milliseconds, or fails with
/// the reason the dependency could not be reached.
#[async_trait]
pub trait UpstreamProbe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self) -> Result<u64>;
}
