//! Simulated catalog, inventory and pricing backends.
//!
//! Each stage sleeps for a random delay inside its own span so a single item
//! lookup produces a realistic tree of nested spans.

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::simulation::probe::UpstreamProbe;
use crate::telemetry::{elapsed_ms, traced, SpanRecorder};

const CATEGORIES: [&str; 4] = ["books", "electronics", "garden", "toys"];
const DISCOUNTS: [u32; 4] = [0, 5, 10, 20];

fn random_delay(config: &SimulationConfig) -> Duration {
    let ms = if config.min_delay_ms >= config.max_delay_ms {
        config.min_delay_ms
    } else {
        rand::thread_rng().gen_range(config.min_delay_ms..=config.max_delay_ms)
    };
    Duration::from_millis(ms)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub category: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockLevel {
    pub quantity: u32,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceQuote {
    pub base_price: f64,
    pub discount_pct: u32,
    pub final_price: f64,
}

#[derive(Clone)]
pub struct CatalogSimulator {
    config: SimulationConfig,
    recorder: Arc<dyn SpanRecorder>,
}

impl CatalogSimulator {
    pub fn new(config: SimulationConfig, recorder: Arc<dyn SpanRecorder>) -> Self {
        Self { config, recorder }
    }

    pub async fn query(&self, item_id: i64) -> Result<CatalogEntry> {
        let entry = CatalogEntry {
            name: format!("Item {}", item_id),
            category: CATEGORIES[item_id.rem_euclid(CATEGORIES.len() as i64) as usize],
        };
        let delay = random_delay(&self.config);
        let attributes = [
            ("item.id", item_id.to_string()),
            ("catalog.table", "products".to_string()),
            ("catalog.category", entry.category.to_string()),
        ];

        traced(self.recorder.as_ref(), "catalog.query", &attributes, async move {
            tokio::time::sleep(delay).await;
            Ok(entry)
        })
        .await
    }
}

#[derive(Clone)]
pub struct InventorySimulator {
    config: SimulationConfig,
    recorder: Arc<dyn SpanRecorder>,
}

impl InventorySimulator {
    pub fn new(config: SimulationConfig, recorder: Arc<dyn SpanRecorder>) -> Self {
        Self { config, recorder }
    }

    pub async fn check(&self, item_id: i64) -> Result<StockLevel> {
        let quantity = rand::thread_rng().gen_range(0..=100u32);
        let level = StockLevel {
            quantity,
            in_stock: quantity > 0,
        };
        let delay = random_delay(&self.config);
        let attributes = [
            ("item.id", item_id.to_string()),
            ("inventory.quantity", level.quantity.to_string()),
            ("inventory.in_stock", level.in_stock.to_string()),
        ];

        traced(self.recorder.as_ref(), "inventory.check", &attributes, async move {
            tokio::time::sleep(delay).await;
            Ok(level)
        })
        .await
    }
}

#[derive(Clone)]
pub struct PricingSimulator {
    config: SimulationConfig,
    recorder: Arc<dyn SpanRecorder>,
}

impl PricingSimulator {
    pub fn new(config: SimulationConfig, recorder: Arc<dyn SpanRecorder>) -> Self {
        Self { config, recorder }
    }

    pub async fn calculate(&self, item_id: i64) -> Result<PriceQuote> {
        let (base_price, discount_pct) = {
            let mut rng = rand::thread_rng();
            (
                round_cents(rng.gen_range(5.0..500.0)),
                DISCOUNTS[rng.gen_range(0..DISCOUNTS.len())],
            )
        };
        let quote = PriceQuote {
            base_price,
            discount_pct,
            final_price: round_cents(base_price * (100 - discount_pct) as f64 / 100.0),
        };
        let delay = random_delay(&self.config);
        let attributes = [
            ("item.id", item_id.to_string()),
            ("pricing.base_price", quote.base_price.to_string()),
            ("pricing.discount_pct", quote.discount_pct.to_string()),
            ("pricing.final_price", quote.final_price.to_string()),
        ];

        traced(self.recorder.as_ref(), "pricing.calculate", &attributes, async move {
            tokio::time::sleep(delay).await;
            Ok(quote)
        })
        .await
    }
}

/// Item used when a stage is exercised as a probe rather than a lookup.
const PROBE_ITEM_ID: i64 = 0;

#[async_trait]
impl UpstreamProbe for CatalogSimulator {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn probe(&self) -> Result<u64> {
        let started = Instant::now();
        self.query(PROBE_ITEM_ID).await?;
        Ok(elapsed_ms(started))
    }
}

#[async_trait]
impl UpstreamProbe for InventorySimulator {
    fn name(&self) -> &'static str {
        "inventory"
    }

    async fn probe(&self) -> Result<u64> {
        let started = Instant::now();
        self.check(PROBE_ITEM_ID).await?;
        Ok(elapsed_ms(started))
    }
}

#[async_trait]
impl UpstreamProbe for PricingSimulator {
    fn name(&self) -> &'static str {
        "pricing"
    }

    async fn probe(&self) -> Result<u64> {
        let started = Instant::now();
        self.calculate(PROBE_ITEM_ID).await?;
        Ok(elapsed_ms(started))
    }
}
