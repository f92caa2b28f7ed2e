use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::{AppError, Result};
use crate::simulation::stages::{CatalogSimulator, InventorySimulator, PricingSimulator};
use crate::telemetry::{traced, SpanRecorder};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemDetails {
    pub item_id: i64,
    pub name: String,
    pub category: &'static str,
    pub in_stock: bool,
    pub quantity: u32,
    pub price: f64,
}

/// Multi-stage item lookup: catalog, then inventory, then pricing.
#[derive(Clone)]
pub struct ItemLookup {
    catalog: CatalogSimulator,
    inventory: InventorySimulator,
    pricing: PricingSimulator,
    recorder: Arc<dyn SpanRecorder>,
    error_rate: f64,
}

impl ItemLookup {
    pub fn new(config: &SimulationConfig, recorder: Arc<dyn SpanRecorder>) -> Self {
        Self {
            catalog: CatalogSimulator::new(config.clone(), recorder.clone()),
            inventory: InventorySimulator::new(config.clone(), recorder.clone()),
            pricing: PricingSimulator::new(config.clone(), recorder.clone()),
            recorder,
            error_rate: usable_error_rate(config.error_rate),
        }
    }

    pub async fn lookup(&self, item_id: i64) -> Result<ItemDetails> {
        let attributes = [("item.id", item_id.to_string())];

        traced(self.recorder.as_ref(), "item.lookup", &attributes, async {
            let inject_failure = rand::thread_rng().gen_bool(self.error_rate);
            if inject_failure {
                warn!(item_id, "Injected upstream failure");
                return Err(AppError::UpstreamFailed(format!(
                    "simulated failure while looking up item {}",
                    item_id
                )));
            }

            let entry = self.catalog.query(item_id).await?;
            let stock = self.inventory.check(item_id).await?;
            let quote = self.pricing.calculate(item_id).await?;

            info!(item_id, price = quote.final_price, in_stock = stock.in_stock, "Item lookup completed");

            Ok(ItemDetails {
                item_id,
                name: entry.name,
                category: entry.category,
                in_stock: stock.in_stock,
                quantity: stock.quantity,
                price: quote.final_price,
            })
        })
        .await
    }
}

/// Probability accepted by `gen_bool`; anything non-finite disables injection.
fn usable_error_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
