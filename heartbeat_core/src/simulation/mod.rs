pub mod lookup;
pub mod probe;
pub mod stages;

pub use lookup::{ItemDetails, ItemLookup};
pub use probe::UpstreamProbe;
pub use stages::{
    CatalogEntry, CatalogSimulator, InventorySimulator, PriceQuote, PricingSimulator, StockLevel,
};
