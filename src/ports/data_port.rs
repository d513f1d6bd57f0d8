//! Price data access port.

use crate::domain::error::LadderError;
use crate::domain::price_bar::{Granularity, PriceBar};

/// Supplies ascending, duplicate-free bar series per instrument.
pub trait DataPort: Send + Sync {
    fn fetch_bars(&self, code: &str, granularity: Granularity) -> Result<Vec<PriceBar>, LadderError>;

    fn list_symbols(&self, granularity: Granularity) -> Result<Vec<String>, LadderError>;
}
