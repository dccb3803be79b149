//! External daily price sources.
//!
//! The store only talks to a [`PriceSource`]; the concrete vendor is chosen at
//! runtime and can be swapped for an in-memory source in tests.

pub mod yahoo;

pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use crate::types::{Bar, DateRange};
use async_trait::async_trait;

/// A vendor of daily OHLCV bars.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch daily bars for `symbol` within `range` (inclusive).
    ///
    /// An empty vector means the source had no rows for the range;
    /// transport failures are returned as errors.
    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<Bar>>;
}
