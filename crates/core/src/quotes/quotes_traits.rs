use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::quotes::quotes_model::Quote;
use crate::utils::time_utils::DateRange;

/// Storage interface for daily close prices.
#[async_trait]
pub trait QuoteRepositoryTrait: Send + Sync {
    /// Inserts or replaces quotes keyed on (symbol, date).
    async fn upsert_quotes(&self, quotes: Vec<Quote>) -> Result<()>;

    async fn get_quote(&self, symbol: &str, date: NaiveDate) -> Result<Option<Quote>>;

    /// Quotes for a symbol within the range, date ascending.
    async fn get_quotes_in_range(&self, symbol: &str, range: DateRange) -> Result<Vec<Quote>>;
}
