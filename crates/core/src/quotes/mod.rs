pub mod quotes_model;
pub mod quotes_traits;

pub use quotes_model::Quote;
pub use quotes_traits::QuoteRepositoryTrait;
