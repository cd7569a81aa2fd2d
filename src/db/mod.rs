mod repository;
mod schema;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Recipient;

pub use repository::Repository;

/// Source of digest recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn list_recipients(&self) -> Result<Vec<Recipient>>;
}

/// Read side of the watchlist used by background jobs.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Uppercased, deduplicated symbols; empty when the email is unknown.
    async fn find_symbols_by_email(&self, email: &str) -> Result<Vec<String>>;
}
