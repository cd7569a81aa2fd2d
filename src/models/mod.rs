mod article;
mod outcome;
mod stock;
mod user;
mod watchlist;

pub use article::{FormattedArticle, RawNewsArticle};
pub use outcome::{DigestStats, JobOutcome};
pub use stock::StockDetails;
pub use user::{Recipient, SignUpEvent, UserProfile};
pub use watchlist::{WatchlistAdd, WatchlistEntry};
