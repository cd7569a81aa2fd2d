mod finnhub;
mod format;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::FormattedArticle;

pub use finnhub::MarketDataClient;
pub use format::{
    format_time_ago, formatted_today_date, pick_timezone_from_country, today_string,
    MAX_ARTICLES,
};

/// Market news source. An empty symbol list asks for general market news.
#[async_trait]
pub trait NewsGateway: Send + Sync {
    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<FormattedArticle>>;
}
