use serde::{Deserialize, Serialize};

/// News item as returned by the market-data provider. Every field is optional
/// on the wire; use `market::validate_article` before formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNewsArticle {
    #[serde(default)]
    pub id: i64,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    /// Unix seconds.
    pub datetime: Option<i64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub related: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedArticle {
    pub id: i64,
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub datetime: i64,
    pub image: String,
    pub category: String,
    pub related: String,
}
