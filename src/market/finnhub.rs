use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{FormattedArticle, RawNewsArticle, StockDetails};

use super::format::{
    calculate_news_distribution, date_range, format_article, format_change_percent,
    format_market_cap_value, format_price, validate_article, MAX_ARTICLES,
};
use super::NewsGateway;

const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Default, Deserialize)]
struct Quote {
    /// Current price
    #[serde(default)]
    c: f64,
    /// Percent change
    #[serde(default)]
    dp: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyProfile {
    name: Option<String>,
    /// Millions of USD
    #[serde(rename = "marketCapitalization")]
    market_capitalization: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BasicFinancials {
    #[serde(default)]
    metric: Metrics,
}

#[derive(Debug, Default, Deserialize)]
struct Metrics {
    #[serde(rename = "peNormalizedAnnual")]
    pe_normalized_annual: Option<f64>,
    #[serde(rename = "peTTM")]
    pe_ttm: Option<f64>,
}

pub struct MarketDataClient {
    client: Client,
    api_key: String,
    base_url: String,
    lookback_days: i64,
}

impl MarketDataClient {
    pub fn new(api_key: String, lookback_days: i64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("signalist/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: FINNHUB_BASE_URL.to_string(),
            lookback_days,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let url = format!(
            "{}/{}&token={}",
            self.base_url,
            path_and_query,
            urlencoding::encode(&self.api_key)
        );
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::NewsApi(format!("HTTP {status} for {path_and_query}: {body}")));
        }

        Ok(response.json().await?)
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<RawNewsArticle>> {
        let range = date_range(self.lookback_days, Utc::now());
        self.get_json(&format!(
            "company-news?symbol={}&from={}&to={}",
            urlencoding::encode(symbol),
            range.from,
            range.to
        ))
        .await
    }

    async fn general_news(&self) -> Result<Vec<RawNewsArticle>> {
        self.get_json("news?category=general").await
    }

    pub async fn stock_details(&self, symbol: &str) -> Result<StockDetails> {
        let symbol = symbol.trim().to_uppercase();
        let encoded = urlencoding::encode(&symbol).into_owned();

        let quote_path = format!("quote?symbol={encoded}");
        let profile_path = format!("stock/profile2?symbol={encoded}");
        let metric_path = format!("stock/metric?symbol={encoded}&metric=all");

        let (quote, profile, financials) = tokio::join!(
            self.get_json::<Quote>(&quote_path),
            self.get_json::<CompanyProfile>(&profile_path),
            self.get_json::<BasicFinancials>(&metric_path),
        );

        let quote = quote?;
        if quote.c == 0.0 {
            return Err(AppError::NewsApi(format!("No quote data for {symbol}")));
        }

        // Profile and metrics are decoration; a missing one should not hide the quote.
        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!(%symbol, "profile lookup failed: {e}");
            CompanyProfile::default()
        });
        let financials = financials.unwrap_or_else(|e| {
            tracing::warn!(%symbol, "metric lookup failed: {e}");
            BasicFinancials::default()
        });

        let market_cap = profile.market_capitalization.unwrap_or_default() * 1e6;
        let pe = financials
            .metric
            .pe_ttm
            .or(financials.metric.pe_normalized_annual);

        Ok(StockDetails {
            company: profile
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| symbol.clone()),
            current_price: quote.c,
            change_percent: quote.dp.unwrap_or_default(),
            price_formatted: format_price(quote.c),
            change_formatted: format_change_percent(quote.dp),
            market_cap_formatted: format_market_cap_value(market_cap),
            pe_ratio: pe.map(|p| format!("{p:.1}")).unwrap_or_else(|| "N/A".to_string()),
            symbol,
        })
    }
}

#[async_trait]
impl NewsGateway for MarketDataClient {
    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<FormattedArticle>> {
        let symbols = clean_symbols(symbols);

        if !symbols.is_empty() {
            let fetches = symbols.iter().map(|symbol| async move {
                match self.company_news(symbol).await {
                    Ok(articles) => (symbol.clone(), articles),
                    Err(e) => {
                        tracing::warn!(%symbol, "company news fetch failed: {e}");
                        (symbol.clone(), Vec::new())
                    }
                }
            });
            let per_symbol = join_all(fetches).await;

            let collected = pick_company_news(per_symbol);
            if !collected.is_empty() {
                return Ok(collected);
            }
        }

        let general = self.general_news().await?;
        Ok(pick_general_news(general))
    }
}

/// Trimmed, uppercased, deduplicated, order preserved.
fn clean_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Round-robin across symbols so one busy ticker cannot crowd out the rest.
fn pick_company_news(per_symbol: Vec<(String, Vec<RawNewsArticle>)>) -> Vec<FormattedArticle> {
    let distribution = calculate_news_distribution(per_symbol.len());

    let mut queues: Vec<(String, VecDeque<RawNewsArticle>)> = per_symbol
        .into_iter()
        .map(|(symbol, articles)| {
            let queue = articles
                .into_iter()
                .filter(validate_article)
                .take(distribution.items_per_symbol)
                .collect();
            (symbol, queue)
        })
        .collect();

    let mut collected = Vec::new();
    'rounds: for round in 0..distribution.target_total {
        let mut progressed = false;
        for (symbol, queue) in queues.iter_mut() {
            let Some(article) = queue.pop_front() else {
                continue;
            };
            progressed = true;
            collected.push(format_article(&article, true, Some(symbol.as_str()), round));
            if collected.len() >= distribution.target_total {
                break 'rounds;
            }
        }
        if !progressed {
            break;
        }
    }

    collected.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    collected.truncate(MAX_ARTICLES);
    collected
}

fn pick_general_news(articles: Vec<RawNewsArticle>) -> Vec<FormattedArticle> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(validate_article)
        .filter(|a| {
            seen.insert((
                a.id,
                a.url.clone().unwrap_or_default(),
                a.headline.clone().unwrap_or_default(),
            ))
        })
        .take(MAX_ARTICLES)
        .enumerate()
        .map(|(index, article)| format_article(&article, false, None, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, headline: &str, datetime: i64) -> RawNewsArticle {
        RawNewsArticle {
            id,
            headline: Some(headline.to_string()),
            summary: Some(format!("{headline} summary")),
            url: Some(format!("https://news.example.com/{id}")),
            datetime: Some(datetime),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stock_details_reports_unreachable_quote_service() {
        let mut client = MarketDataClient::new("key".to_string(), 5).unwrap();
        client.base_url = "http://127.0.0.1:9".to_string();

        let result = client.stock_details(" aapl ").await;

        assert!(matches!(result, Err(AppError::Http(_))));
    }

    #[test]
    fn clean_symbols_dedupes_case_insensitively() {
        let input = vec![" aapl ".to_string(), "AAPL".into(), "".into(), "msft".into()];
        assert_eq!(clean_symbols(&input), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn single_symbol_gets_three_articles() {
        let articles = (0..10).map(|i| article(i, &format!("a{i}"), 1000 + i)).collect();
        let picked = pick_company_news(vec![("AAPL".into(), articles)]);

        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|a| a.related == "AAPL" && a.category == "company"));
    }

    #[test]
    fn three_symbols_get_two_each_newest_first() {
        let per_symbol = ["AAPL", "MSFT", "TSLA"]
            .iter()
            .enumerate()
            .map(|(s, sym)| {
                let base = (s as i64) * 100;
                let list = (0..5).map(|i| article(base + i, &format!("{sym}{i}"), base + i)).collect();
                (sym.to_string(), list)
            })
            .collect();

        let picked = pick_company_news(per_symbol);

        assert_eq!(picked.len(), 6);
        for sym in ["AAPL", "MSFT", "TSLA"] {
            assert_eq!(picked.iter().filter(|a| a.related == sym).count(), 2);
        }
        assert!(picked.windows(2).all(|w| w[0].datetime >= w[1].datetime));
    }

    #[test]
    fn many_symbols_cap_at_six() {
        let per_symbol = (0..9)
            .map(|s| (format!("S{s}"), vec![article(s, "h", 10 + s)]))
            .collect();
        assert_eq!(pick_company_news(per_symbol).len(), 6);
    }

    #[test]
    fn invalid_company_articles_are_skipped() {
        let mut broken = article(1, "broken", 5);
        broken.url = None;
        let picked = pick_company_news(vec![("AAPL".into(), vec![broken])]);
        assert!(picked.is_empty());
    }

    #[test]
    fn general_news_is_deduplicated_and_capped() {
        let mut articles = vec![article(1, "dup", 1), article(1, "dup", 1)];
        articles.extend((2..30).map(|i| article(i, &format!("g{i}"), i)));

        let picked = pick_general_news(articles);

        assert_eq!(picked.len(), 6);
        assert_eq!(picked[0].id, 1);
        assert_eq!(picked[1].id, 3); // provider id 2 + position 1
        assert!(picked.iter().all(|a| a.category == "general"));
    }

    #[test]
    fn news_payload_deserializes() {
        let body = r#"[{"category":"company","datetime":1760000000,"headline":"Apple rises",
            "id":7,"image":"","related":"AAPL","source":"Reuters","summary":"Up.","url":"https://x"}]"#;
        let parsed: Vec<RawNewsArticle> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed[0].related.as_deref(), Some("AAPL"));
        assert!(validate_article(&parsed[0]));
    }
}
