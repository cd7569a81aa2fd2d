use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use futures::future::join_all;

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::jobs::{start_digest_schedule, DigestPipeline, OnboardingPipeline};
use crate::mail::HttpEmailClient;
use crate::market::{format_time_ago, MarketDataClient, NewsGateway};
use crate::models::{JobOutcome, SignUpEvent, StockDetails, WatchlistAdd, WatchlistEntry};

/// Watchlist row enriched with live quote data when the lookup succeeds.
pub struct WatchlistRow {
    pub entry: WatchlistEntry,
    pub details: Option<StockDetails>,
}

pub struct App {
    config: Config,
    repository: Arc<Repository>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        Ok(Self { config, repository })
    }

    fn market(&self) -> Result<Arc<MarketDataClient>> {
        let key = Config::require(&self.config.finnhub_api_key, "finnhub_api_key")?;
        Ok(Arc::new(MarketDataClient::new(
            key.to_string(),
            self.config.news_lookback_days,
        )?))
    }

    fn summarizer(&self) -> Result<Arc<GeminiClient>> {
        let key = Config::require(&self.config.gemini_api_key, "gemini_api_key")?;
        let client = GeminiClient::new(key.to_string(), self.config.gemini_model.clone())?;
        tracing::debug!(model = client.model_version(), "inference client ready");
        Ok(Arc::new(client))
    }

    fn mailer(&self) -> Result<Arc<HttpEmailClient>> {
        let key = Config::require(&self.config.email_api_key, "email_api_key")?;
        Ok(Arc::new(HttpEmailClient::new(
            self.config.email_api_url.clone(),
            key.to_string(),
            self.config.email_from.clone(),
        )?))
    }

    pub fn digest_pipeline(&self) -> Result<DigestPipeline> {
        Ok(DigestPipeline::new(
            self.repository.clone(),
            self.repository.clone(),
            self.market()?,
            self.summarizer()?,
            self.mailer()?,
        )
        .with_concurrency(self.config.summary_concurrency))
    }

    /// `app/send/daily.news`
    pub async fn run_digest(&self) -> Result<JobOutcome> {
        self.digest_pipeline()?.run().await
    }

    /// Run the digest on the configured cron until Ctrl-C.
    pub async fn run_schedule(&self) -> Result<()> {
        let pipeline = Arc::new(self.digest_pipeline()?);
        let mut scheduler = start_digest_schedule(&self.config.digest_cron, pipeline).await?;

        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
        tracing::info!("shutting down scheduler");
        scheduler.shutdown().await?;
        Ok(())
    }

    /// Store the new user, then handle `app/user.created`.
    pub async fn sign_up(&self, event: SignUpEvent) -> Result<JobOutcome> {
        self.repository.upsert_user(&event).await?;
        if let Some(timezone) = self.repository.get_user_timezone(&event.email).await? {
            tracing::info!(email = %event.email, %timezone, "user stored");
        }

        let onboarding = OnboardingPipeline::new(self.summarizer()?, self.mailer()?);
        onboarding.run(&event).await
    }

    pub async fn add_to_watchlist(
        &self,
        email: &str,
        symbol: &str,
        company: Option<&str>,
    ) -> Result<WatchlistAdd> {
        let company = company.unwrap_or(symbol);
        self.repository.add_to_watchlist(email, symbol, company).await
    }

    pub async fn remove_from_watchlist(&self, email: &str, symbol: &str) -> Result<bool> {
        self.repository.remove_from_watchlist(email, symbol).await
    }

    pub async fn watchlist(&self, email: &str) -> Result<Vec<WatchlistEntry>> {
        self.repository.get_user_watchlist(email).await
    }

    pub async fn watchlist_with_data(&self, email: &str) -> Result<Vec<WatchlistRow>> {
        let entries = self.repository.get_user_watchlist(email).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let market = self.market()?;
        let lookups = entries.iter().map(|entry| market.stock_details(&entry.symbol));
        let details = join_all(lookups).await;

        Ok(entries
            .into_iter()
            .zip(details)
            .map(|(entry, details)| {
                let details = match details {
                    Ok(d) => Some(d),
                    Err(e) => {
                        tracing::warn!(symbol = %entry.symbol, "Failed to fetch data: {e}");
                        None
                    }
                };
                WatchlistRow { entry, details }
            })
            .collect())
    }

    /// One line per article, newest first, with a relative timestamp.
    pub async fn news_lines(&self, symbols: &[String]) -> Result<Vec<String>> {
        let articles = self.market()?.fetch_news(symbols).await?;
        let now = Utc::now();
        Ok(articles
            .into_iter()
            .map(|a| {
                format!(
                    "[{}] {} ({}, {})\n    {}",
                    a.related,
                    a.headline,
                    a.source,
                    format_time_ago(a.datetime, now),
                    a.url
                )
            })
            .collect())
    }
}
