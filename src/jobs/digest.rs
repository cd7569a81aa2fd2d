use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::ai::prompts::{fill, NEWS_SUMMARY_EMAIL_PROMPT};
use crate::ai::SummarizationGateway;
use crate::db::{RecipientDirectory, WatchlistStore};
use crate::error::Result;
use crate::mail::{DigestEmail, EmailGateway};
use crate::market::{formatted_today_date, today_string, NewsGateway, MAX_ARTICLES};
use crate::models::{DigestStats, FormattedArticle, JobOutcome, Recipient};

pub const NO_USERS_MESSAGE: &str = "No users found for news email";
pub const DIGEST_SENT_MESSAGE: &str = "Daily news summary emails sent successfully";

enum Delivery {
    Sent,
    Skipped,
    Failed(String),
}

/// Daily news digest: one personalized summary email per recipient.
///
/// Failures are isolated per recipient. A broken watchlist lookup counts as
/// an empty watchlist, so that recipient still gets general news. A broken
/// news fetch or summary leaves the recipient without an email, and a failed
/// send is logged without cancelling the other sends.
pub struct DigestPipeline {
    recipients: Arc<dyn RecipientDirectory>,
    watchlists: Arc<dyn WatchlistStore>,
    news: Arc<dyn NewsGateway>,
    summarizer: Arc<dyn SummarizationGateway>,
    mailer: Arc<dyn EmailGateway>,
    concurrency: usize,
}

impl DigestPipeline {
    pub fn new(
        recipients: Arc<dyn RecipientDirectory>,
        watchlists: Arc<dyn WatchlistStore>,
        news: Arc<dyn NewsGateway>,
        summarizer: Arc<dyn SummarizationGateway>,
        mailer: Arc<dyn EmailGateway>,
    ) -> Self {
        Self {
            recipients,
            watchlists,
            news,
            summarizer,
            mailer,
            concurrency: 1,
        }
    }

    /// Recipients fetched and summarized at once; 1 is sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self) -> Result<JobOutcome> {
        let recipients = self.recipients.list_recipients().await?;

        if recipients.is_empty() {
            tracing::warn!("daily-news: no recipients");
            return Ok(JobOutcome::failed(NO_USERS_MESSAGE));
        }

        tracing::info!(run_date = %today_string(), recipients = recipients.len(), "daily-news: starting");

        let mut stats = DigestStats {
            recipients: recipients.len(),
            ..DigestStats::default()
        };

        let prepared: Vec<(Recipient, Option<String>)> = stream::iter(recipients)
            .map(|recipient| async move {
                let articles = self.articles_for(&recipient).await;
                let summary = self.summarize(&recipient, &articles).await;
                (recipient, articles.len(), summary)
            })
            .buffered(self.concurrency)
            .map(|(recipient, article_count, summary)| {
                if article_count > 0 {
                    stats.with_articles += 1;
                }
                if summary.is_some() {
                    stats.summarized += 1;
                }
                (recipient, summary)
            })
            .collect()
            .await;

        let date = formatted_today_date();
        let sends = prepared
            .iter()
            .map(|(recipient, summary)| self.deliver(recipient, summary.as_deref(), &date));
        let deliveries = join_all(sends).await;

        for ((recipient, _), delivery) in prepared.iter().zip(deliveries) {
            match delivery {
                Delivery::Sent => stats.sent += 1,
                Delivery::Skipped => {}
                Delivery::Failed(reason) => {
                    stats.failed += 1;
                    tracing::error!(email = %recipient.email, "daily-news: failed to send email: {reason}");
                }
            }
        }

        tracing::info!(
            recipients = stats.recipients,
            with_articles = stats.with_articles,
            summarized = stats.summarized,
            sent = stats.sent,
            failed = stats.failed,
            "daily-news: finished"
        );

        Ok(JobOutcome::ok(DIGEST_SENT_MESSAGE))
    }

    /// Watchlist news capped at [`MAX_ARTICLES`], general news when the
    /// watchlist yields nothing, empty on any error.
    async fn articles_for(&self, recipient: &Recipient) -> Vec<FormattedArticle> {
        match self.try_articles_for(recipient).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!(email = %recipient.email, "daily-news: error preparing user news: {e}");
                Vec::new()
            }
        }
    }

    async fn try_articles_for(&self, recipient: &Recipient) -> Result<Vec<FormattedArticle>> {
        let symbols = match self.watchlists.find_symbols_by_email(&recipient.email).await {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::error!(email = %recipient.email, "daily-news: watchlist lookup failed: {e}");
                Vec::new()
            }
        };

        let mut articles = self.news.fetch_news(&symbols).await?;
        articles.truncate(MAX_ARTICLES);

        if articles.is_empty() && !symbols.is_empty() {
            tracing::debug!(email = %recipient.email, "daily-news: no watchlist news, using general news");
            articles = self.news.fetch_news(&[]).await?;
            articles.truncate(MAX_ARTICLES);
        }

        Ok(articles)
    }

    async fn summarize(&self, recipient: &Recipient, articles: &[FormattedArticle]) -> Option<String> {
        if articles.is_empty() {
            return None;
        }

        let news_data = match serde_json::to_string_pretty(articles) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(email = %recipient.email, "daily-news: failed to encode articles: {e}");
                return None;
            }
        };
        let prompt = fill(NEWS_SUMMARY_EMAIL_PROMPT, "newsData", &news_data);

        match self.summarizer.infer(&prompt).await {
            Ok(response) => {
                let text = response.first_text().map(str::to_string);
                if text.is_none() {
                    tracing::warn!(email = %recipient.email, "daily-news: summary response had no text");
                }
                text
            }
            Err(e) => {
                tracing::error!(email = %recipient.email, "daily-news: failed to summarize news: {e}");
                None
            }
        }
    }

    async fn deliver(&self, recipient: &Recipient, summary: Option<&str>, date: &str) -> Delivery {
        let Some(content) = summary else {
            return Delivery::Skipped;
        };

        let email = DigestEmail {
            email: recipient.email.clone(),
            name: recipient.name.clone(),
            date: date.to_string(),
            content: content.to_string(),
        };

        match self.mailer.send_digest(&email).await {
            Ok(()) => Delivery::Sent,
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}
