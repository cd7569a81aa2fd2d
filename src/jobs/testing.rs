//! In-memory gateways for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::ai::{InferenceResponse, SummarizationGateway};
use crate::db::{RecipientDirectory, WatchlistStore};
use crate::error::{AppError, Result};
use crate::mail::{DigestEmail, EmailGateway, WelcomeEmail};
use crate::market::NewsGateway;
use crate::models::{FormattedArticle, Recipient};

pub fn recipient(email: &str, name: &str) -> Recipient {
    Recipient {
        email: email.to_string(),
        name: name.to_string(),
    }
}

pub fn news(id: i64, related: &str) -> FormattedArticle {
    FormattedArticle {
        id,
        headline: format!("Headline {id}"),
        summary: format!("Summary {id}..."),
        source: "Wire".to_string(),
        url: format!("https://news.example.com/{id}"),
        datetime: 1_760_000_000 + id,
        image: String::new(),
        category: if related.is_empty() { "general" } else { "company" }.to_string(),
        related: related.to_string(),
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub recipients: Vec<Recipient>,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl RecipientDirectory for FakeDirectory {
    async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.recipients.clone())
    }
}

#[derive(Default)]
pub struct FakeWatchlists {
    pub symbols: HashMap<String, Vec<String>>,
    pub failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl WatchlistStore for FakeWatchlists {
    async fn find_symbols_by_email(&self, email: &str) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(email.to_string());
        if self.failing.contains(email) {
            return Err(AppError::Config(format!("watchlist lookup failed for {email}")));
        }
        Ok(self.symbols.get(email).cloned().unwrap_or_default())
    }
}

/// Serves canned company news per symbol and a general feed for empty
/// symbol lists. Any request containing a symbol in `failing` errors.
#[derive(Default)]
pub struct FakeNews {
    pub by_symbol: HashMap<String, Vec<FormattedArticle>>,
    pub general: Vec<FormattedArticle>,
    pub failing: HashSet<String>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl NewsGateway for FakeNews {
    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<FormattedArticle>> {
        self.calls.lock().unwrap().push(symbols.to_vec());
        if symbols.iter().any(|s| self.failing.contains(s)) {
            return Err(AppError::NewsApi("boom".to_string()));
        }
        if symbols.is_empty() {
            return Ok(self.general.clone());
        }
        Ok(symbols
            .iter()
            .flat_map(|s| self.by_symbol.get(s).cloned().unwrap_or_default())
            .collect())
    }
}

pub enum SummaryMode {
    /// Reply with a short text giving the prompt length.
    Echo,
    /// Reply without any usable text.
    Empty,
    /// Every call errors.
    Error,
}

pub struct FakeSummarizer {
    pub mode: SummaryMode,
    /// Prompts containing any of these markers error regardless of mode.
    pub failing_markers: Vec<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn new(mode: SummaryMode) -> Self {
        Self {
            mode,
            failing_markers: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SummarizationGateway for FakeSummarizer {
    async fn infer(&self, prompt: &str) -> Result<InferenceResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.failing_markers.iter().any(|m| prompt.contains(m.as_str())) {
            return Err(AppError::InferenceApi("quota exceeded".to_string()));
        }
        match self.mode {
            SummaryMode::Echo => Ok(InferenceResponse::from_text(format!(
                "<p>{} chars of news</p>",
                prompt.len()
            ))),
            SummaryMode::Empty => Ok(InferenceResponse::default()),
            SummaryMode::Error => Err(AppError::InferenceApi("unavailable".to_string())),
        }
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub failing: HashSet<String>,
    /// Digest sends to this address wait for the notify before completing.
    pub held: Option<(String, Arc<Notify>)>,
    pub welcome: Mutex<Vec<WelcomeEmail>>,
    pub digests: Mutex<Vec<DigestEmail>>,
    pub attempts: Mutex<Vec<String>>,
}

impl FakeMailer {
    fn attempt(&self, email: &str) -> Result<()> {
        self.attempts.lock().unwrap().push(email.to_string());
        if self.failing.contains(email) {
            return Err(AppError::EmailApi(format!("mailbox unavailable: {email}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailGateway for FakeMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<()> {
        self.attempt(&email.email)?;
        self.welcome.lock().unwrap().push(email.clone());
        Ok(())
    }

    async fn send_digest(&self, email: &DigestEmail) -> Result<()> {
        self.attempt(&email.email)?;
        if let Some((address, release)) = &self.held {
            if *address == email.email {
                release.notified().await;
            }
        }
        self.digests.lock().unwrap().push(email.clone());
        Ok(())
    }
}
