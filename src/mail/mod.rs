mod client;
mod templates;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use client::HttpEmailClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WelcomeEmail {
    pub email: String,
    pub name: String,
    pub intro: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEmail {
    pub email: String,
    pub name: String,
    pub date: String,
    pub content: String,
}

/// Transactional email transport. Each call either delivers or errors.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<()>;
    async fn send_digest(&self, email: &DigestEmail) -> Result<()>;
}
