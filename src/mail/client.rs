use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

use super::templates::{render_digest, render_welcome, RenderedEmail};
use super::{DigestEmail, EmailGateway, WelcomeEmail};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends through a JSON transactional email API
/// (`POST {from, to, subject, html, text}` with bearer auth).
pub struct HttpEmailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailClient {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }

    async fn send(&self, email: RenderedEmail) -> Result<()> {
        let request = SendEmailRequest {
            from: &self.from,
            to: vec![&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::EmailApi(format!("API error: {}", error_text)));
        }

        tracing::debug!(to = %email.to, subject = %email.subject, "email accepted");
        Ok(())
    }
}

#[async_trait]
impl EmailGateway for HttpEmailClient {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<()> {
        self.send(render_welcome(email)).await
    }

    async fn send_digest(&self, email: &DigestEmail) -> Result<()> {
        self.send(render_digest(email)).await
    }
}
