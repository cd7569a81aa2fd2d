use std::sync::Arc;

use crate::ai::prompts::{fill, FALLBACK_WELCOME_INTRO, PERSONALIZED_WELCOME_EMAIL_PROMPT};
use crate::ai::SummarizationGateway;
use crate::error::Result;
use crate::mail::{EmailGateway, WelcomeEmail};
use crate::models::{JobOutcome, SignUpEvent, UserProfile};

pub const WELCOME_SENT_MESSAGE: &str = "Welcome email sent successfully";

/// Personalized welcome email for a new sign-up. A send failure is returned
/// to the caller; there is a single unit of work, so nothing to isolate.
pub struct OnboardingPipeline {
    summarizer: Arc<dyn SummarizationGateway>,
    mailer: Arc<dyn EmailGateway>,
}

impl OnboardingPipeline {
    pub fn new(summarizer: Arc<dyn SummarizationGateway>, mailer: Arc<dyn EmailGateway>) -> Self {
        Self { summarizer, mailer }
    }

    pub async fn run(&self, event: &SignUpEvent) -> Result<JobOutcome> {
        let prompt = fill(
            PERSONALIZED_WELCOME_EMAIL_PROMPT,
            "userProfile",
            &profile_block(&event.profile),
        );

        let intro = match self.summarizer.infer(&prompt).await {
            Ok(response) => response.first_text().map(str::to_string),
            Err(e) => {
                tracing::warn!(email = %event.email, "sign-up-email: intro generation failed: {e}");
                None
            }
        }
        .unwrap_or_else(|| FALLBACK_WELCOME_INTRO.to_string());

        self.mailer
            .send_welcome(&WelcomeEmail {
                email: event.email.clone(),
                name: event.name.clone(),
                intro,
            })
            .await?;

        tracing::info!(email = %event.email, "sign-up-email: sent");
        Ok(JobOutcome::ok(WELCOME_SENT_MESSAGE))
    }
}

fn profile_block(profile: &UserProfile) -> String {
    format!(
        "- Country: {}\n- Investment Goals: {}\n- Risk Tolerance: {}\n- Preferred Industry: {}",
        profile.country, profile.investment_goals, profile.risk_tolerance, profile.preferred_industry
    )
}
