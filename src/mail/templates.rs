use crate::ai::prompts::fill;

use super::{DigestEmail, WelcomeEmail};

const WELCOME_SUBJECT: &str = "Welcome to Signalist - your stock market toolkit is ready!";

const WELCOME_EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Welcome to Signalist</title></head>
<body style="margin: 0; padding: 0; background-color: #050505; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; background-color: #141414; border-radius: 8px;">
    <tr><td style="padding: 40px;">
      <h1 style="margin: 0 0 30px 0; font-size: 24px; color: #FDD458;">Welcome aboard {{name}}</h1>
      {{intro}}
      <p style="margin: 0 0 15px 0; font-size: 16px; color: #CCDADC;"><strong>Here's what you can do right now:</strong></p>
      <ul style="margin: 0 0 30px 0; padding-left: 20px; font-size: 16px; color: #CCDADC;">
        <li>Set up your watchlist to follow your favorite stocks</li>
        <li>Create price and volume alerts so you never miss a move</li>
        <li>Explore the dashboard for trends and the latest market news</li>
      </ul>
      <p style="margin: 0; font-size: 16px; color: #CCDADC;">We'll keep you informed with timely, concise updates.</p>
    </td></tr>
  </table>
</body>
</html>"#;

const DIGEST_EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Market News Summary</title></head>
<body style="margin: 0; padding: 0; background-color: #050505; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; background-color: #141414; border-radius: 8px;">
    <tr><td style="padding: 40px;">
      <h1 style="margin: 0 0 10px 0; font-size: 24px; color: #FDD458;">Market News Summary Today</h1>
      <p style="margin: 0 0 30px 0; font-size: 14px; color: #6b7280;">{{date}}</p>
      <p style="margin: 0 0 20px 0; font-size: 16px; color: #CCDADC;">Hi {{name}}, here is what moved the markets for you.</p>
      {{newsContent}}
      <p style="margin: 40px 0 0 0; font-size: 12px; color: #6b7280;">You're receiving this because you subscribed to Signalist news updates.</p>
    </td></tr>
  </table>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|e| {
        tracing::debug!("Failed to convert email HTML to text: {}", e);
        String::new()
    })
}

pub fn render_welcome(email: &WelcomeEmail) -> RenderedEmail {
    let html = fill(WELCOME_EMAIL_TEMPLATE, "name", &email.name);
    let html = fill(&html, "intro", &email.intro);
    RenderedEmail {
        to: email.email.clone(),
        subject: WELCOME_SUBJECT.to_string(),
        text: plain_text(&html),
        html,
    }
}

pub fn render_digest(email: &DigestEmail) -> RenderedEmail {
    let html = fill(DIGEST_EMAIL_TEMPLATE, "date", &email.date);
    let html = fill(&html, "name", &email.name);
    let html = fill(&html, "newsContent", &email.content);
    RenderedEmail {
        to: email.email.clone(),
        subject: format!("Market News Summary Today - {}", email.date),
        text: plain_text(&html),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_fills_name_and_intro() {
        let rendered = render_welcome(&WelcomeEmail {
            email: "a@example.com".into(),
            name: "Ann".into(),
            intro: "<p>Glad you're here.</p>".into(),
        });

        assert_eq!(rendered.to, "a@example.com");
        assert_eq!(rendered.subject, WELCOME_SUBJECT);
        assert!(rendered.html.contains("Welcome aboard Ann"));
        assert!(rendered.html.contains("<p>Glad you're here.</p>"));
        assert!(!rendered.html.contains("{{"));
        assert!(rendered.text.contains("Glad you're here."));
    }

    #[test]
    fn digest_subject_carries_date() {
        let rendered = render_digest(&DigestEmail {
            email: "b@example.com".into(),
            name: "Bob".into(),
            date: "Monday, October 19, 2026".into(),
            content: "<h3>Market Highlights</h3>".into(),
        });

        assert_eq!(rendered.subject, "Market News Summary Today - Monday, October 19, 2026");
        assert!(rendered.html.contains("Hi Bob"));
        assert!(rendered.html.contains("<h3>Market Highlights</h3>"));
        assert!(!rendered.html.contains("{{"));
        assert!(rendered.text.contains("Market Highlights"));
    }
}
