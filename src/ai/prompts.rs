pub const PERSONALIZED_WELCOME_EMAIL_PROMPT: &str = r#"Generate highly personalized HTML content that will be inserted into an email template at the {{intro}} placeholder.

User profile data:
{{userProfile}}

PERSONALIZATION REQUIREMENTS:
- Write one paragraph of two to three sentences that references the user's goals, risk tolerance or preferred industry.
- Make the reader feel understood and explain how Signalist helps them track markets that matter to them.
- Keep it warm, confident and free of financial advice.

FORMATTING RULES:
- Return clean HTML only, no markdown, no code fences.
- Wrap the paragraph in a single <p class="mobile-text" style="margin: 0 0 30px 0; font-size: 16px; line-height: 1.6; color: #CCDADC;"> element.
- Use <strong> to highlight one or two key phrases.
- Do not add a greeting; the template already greets the user by name."#;

pub const NEWS_SUMMARY_EMAIL_PROMPT: &str = r#"Generate HTML content for a market news summary email that will be inserted into the {{newsContent}} placeholder.

News data to summarize:
{{newsData}}

REQUIREMENTS:
- Group the articles into at most three sections such as "Market Highlights", "Top Movers" or "Watchlist Updates".
- For each article write a short headline, a plain-English two sentence explanation and a "Bottom line" takeaway.
- Link each item to its source URL with a "Read Full Story" anchor.
- Stay factual. Do not invent numbers or events that are not in the data.

FORMATTING RULES:
- Return clean HTML only, no markdown, no code fences.
- Use <h3 style="margin: 30px 0 15px 0; font-size: 18px; font-weight: 600; color: #f8f9fa;"> for section titles.
- Use <div style="background-color: #212328; padding: 24px; margin: 20px 0; border-radius: 8px;"> around each article."#;

pub const FALLBACK_WELCOME_INTRO: &str =
    "Thanks for joining Signalist. You have the tools to track markets and make moves.";

/// Substitute every `{{key}}` occurrence.
pub fn fill(template: &str, key: &str, value: &str) -> String {
    template.replace(&format!("{{{{{key}}}}}"), value)
}
