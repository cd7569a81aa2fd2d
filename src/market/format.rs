//! Pure formatting and validation helpers shared by the jobs and the
//! watchlist commands.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use regex::Regex;

use crate::models::{FormattedArticle, RawNewsArticle};

/// Upper bound on articles in one digest.
pub const MAX_ARTICLES: usize = 6;

const COMPANY_SUMMARY_CHARS: usize = 200;
const GENERAL_SUMMARY_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsDistribution {
    pub items_per_symbol: usize,
    pub target_total: usize,
}

/// Fewer symbols get more articles each; the total never exceeds
/// [`MAX_ARTICLES`].
pub fn calculate_news_distribution(symbols_count: usize) -> NewsDistribution {
    let items_per_symbol = match symbols_count {
        0..=2 => 3,
        3 => 2,
        _ => 1,
    };
    NewsDistribution {
        items_per_symbol,
        target_total: MAX_ARTICLES,
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

pub fn validate_article(article: &RawNewsArticle) -> bool {
    non_empty(&article.headline)
        && non_empty(&article.summary)
        && non_empty(&article.url)
        && article.datetime.is_some_and(|d| d != 0)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Company news gets a synthesized id (`now` in ms scaled plus a random
/// component); general news keeps the provider id offset by `index`.
/// Callers must run [`validate_article`] first.
pub fn format_article(
    article: &RawNewsArticle,
    is_company_news: bool,
    symbol: Option<&str>,
    index: usize,
) -> FormattedArticle {
    let id = if is_company_news {
        Utc::now().timestamp_millis() * 1000 + rand::rng().random_range(0..1000)
    } else {
        article.id + index as i64
    };

    let limit = if is_company_news {
        COMPANY_SUMMARY_CHARS
    } else {
        GENERAL_SUMMARY_CHARS
    };
    let summary = article.summary.as_deref().unwrap_or_default().trim();

    FormattedArticle {
        id,
        headline: article.headline.as_deref().unwrap_or_default().trim().to_string(),
        summary: format!("{}...", truncate_chars(summary, limit)),
        source: article
            .source
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                if is_company_news {
                    "Company News".to_string()
                } else {
                    "Market News".to_string()
                }
            }),
        url: article.url.clone().unwrap_or_default(),
        datetime: article.datetime.unwrap_or_default(),
        image: article.image.clone().unwrap_or_default(),
        category: if is_company_news {
            "company".to_string()
        } else {
            article
                .category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "general".to_string())
        },
        related: if is_company_news {
            symbol.unwrap_or_default().to_string()
        } else {
            article.related.clone().unwrap_or_default()
        },
    }
}

pub fn format_market_cap_value(market_cap_usd: f64) -> String {
    if !market_cap_usd.is_finite() || market_cap_usd <= 0.0 {
        return "N/A".to_string();
    }

    if market_cap_usd >= 1e12 {
        format!("${:.2}T", market_cap_usd / 1e12)
    } else if market_cap_usd >= 1e9 {
        format!("${:.2}B", market_cap_usd / 1e9)
    } else if market_cap_usd >= 1e6 {
        format!("${:.2}M", market_cap_usd / 1e6)
    } else {
        format!("${:.2}", market_cap_usd)
    }
}

/// US-dollar amount with thousands separators, e.g. `$1,234.56`.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

pub fn format_change_percent(change_percent: Option<f64>) -> String {
    match change_percent {
        Some(p) if p != 0.0 && p.is_finite() => {
            let sign = if p > 0.0 { "+" } else { "" };
            format!("{sign}{p:.2}%")
        }
        _ => String::new(),
    }
}

pub fn format_time_ago(timestamp: i64, now: DateTime<Utc>) -> String {
    let diff_ms = now.timestamp_millis() - timestamp * 1000;
    let hours = diff_ms / (1000 * 60 * 60);
    let minutes = diff_ms / (1000 * 60);

    let plural = |n: i64| if n > 1 { "s" } else { "" };
    if hours > 24 {
        let days = hours / 24;
        format!("{days} day{} ago", plural(days))
    } else if hours >= 1 {
        format!("{hours} hour{} ago", plural(hours))
    } else {
        format!("{minutes} minute{} ago", plural(minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

/// `YYYY-MM-DD` bounds covering the last `days` days.
pub fn date_range(days: i64, now: DateTime<Utc>) -> DateRange {
    DateRange {
        from: (now - Duration::days(days)).format("%Y-%m-%d").to_string(),
        to: now.format("%Y-%m-%d").to_string(),
    }
}

pub fn today_string() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// e.g. `Monday, October 19, 2026`, in UTC.
pub fn formatted_date(now: DateTime<Utc>) -> String {
    now.format("%A, %B %-d, %Y").to_string()
}

pub fn formatted_today_date() -> String {
    formatted_date(Utc::now())
}

fn country_timezones() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("US", "America/New_York"),
            ("USA", "America/New_York"),
            ("UnitedStates", "America/New_York"),
            ("United States", "America/New_York"),
            ("CA", "America/Toronto"),
            ("Canada", "America/Toronto"),
            ("GB", "Europe/London"),
            ("UK", "Europe/London"),
            ("United Kingdom", "Europe/London"),
            ("DE", "Europe/Berlin"),
            ("Germany", "Europe/Berlin"),
            ("FR", "Europe/Paris"),
            ("France", "Europe/Paris"),
            ("ES", "Europe/Madrid"),
            ("Spain", "Europe/Madrid"),
            ("IT", "Europe/Rome"),
            ("Italy", "Europe/Rome"),
            ("IN", "Asia/Kolkata"),
            ("India", "Asia/Kolkata"),
            ("AU", "Australia/Sydney"),
            ("Australia", "Australia/Sydney"),
            ("NZ", "Pacific/Auckland"),
            ("Japan", "Asia/Tokyo"),
            ("JP", "Asia/Tokyo"),
            ("CN", "Asia/Shanghai"),
            ("China", "Asia/Shanghai"),
            ("SG", "Asia/Singapore"),
            ("Singapore", "Asia/Singapore"),
        ])
    })
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Map a free-text country name or code to an IANA timezone, `UTC` when
/// nothing matches.
pub fn pick_timezone_from_country(country: Option<&str>) -> &'static str {
    let Some(key) = country.map(str::trim).filter(|k| !k.is_empty()) else {
        return "UTC";
    };
    let map = country_timezones();

    if let Some(tz) = map.get(key).copied() {
        return tz;
    }
    if let Some(tz) = map.get(key.to_uppercase().as_str()).copied() {
        return tz;
    }
    let collapsed = whitespace().replace_all(key, "");
    map.get(collapsed.as_ref()).copied().unwrap_or("UTC")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(summary: &str) -> RawNewsArticle {
        RawNewsArticle {
            id: 100,
            headline: Some("  Headline  ".into()),
            summary: Some(summary.into()),
            source: None,
            url: Some("https://example.com/a".into()),
            datetime: Some(1_700_000_000),
            image: None,
            category: None,
            related: Some("AAPL".into()),
        }
    }

    #[test]
    fn distribution_follows_symbol_count() {
        for n in 0..3 {
            assert_eq!(calculate_news_distribution(n).items_per_symbol, 3);
        }
        assert_eq!(calculate_news_distribution(3).items_per_symbol, 2);
        for n in [4, 5, 10, 100] {
            assert_eq!(calculate_news_distribution(n).items_per_symbol, 1);
        }
        for n in 0..20 {
            assert!(calculate_news_distribution(n).target_total <= MAX_ARTICLES);
        }
    }

    #[test]
    fn articles_missing_required_fields_are_invalid() {
        let valid = raw("text");
        assert!(validate_article(&valid));

        let mut a = valid.clone();
        a.headline = None;
        assert!(!validate_article(&a));

        let mut a = valid.clone();
        a.summary = Some(String::new());
        assert!(!validate_article(&a));

        let mut a = valid.clone();
        a.url = None;
        assert!(!validate_article(&a));

        let mut a = valid.clone();
        a.datetime = None;
        assert!(!validate_article(&a));

        let mut a = valid;
        a.datetime = Some(0);
        assert!(!validate_article(&a));
    }

    #[test]
    fn company_news_truncates_to_200() {
        let long = "x".repeat(500);
        let formatted = format_article(&raw(&long), true, Some("MSFT"), 0);

        assert_eq!(formatted.summary.len(), 203);
        assert!(formatted.summary.ends_with("..."));
        assert_eq!(formatted.category, "company");
        assert_eq!(formatted.related, "MSFT");
        assert_eq!(formatted.source, "Company News");
        assert_eq!(formatted.headline, "Headline");
    }

    #[test]
    fn general_news_truncates_to_150_and_offsets_id() {
        let long = "y".repeat(500);
        let formatted = format_article(&raw(&long), false, None, 4);

        assert_eq!(formatted.summary.len(), 153);
        assert_eq!(formatted.id, 104);
        assert_eq!(formatted.category, "general");
        assert_eq!(formatted.related, "AAPL");
        assert_eq!(formatted.source, "Market News");
    }

    #[test]
    fn short_summaries_still_get_ellipsis() {
        let formatted = format_article(&raw("  short "), false, None, 0);
        assert_eq!(formatted.summary, "short...");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(300);
        let formatted = format_article(&raw(&text), false, None, 0);
        assert_eq!(formatted.summary.chars().count(), 153);
    }

    #[test]
    fn market_cap_suffixes() {
        assert_eq!(format_market_cap_value(1.5e12), "$1.50T");
        assert_eq!(format_market_cap_value(2.3e9), "$2.30B");
        assert_eq!(format_market_cap_value(4.1e6), "$4.10M");
        assert_eq!(format_market_cap_value(500.0), "$500.00");
        assert_eq!(format_market_cap_value(0.0), "N/A");
        assert_eq!(format_market_cap_value(-3.0), "N/A");
        assert_eq!(format_market_cap_value(f64::NAN), "N/A");
        assert_eq!(format_market_cap_value(f64::INFINITY), "N/A");
    }

    #[test]
    fn price_uses_grouping() {
        assert_eq!(format_price(0.0), "$0.00");
        assert_eq!(format_price(999.999), "$1,000.00");
        assert_eq!(format_price(1234567.891), "$1,234,567.89");
        assert_eq!(format_price(-42.5), "-$42.50");
    }

    #[test]
    fn change_percent_is_signed() {
        assert_eq!(format_change_percent(Some(1.234)), "+1.23%");
        assert_eq!(format_change_percent(Some(-0.5)), "-0.50%");
        assert_eq!(format_change_percent(Some(0.0)), "");
        assert_eq!(format_change_percent(None), "");
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let ts = now.timestamp();
        assert_eq!(format_time_ago(ts - 60, now), "1 minute ago");
        assert_eq!(format_time_ago(ts - 45 * 60, now), "45 minutes ago");
        assert_eq!(format_time_ago(ts - 3 * 3600, now), "3 hours ago");
        assert_eq!(format_time_ago(ts - 72 * 3600, now), "3 days ago");
    }

    #[test]
    fn dates_render_in_utc() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 12, 0).unwrap();
        assert_eq!(formatted_date(now), "Monday, October 19, 2026");
        assert_eq!(
            date_range(5, now),
            DateRange {
                from: "2026-10-14".into(),
                to: "2026-10-19".into()
            }
        );
    }

    #[test]
    fn timezone_lookup_order() {
        assert_eq!(pick_timezone_from_country(Some("US")), "America/New_York");
        assert_eq!(pick_timezone_from_country(Some("us")), "America/New_York");
        assert_eq!(pick_timezone_from_country(Some("United Kingdom")), "Europe/London");
        assert_eq!(pick_timezone_from_country(Some("United   States")), "America/New_York");
        assert_eq!(pick_timezone_from_country(Some("  Japan ")), "Asia/Tokyo");
        assert_eq!(pick_timezone_from_country(Some("Wakanda")), "UTC");
        assert_eq!(pick_timezone_from_country(None), "UTC");
        assert_eq!(pick_timezone_from_country(Some("")), "UTC");
    }
}
