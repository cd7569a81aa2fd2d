use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::market::pick_timezone_from_country;
use crate::models::{Recipient, SignUpEvent, WatchlistAdd, WatchlistEntry};

use super::schema::SCHEMA;
use super::{RecipientDirectory, WatchlistStore};

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    /// Insert or update by email. The country is resolved to a timezone here
    /// so later per-user work does not repeat the lookup.
    pub async fn upsert_user(&self, user: &SignUpEvent) -> Result<i64> {
        let user = user.clone();
        let timezone = pick_timezone_from_country(Some(user.profile.country.as_str()));
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO users (email, name, country, investment_goals, risk_tolerance, preferred_industry, timezone)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                       ON CONFLICT(email) DO UPDATE SET
                           name = excluded.name,
                           country = excluded.country,
                           investment_goals = excluded.investment_goals,
                           risk_tolerance = excluded.risk_tolerance,
                           preferred_industry = excluded.preferred_industry,
                           timezone = excluded.timezone"#,
                    params![
                        user.email.trim(),
                        user.name.trim(),
                        user.profile.country,
                        user.profile.investment_goals,
                        user.profile.risk_tolerance,
                        user.profile.preferred_industry,
                        timezone,
                    ],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    params![user.email.trim()],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn get_recipients(&self) -> Result<Vec<Recipient>> {
        let recipients = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT email, name FROM users WHERE trim(email) != '' AND trim(name) != '' ORDER BY id",
                )?;
                let recipients = stmt
                    .query_map([], |row| {
                        Ok(Recipient {
                            email: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(recipients)
            })
            .await?;
        Ok(recipients)
    }

    pub async fn get_user_timezone(&self, email: &str) -> Result<Option<String>> {
        let email = email.trim().to_string();
        let timezone = self
            .conn
            .call(move |conn| {
                let timezone = conn
                    .query_row(
                        "SELECT timezone FROM users WHERE email = ?1",
                        params![email],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(timezone)
            })
            .await?;
        Ok(timezone)
    }

    async fn user_id(&self, email: &str) -> Result<Option<i64>> {
        let email = email.trim().to_string();
        let id = self
            .conn
            .call(move |conn| {
                let id = conn
                    .query_row(
                        "SELECT id FROM users WHERE email = ?1",
                        params![email],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    async fn require_user_id(&self, email: &str) -> Result<i64> {
        self.user_id(email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }

    // Watchlist operations

    pub async fn add_to_watchlist(
        &self,
        email: &str,
        symbol: &str,
        company: &str,
    ) -> Result<WatchlistAdd> {
        let user_id = self.require_user_id(email).await?;
        let symbol = symbol.trim().to_uppercase();
        let company = company.trim().to_string();

        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO watchlist (user_id, symbol, company) VALUES (?1, ?2, ?3)",
                    params![user_id, symbol, company],
                )?;
                Ok(changed > 0)
            })
            .await?;

        Ok(if inserted {
            WatchlistAdd::Added
        } else {
            WatchlistAdd::AlreadyPresent
        })
    }

    pub async fn remove_from_watchlist(&self, email: &str, symbol: &str) -> Result<bool> {
        let user_id = self.require_user_id(email).await?;
        let symbol = symbol.trim().to_uppercase();

        let removed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM watchlist WHERE user_id = ?1 AND symbol = ?2",
                    params![user_id, symbol],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(removed)
    }

    /// Newest entries first.
    pub async fn get_user_watchlist(&self, email: &str) -> Result<Vec<WatchlistEntry>> {
        let user_id = self.require_user_id(email).await?;

        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, user_id, symbol, company, added_at
                       FROM watchlist
                       WHERE user_id = ?1
                       ORDER BY added_at DESC, id DESC"#,
                )?;
                let entries = stmt
                    .query_map(params![user_id], watchlist_entry_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await?;
        Ok(entries)
    }

    pub async fn get_watchlist_symbols_by_email(&self, email: &str) -> Result<Vec<String>> {
        if email.trim().is_empty() {
            return Ok(Vec::new());
        }
        let Some(user_id) = self.user_id(email).await? else {
            return Ok(Vec::new());
        };

        let raw: Vec<String> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT symbol FROM watchlist WHERE user_id = ?1 ORDER BY id")?;
                let symbols = stmt
                    .query_map(params![user_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(symbols)
            })
            .await?;

        let mut seen = HashSet::new();
        Ok(raw
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect())
    }
}

#[async_trait]
impl RecipientDirectory for Repository {
    async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        self.get_recipients().await
    }
}

#[async_trait]
impl WatchlistStore for Repository {
    /// Never fails: a broken lookup reads as an empty watchlist.
    async fn find_symbols_by_email(&self, email: &str) -> Result<Vec<String>> {
        match self.get_watchlist_symbols_by_email(email).await {
            Ok(symbols) => Ok(symbols),
            Err(e) => {
                tracing::error!(%email, "watchlist symbol lookup failed: {e}");
                Ok(Vec::new())
            }
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime()/strftime() output, with or without fractional seconds
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

fn watchlist_entry_from_row(row: &Row) -> rusqlite::Result<WatchlistEntry> {
    Ok(WatchlistEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        company: row.get(3)?,
        added_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}
