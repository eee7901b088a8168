use std::sync::OnceLock;

use regex::Regex;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("Username must be 3-20 chars (a-z, 0-9, _).")]
    InvalidFormat,
    #[error("Username already taken.")]
    AlreadyTaken,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<HandleError> for ApiError {
    fn from(err: HandleError) -> Self {
        match err {
            HandleError::InvalidFormat => ApiError::InvalidInput(err.to_string()),
            HandleError::AlreadyTaken => ApiError::Conflict(err.to_string()),
            HandleError::Store(e) => ApiError::store("Failed to set username.")(e),
        }
    }
}

fn handle_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9_]{3,20}$").expect("Regex should compile")
    })
}

pub fn normalize_handle(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_handle(handle: &str) -> bool {
    handle_regex().is_match(handle)
}

/// Gives `account_id` the normalized form of `raw`, replacing whatever handle it had.
///
/// The lookup of the current holder only produces a friendlier error. The
/// `UNIQUE` constraint on `accounts.handle` is what decides a race between
/// two accounts claiming the same handle: the loser gets `AlreadyTaken`.
pub async fn claim_handle(db_pool: &SqlitePool, account_id: &str, raw: &str) -> Result<String, HandleError> {
    let handle = normalize_handle(raw);
    if !is_valid_handle(&handle) {
        return Err(HandleError::InvalidFormat);
    }

    let holder: Option<(String,)> = sqlx::query_as("SELECT id FROM accounts WHERE handle=?")
        .bind(&handle)
        .fetch_optional(db_pool)
        .await?;
    if holder.is_some_and(|(id,)| id != account_id) {
        return Err(HandleError::AlreadyTaken);
    }

    let updated = sqlx::query("UPDATE accounts SET handle=? WHERE id=?")
        .bind(&handle)
        .bind(account_id)
        .execute(db_pool)
        .await;

    match updated {
        Ok(result) if result.rows_affected() == 0 => Err(sqlx::Error::RowNotFound.into()),
        Ok(_) => Ok(handle),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(HandleError::AlreadyTaken),
        Err(e) => Err(e.into()),
    }
}

/// A handle to pre-fill onboarding with: the display name squeezed into the
/// handle alphabet plus the tail of the account id. Always valid.
pub fn suggest_handle(name: Option<&str>, account_id: &str) -> String {
    let mut base: String = name.unwrap_or_default()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => Some(c),
            c if c.is_whitespace() || c == '-' || c == '.' => Some('_'),
            _ => None,
        })
        .take(15)
        .collect();
    let trimmed = base.trim_matches('_').len();
    if trimmed == 0 {
        base = "user".to_owned();
    }

    let mut tail: Vec<char> = account_id.chars()
        .rev()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(4)
        .collect();
    tail.reverse();
    let tail: String = tail.into_iter().collect();

    format!("{base}_{tail}")
}

pub async fn suggest_handle_for(db_pool: &SqlitePool, account_id: &str) -> Result<String, sqlx::Error> {
    let (name,): (Option<String>,) = sqlx::query_as("SELECT name FROM accounts WHERE id=?")
        .bind(account_id)
        .fetch_one(db_pool)
        .await?;
    Ok(suggest_handle(name.as_deref(), account_id))
}
