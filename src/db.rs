use std::str::FromStr;

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use time::OffsetDateTime;

// accounts: handle is unique but nullable until onboarding.
// follows: one edge per ordered pair, never a self edge.
// posts: seq is the insertion order and breaks created_at ties.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY NOT NULL,
        provider TEXT NOT NULL,
        provider_subject TEXT NOT NULL,
        handle TEXT UNIQUE,
        name TEXT,
        image TEXT,
        created_at INTEGER NOT NULL,
        UNIQUE (provider, provider_subject)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS follows (
        follower_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        followee_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (follower_id, followee_id),
        CHECK (follower_id <> followee_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS posts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        author_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        image_data_url TEXT,
        created_at INTEGER NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS posts_recent ON posts (created_at DESC, seq DESC)",
];

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // an in-memory database lives exactly as long as its connection
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Creates any missing tables. Safe to run on every start.
pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(db_pool)
            .await?;
    }
    Ok(())
}

/// Wall clock as epoch milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let db_pool = connect("sqlite::memory:", 1).await.unwrap();
    migrate(&db_pool).await.unwrap();
    db_pool
}

#[cfg(test)]
pub(crate) async fn test_account(db_pool: &SqlitePool, subject: &str, handle: Option<&str>) -> String {
    let id = uuid::Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO accounts (id,provider,provider_subject,handle,name,image,created_at) VALUES (?,'github',?,?,?,NULL,?)")
        .bind(&id)
        .bind(subject)
        .bind(handle)
        .bind(format!("Test {subject}"))
        .bind(now_millis())
        .execute(db_pool)
        .await
        .unwrap();
    id
}
