use std::collections::HashSet;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::{db, error::ApiError};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("You cannot follow yourself.")]
    SelfFollow,
    #[error("Unknown user.")]
    UnknownAccount,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<FollowError> for ApiError {
    fn from(err: FollowError) -> Self {
        match err {
            FollowError::SelfFollow => ApiError::Conflict(err.to_string()),
            FollowError::UnknownAccount => ApiError::InvalidInput(err.to_string()),
            FollowError::Store(e) => ApiError::store("Failed to update follow.")(e),
        }
    }
}

/// Makes the edge `follower_id -> followee_id` exist iff `desired`.
/// Asserting the state that already holds is a successful no-op.
pub async fn set_follow(db_pool: &SqlitePool, follower_id: &str, followee_id: &str, desired: bool) -> Result<(), FollowError> {
    if follower_id == followee_id {
        return Err(FollowError::SelfFollow);
    }

    if !desired {
        sqlx::query("DELETE FROM follows WHERE follower_id=? AND followee_id=?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(db_pool)
            .await?;
        return Ok(());
    }

    let inserted = sqlx::query("INSERT INTO follows (follower_id,followee_id,created_at) VALUES (?,?,?) ON CONFLICT (follower_id,followee_id) DO NOTHING")
        .bind(follower_id)
        .bind(followee_id)
        .bind(db::now_millis())
        .execute(db_pool)
        .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(FollowError::UnknownAccount),
        Err(e) => Err(e.into()),
    }
}

/// Ids of every account `viewer_id` follows.
pub async fn list_following_for(db_pool: &SqlitePool, viewer_id: &str) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT followee_id FROM follows WHERE follower_id=?")
        .bind(viewer_id)
        .fetch_all(db_pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
