//! Session keys and the per-request resolution of who is calling.
//!
//! The session cookie only carries the account id. The handle is read back
//! from the store on every request, so a freshly claimed handle takes effect
//! on the very next call.

use axum::{extract::{FromRef, FromRequestParts}, http::request::Parts};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::error::ApiError;

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// A signed-in account as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub handle: Option<String>,
}

/// Who is making the request. Operations take this explicitly instead of
/// reaching into the session themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Member(Member),
}

/// Where a visitor is in the sign-up flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Anonymous,
    NoHandle,
    WithHandle,
}

impl Viewer {
    pub async fn resolve(session: &Session, db_pool: &SqlitePool) -> Result<Viewer, ApiError> {
        let Some(user_id) = session.get::<String>(USER_ID).await
            .map_err(ApiError::store("Failed to read session."))?
        else {
            return Ok(Viewer::Anonymous);
        };

        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT handle FROM accounts WHERE id=?")
            .bind(&user_id)
            .fetch_optional(db_pool)
            .await
            .map_err(ApiError::store("Failed to read session."))?;

        // the account behind a live session can vanish underneath it
        Ok(match row {
            Some((handle,)) => Viewer::Member(Member { id: user_id, handle }),
            None => Viewer::Anonymous,
        })
    }

    pub fn stage(&self) -> Stage {
        match self {
            Viewer::Anonymous => Stage::Anonymous,
            Viewer::Member(Member { handle: None, .. }) => Stage::NoHandle,
            Viewer::Member(Member { handle: Some(_), .. }) => Stage::WithHandle,
        }
    }

    pub fn member(self) -> Result<Member, ApiError> {
        match self {
            Viewer::Member(member) => Ok(member),
            Viewer::Anonymous => Err(ApiError::Unauthorized),
        }
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await
            .map_err(|(_, msg)| ApiError::store("Failed to read session.")(msg))?;
        let db_pool = SqlitePool::from_ref(state);
        Viewer::resolve(&session, &db_pool).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::db;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn empty_session_is_anonymous() {
        let db_pool = db::test_pool().await;
        let viewer = Viewer::resolve(&session(), &db_pool).await.unwrap();
        assert_eq!(viewer, Viewer::Anonymous);
        assert_eq!(viewer.stage(), Stage::Anonymous);
        assert!(matches!(viewer.member(), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn stage_follows_the_stored_handle() {
        let db_pool = db::test_pool().await;
        let id = db::test_account(&db_pool, "7", None).await;
        let session = session();
        session.insert(USER_ID, &id).await.unwrap();

        let viewer = Viewer::resolve(&session, &db_pool).await.unwrap();
        assert_eq!(viewer.stage(), Stage::NoHandle);

        sqlx::query("UPDATE accounts SET handle='seven' WHERE id=?")
            .bind(&id)
            .execute(&db_pool)
            .await
            .unwrap();

        let viewer = Viewer::resolve(&session, &db_pool).await.unwrap();
        assert_eq!(viewer.stage(), Stage::WithHandle);
        assert_eq!(viewer.member().unwrap(), Member { id, handle: Some("seven".into()) });
    }

    #[tokio::test]
    async fn unknown_account_is_anonymous() {
        let db_pool = db::test_pool().await;
        let session = session();
        session.insert(USER_ID, "gone").await.unwrap();

        let viewer = Viewer::resolve(&session, &db_pool).await.unwrap();
        assert_eq!(viewer, Viewer::Anonymous);
    }
}
