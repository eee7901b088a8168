pub mod handle;
pub mod list;

use axum::{debug_handler, extract::{rejection::JsonRejection, State}, routing::{get, post}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::{error::{ApiError, ApiResult}, session::Viewer, AppState};

pub use handle::{claim_handle, HandleError};
pub use list::{list_accounts, AccountSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users))
        .route("/me/username", post(claim_username))
}

#[derive(Deserialize)]
pub(crate) struct ClaimBody {
    username: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn claim_username(
    viewer: Viewer,
    State(db_pool): State<SqlitePool>,
    body: Result<Json<ClaimBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let member = viewer.member()?;
    let Json(ClaimBody { username }) = body?;

    let username = claim_handle(&db_pool, &member.id, &username).await?;
    info!(account = %member.id, %username, "claimed handle");

    Ok(Json(json!({ "ok": true, "username": username })))
}

/// Anonymous callers get an empty list, never an error.
#[debug_handler(state = AppState)]
pub(crate) async fn users(
    viewer: Viewer,
    State(db_pool): State<SqlitePool>,
) -> ApiResult<Json<Value>> {
    let Viewer::Member(member) = viewer else {
        return Ok(Json(json!({ "users": [] })));
    };

    let users = list_accounts(&db_pool, &member.id).await
        .map_err(ApiError::store("Failed to load users."))?;
    Ok(Json(json!({ "users": users })))
}
