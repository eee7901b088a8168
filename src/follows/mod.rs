pub mod graph;

use axum::{debug_handler, extract::{rejection::JsonRejection, State}, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::{error::ApiResult, session::Viewer, AppState};

pub use graph::{list_following_for, set_follow, FollowError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow", post(toggle_follow))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FollowBody {
    user_id: String,
    follow: bool,
}

/// The follower is always the caller; nobody toggles edges for someone else.
#[debug_handler(state = AppState)]
pub(crate) async fn toggle_follow(
    viewer: Viewer,
    State(db_pool): State<SqlitePool>,
    body: Result<Json<FollowBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let member = viewer.member()?;
    let Json(FollowBody { user_id, follow }) = body?;

    set_follow(&db_pool, &member.id, &user_id, follow).await?;
    info!(follower = %member.id, followee = %user_id, follow, "updated follow");

    Ok(Json(json!({ "ok": true })))
}
