pub mod store;

use axum::{debug_handler, extract::{rejection::JsonRejection, DefaultBodyLimit, State}, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::{error::{ApiError, ApiResult}, session::Viewer, AppState};

pub use store::{create_post, list_recent_posts, NewPost, Post, PostError};

/// Leaves room for a full-size image plus the rest of the body.
const POST_BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(recent_posts)
                .post(new_post)
                .layer(DefaultBodyLimit::max(POST_BODY_LIMIT)),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePostBody {
    title: String,
    content: String,
    /// Anything but a string counts as no image.
    #[serde(default)]
    image_data_url: Option<Value>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn recent_posts(
    State(db_pool): State<SqlitePool>,
) -> ApiResult<Json<Value>> {
    let posts = list_recent_posts(&db_pool, store::RECENT_POSTS).await
        .map_err(ApiError::store("Failed to load posts."))?;
    Ok(Json(json!({ "posts": posts })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_post(
    viewer: Viewer,
    State(db_pool): State<SqlitePool>,
    body: Result<Json<CreatePostBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let member = viewer.member()?;
    // only an image can push a post past the body limit
    let Json(CreatePostBody { title, content, image_data_url }) = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::from(PostError::ImageTooLarge),
        _ => ApiError::from(rejection),
    })?;
    let image_data_url = match image_data_url {
        Some(Value::String(image)) => Some(image),
        _ => None,
    };

    let post = create_post(&db_pool, &member.id, NewPost { title, content, image_data_url }).await?;
    info!(author = %member.id, post = %post.id, image = post.image_data_url.is_some(), "created post");

    Ok(Json(json!({ "ok": true, "post": post })))
}
