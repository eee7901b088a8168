pub mod gate;

use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, routing::get, Router};
use sqlx::SqlitePool;

use crate::{accounts::handle::suggest_handle_for, auth::Clients, include_res, session::Viewer, AppResult, AppState};

use gate::{redirect_for, Page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/onboarding", get(onboarding))
        .route("/feed", get(feed))
}

#[debug_handler(state = AppState)]
pub(crate) async fn landing(
    viewer: Viewer,
    State(clients): State<Clients>,
) -> Response {
    if let Some(to) = redirect_for(viewer.stage(), Page::Landing) {
        return Redirect::to(to).into_response();
    }

    let providers = clients.providers();
    let buttons = if providers.is_empty() {
        include_res!(str, "/pages/no_providers.html").to_owned()
    } else {
        providers.iter()
            .map(|provider| include_res!(str, "/pages/provider_button.html")
                .replace("{slug}", provider.slug())
                .replace("{label}", &provider.to_string()))
            .collect()
    };

    Html(
        include_res!(str, "/pages/landing.html")
            .replace("{providers}", &buttons)
    ).into_response()
}

#[debug_handler(state = AppState)]
pub(crate) async fn onboarding(
    viewer: Viewer,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Response> {
    if let Some(to) = redirect_for(viewer.stage(), Page::Onboarding) {
        return Ok(Redirect::to(to).into_response());
    }
    let Viewer::Member(member) = viewer else {
        return Ok(Redirect::to("/").into_response());
    };

    // handles are [a-z0-9_], nothing to escape
    let suggested = suggest_handle_for(&db_pool, &member.id).await?;
    Ok(Html(
        include_res!(str, "/pages/onboarding.html")
            .replace("{suggested}", &suggested)
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn feed(viewer: Viewer) -> Response {
    if let Some(to) = redirect_for(viewer.stage(), Page::Feed) {
        return Redirect::to(to).into_response();
    }
    let Viewer::Member(member) = viewer else {
        return Redirect::to("/").into_response();
    };

    Html(
        include_res!(str, "/pages/feed.html")
            .replace("{viewer_id}", &member.id)
            .replace("{viewer_handle}", member.handle.as_deref().unwrap_or_default())
    ).into_response()
}
