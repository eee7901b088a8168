use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID}, AppResult, AppState};

use super::{clients::ClientProvider, login::local_path, provision_account, Clients};

#[derive(Deserialize)]
pub(crate) struct LockinQuery {
    pub(crate) state: Option<String>,
    pub(crate) code: Option<String>,
}

/// OAuth callback: trades the code for a token, asks the provider who signed
/// in, and binds the session to the matching account.
#[debug_handler(state = AppState)]
pub async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        warn!(%provider, "callback without csrf_state");
        return Ok(Redirect::to("/"));
    };

    if state.secret().as_str() != stored_state.as_str() {
        warn!(%provider, "csrf tokens don't match");
        return Ok(Redirect::to("/"));
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier".into());
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: serde_json::Value = http_client.get(provider.userinfo_url())
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, concat!("hexaa/", env!("CARGO_PKG_VERSION")))
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let profile = provider.parse_profile(&body)?;
    let user_id = provision_account(&db_pool, provider, profile).await?;

    let return_url = local_path(session.remove::<String>(RETURN_URL).await?);
    session.cycle_id().await?;
    session.insert(USER_ID, user_id.clone()).await?;

    info!(account = %user_id, %provider, "welcome");

    let return_url: String = return_url.unwrap_or("/feed".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
