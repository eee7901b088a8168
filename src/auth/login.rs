use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect, Response}};
use oauth2::{CsrfToken, PkceCodeChallenge};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, AppResult, AppState};

use super::{clients::ClientProvider, Clients};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

/// Only same-site paths are followed after sign-in.
pub(crate) fn local_path(url: Option<String>) -> Option<String> {
    url.filter(|u| u.starts_with('/') && !u.starts_with("//") && !u.contains('\\'))
}

#[debug_handler(state = AppState)]
pub async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes())
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = local_path(return_url) {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_must_stay_on_site() {
        assert_eq!(local_path(Some("/feed".into())).as_deref(), Some("/feed"));
        assert_eq!(local_path(Some("//evil.example".into())), None);
        assert_eq!(local_path(Some("https://evil.example".into())), None);
        assert_eq!(local_path(Some("/\\evil.example".into())), None);
        assert_eq!(local_path(None), None);
    }
}
