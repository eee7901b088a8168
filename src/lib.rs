pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod follows;
pub mod posts;
pub mod res;
pub mod session;

use axum::{extract::FromRef, http::StatusCode, response::{Html, IntoResponse, Response}, Router};
use serde_json::Value;
use sqlx::SqlitePool;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
}

/// Every route the service answers, without the session layer.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(accounts::router())
        .merge(follows::router())
        .merge(posts::router());

    Router::new()
        .merge(feed::router())
        .merge(auth::router())
        .nest("/api", api)
        .fallback(res::not_found)
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
    fn get_opt_str_field(&self, field: &str) -> Option<String>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in response"))?
            .as_str()
            .ok_or(format!("expected {field} in response to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
        .ok_or(format!("expected {field} in response").into())
    }

    fn get_opt_str_field(&self, field: &str) -> Option<String> {
        self.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }
}


pub type AppResult<T> = Result<T, AppError>;

/// Failure of a page or sign-in handler. The detail goes to the log, never to the visitor.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(include_res!(str, "/pages/oops.html")),
        )
            .into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(anyhow::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(reqwest::Error);

impl<E: core::error::Error + Send + Sync + 'static, R: oauth2::ErrorResponse + Send + Sync + 'static> From<oauth2::RequestTokenError<E, R>> for AppError {
    fn from(err: oauth2::RequestTokenError<E, R>) -> Self {
        Self(anyhow::Error::from(err))
    }
}
