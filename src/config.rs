use std::net::SocketAddr;

use anyhow::{anyhow, Context};

const DEFAULT_DATABASE_URL: &str = "sqlite://hexaa.db?mode=rwc";
const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_SESSION_HOURS: i64 = 24;

/// OAuth application keys for one identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderKeys {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind: SocketAddr,
    /// Base the OAuth redirect urls are built from, without a trailing slash.
    pub public_url: String,
    pub secure_cookies: bool,
    pub session_hours: i64,
    pub github: Option<ProviderKeys>,
    pub google: Option<ProviderKeys>,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());

        let bind = var("HEXAA_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind = bind.parse().with_context(|| format!("HEXAA_BIND: bad socket address {bind:?}"))?;

        let public_url = var("HEXAA_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let secure_cookies = match var("HEXAA_SECURE_COOKIES").as_deref() {
            None => false,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => return Err(anyhow!("HEXAA_SECURE_COOKIES: expected a bool, got {other:?}")),
        };

        let session_hours = match var("HEXAA_SESSION_HOURS") {
            None => DEFAULT_SESSION_HOURS,
            Some(hours) => hours.parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| anyhow!("HEXAA_SESSION_HOURS: expected a positive integer, got {hours:?}"))?,
        };

        let keys = |id: &str, secret: &str| match (var(id), var(secret)) {
            (Some(client_id), Some(client_secret)) => Some(ProviderKeys { client_id, client_secret }),
            _ => None,
        };

        Ok(Config {
            database_url,
            bind,
            public_url,
            secure_cookies,
            session_hours,
            github: keys("GITHUB_ID", "GITHUB_SECRET"),
            google: keys("GOOGLE_ID", "GOOGLE_SECRET"),
        })
    }
}
