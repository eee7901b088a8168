use std::fmt;

use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenUrl};
use serde::Deserialize;
use serde_json::Value;

use crate::{config::{Config, ProviderKeys}, AppResult, GetField};

type HappyClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Github,
    Google,
}

impl ClientProvider {
    pub const ALL: [ClientProvider; 2] = [ClientProvider::Github, ClientProvider::Google];

    /// Path segment and stored provider name.
    pub fn slug(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Github => "github",
            Google => "google",
        }
    }

    fn auth_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Github => "https://github.com/login/oauth/authorize",
            Google => "https://accounts.google.com/o/oauth2/auth",
        }
    }

    fn token_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Github => "https://github.com/login/oauth/access_token",
            Google => "https://oauth2.googleapis.com/token",
        }
    }

    pub fn userinfo_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Github => "https://api.github.com/user",
            Google => "https://www.googleapis.com/oauth2/v2/userinfo",
        }
    }

    pub fn scopes(&self) -> Vec<Scope> {
        use ClientProvider::*;
        let scopes: &[&str] = match self {
            Github => &["read:user"],
            Google => &["openid", "profile"],
        };
        scopes.iter().map(|s| Scope::new(s.to_string())).collect()
    }

    /// Pulls the stable subject id, display name and avatar out of a userinfo response.
    pub fn parse_profile(&self, body: &Value) -> AppResult<ProviderProfile> {
        // github ids are numbers, google ids are strings
        let subject = match body.get_obj_field("id")? {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            other => return Err(format!("unexpected {self} id {other}").into()),
        };

        use ClientProvider::*;
        let (name, image) = match self {
            Github => (
                body.get_opt_str_field("name").or_else(|| body.get_opt_str_field("login")),
                body.get_opt_str_field("avatar_url"),
            ),
            Google => (
                body.get_opt_str_field("name"),
                body.get_opt_str_field("picture"),
            ),
        };

        Ok(ProviderProfile { subject, name, image })
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ClientProvider::*;
        f.write_str(match self {
            Github => "GitHub",
            Google => "Google",
        })
    }
}

/// What a provider tells us about the person signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub subject: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Clone)]
pub struct Clients {
    github_client: Option<HappyClient>,
    google_client: Option<HappyClient>,
}

impl Clients {
    pub fn from_config(config: &Config) -> AppResult<Clients> {
        let client = |provider: ClientProvider, keys: &Option<ProviderKeys>| -> AppResult<Option<HappyClient>> {
            let Some(keys) = keys else {
                return Ok(None);
            };
            let redirect_url = format!("{}/lockin/{}", config.public_url, provider.slug());

            Ok(Some(
                BasicClient::new(ClientId::new(keys.client_id.clone()))
                .set_client_secret(ClientSecret::new(keys.client_secret.clone()))
                .set_auth_uri(AuthUrl::new(provider.auth_url().to_owned()).map_err(anyhow::Error::from)?)
                .set_token_uri(TokenUrl::new(provider.token_url().to_owned()).map_err(anyhow::Error::from)?)
                .set_redirect_uri(RedirectUrl::new(redirect_url).map_err(anyhow::Error::from)?)
            ))
        };

        Ok(
            Clients {
                github_client: client(ClientProvider::Github, &config.github)?,
                google_client: client(ClientProvider::Google, &config.google)?,
            }
        )
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Github => self.github_client.clone(),
            Google => self.google_client.clone(),
        }.ok_or(format!("OAuth provider {provider} keys not supplied").into())
    }

    /// Providers with keys, in display order.
    pub fn providers(&self) -> Vec<ClientProvider> {
        ClientProvider::ALL.into_iter()
            .filter(|p| self.get_client(*p).is_ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(github: bool, google: bool) -> Config {
        let keys = |on: bool| on.then(|| ProviderKeys { client_id: "id".into(), client_secret: "secret".into() });
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.github = keys(github);
        config.google = keys(google);
        config
    }

    #[test]
    fn only_configured_providers_are_offered() {
        let clients = Clients::from_config(&config(false, true)).unwrap();
        assert_eq!(clients.providers(), vec![ClientProvider::Google]);
        assert!(clients.get_client(ClientProvider::Github).is_err());

        let clients = Clients::from_config(&config(false, false)).unwrap();
        assert!(clients.providers().is_empty());
    }

    #[test]
    fn redirect_points_back_at_lockin() {
        let clients = Clients::from_config(&config(true, false)).unwrap();
        let client = clients.get_client(ClientProvider::Github).unwrap();
        assert_eq!(
            client.redirect_uri().map(|u| u.as_str().to_owned()).as_deref(),
            Some("http://localhost:8080/lockin/github"),
        );
    }

    #[test]
    fn github_profile_falls_back_to_login() {
        let body = json!({ "id": 583231, "login": "octocat", "name": null, "avatar_url": "https://a/1.png" });
        let profile = ClientProvider::Github.parse_profile(&body).unwrap();
        assert_eq!(profile, ProviderProfile {
            subject: "583231".into(),
            name: Some("octocat".into()),
            image: Some("https://a/1.png".into()),
        });
    }

    #[test]
    fn google_profile() {
        let body = json!({ "id": "1098", "name": "Ada Lovelace", "picture": "https://p/ada.jpg" });
        let profile = ClientProvider::Google.parse_profile(&body).unwrap();
        assert_eq!(profile.subject, "1098");
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.image.as_deref(), Some("https://p/ada.jpg"));
    }

    #[test]
    fn profile_without_id_is_an_error() {
        assert!(ClientProvider::Google.parse_profile(&json!({ "name": "x" })).is_err());
        assert!(ClientProvider::Github.parse_profile(&json!({ "id": true })).is_err());
    }

    #[test]
    fn provider_paths_deserialize_from_slugs() {
        for provider in ClientProvider::ALL {
            let parsed: ClientProvider = serde_json::from_value(json!(provider.slug())).unwrap();
            assert_eq!(parsed, provider);
        }
    }
}
