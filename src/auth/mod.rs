use axum::{routing::get, Router};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{db, feed, AppState};

mod clients;
mod login;
mod lockin;
mod logout;

pub use clients::{ClientProvider, Clients, ProviderProfile};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(feed::landing))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// Display name for accounts whose provider did not share one.
pub(crate) fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Nameless"),
        nouns.choose(&mut rng).unwrap_or(&"User"),
    )
}

/// Finds the account linked to this provider identity, creating it on first sign-in.
/// Returns the account id.
pub async fn provision_account(db_pool: &SqlitePool, provider: ClientProvider, profile: ProviderProfile) -> Result<String, sqlx::Error> {
    let ProviderProfile { subject, name, image } = profile;
    let id = Uuid::now_v7().to_string();
    let name = name.unwrap_or_else(random_alias);

    // two callbacks for the same new identity may race, the constraint picks one
    let created = sqlx::query("INSERT INTO accounts (id,provider,provider_subject,handle,name,image,created_at) VALUES (?,?,?,NULL,?,?,?) ON CONFLICT (provider,provider_subject) DO NOTHING")
        .bind(&id)
        .bind(provider.slug())
        .bind(&subject)
        .bind(&name)
        .bind(&image)
        .bind(db::now_millis())
        .execute(db_pool)
        .await?;
    if created.rows_affected() == 1 {
        info!(account = %id, %provider, %name, "adding account");
    }

    let (account_id,): (String,) = sqlx::query_as("SELECT id FROM accounts WHERE provider=? AND provider_subject=?")
        .bind(provider.slug())
        .bind(&subject)
        .fetch_one(db_pool)
        .await?;
    Ok(account_id)
}
