use hexaa::{auth, config::Config, db, AppState};
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hexaa=info,tower_http=info")),
        )
        .init();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(config.session_hours)));

    let db_pool = db::connect(&config.database_url, 16).await?;
    db::migrate(&db_pool).await?;

    let clients = auth::Clients::from_config(&config).map_err(|e| e.0)?;
    let providers: Vec<&str> = clients.providers().iter().map(|p| p.slug()).collect();
    info!(?providers, "sign-in providers");

    let app_state = AppState {
        db_pool,
        clients,
    };

    let app = hexaa::router()
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, public_url = %config.public_url, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
