use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};

use mercury_api::crypto::CryptoEngine;
use mercury_api::http::ReqwestTransport;
use mercury_api::hue::HueBridge;
use mercury_api::mailer::{EmailJsMailer, LogMailer, Mailer};
use mercury_api::store::{schema, PgTokenStore};
use mercury_api::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mercury_api=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("mercury-api v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    let crypto = Arc::new(CryptoEngine::new(&config.master_key)?);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    schema::migrate(&pool).await?;
    info!("Database connected and migrated");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let transport = Arc::new(ReqwestTransport::from_client(http.clone()));
    let tokens = Arc::new(PgTokenStore::new(pool.clone(), crypto));

    let mailer: Arc<dyn Mailer> = match config.emailjs.clone() {
        Some(emailjs) => Arc::new(EmailJsMailer::new(emailjs, http)),
        None => {
            warn!("EMAILJS_* not set; password reset codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let hue = HueBridge::new(config.http_timeout, config.hue_accept_invalid_certs)?;

    let state: SharedState = Arc::new(AppState::new(
        config.clone(),
        pool,
        tokens,
        transport,
        mailer,
        hue,
    ));

    let app = api::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
