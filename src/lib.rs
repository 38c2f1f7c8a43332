pub mod accounts;
pub mod api;
pub mod config;
pub mod crypto;
pub mod dexcom;
pub mod error;
pub mod http;
pub mod hue;
pub mod mailer;
pub mod oauth;
pub mod providers;
pub mod store;

pub use config::Config;
pub use error::{AppError, TokenError};

use sqlx::PgPool;
use std::sync::Arc;

use dexcom::DexcomClient;
use http::HttpTransport;
use hue::HueBridge;
use mailer::Mailer;
use oauth::{AuthenticatedFetcher, TokenExchanger, TokenRefresher};
use providers::{DexcomProvider, OAuthProvider};
use store::VendorTokenStore;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub tokens: Arc<dyn VendorTokenStore>,
    pub exchanger: TokenExchanger,
    pub dexcom: DexcomClient,
    pub mailer: Arc<dyn Mailer>,
    pub hue: HueBridge,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the token lifecycle components around the given store and transport.
    pub fn new(
        config: Config,
        pool: PgPool,
        tokens: Arc<dyn VendorTokenStore>,
        transport: Arc<dyn HttpTransport>,
        mailer: Arc<dyn Mailer>,
        hue: HueBridge,
    ) -> Self {
        let provider: Arc<dyn OAuthProvider> =
            Arc::new(DexcomProvider::new(&config.dexcom, transport.clone()));
        let refresher = Arc::new(TokenRefresher::new(provider.clone(), tokens.clone()));
        let fetcher = Arc::new(AuthenticatedFetcher::new(
            tokens.clone(),
            transport,
            refresher,
        ));

        AppState {
            exchanger: TokenExchanger::new(provider, tokens.clone()),
            dexcom: DexcomClient::new(fetcher, config.dexcom.clone()),
            config,
            pool,
            tokens,
            mailer,
            hue,
        }
    }
}
