use anyhow::{Context, Result};
use std::time::Duration;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Frontend origin allowed by CORS.
    pub cors_origin: String,

    // ── Database ────────────────────────────────────────────────────────
    pub database_url: String,

    // ── Crypto ──────────────────────────────────────────────────────────
    /// 32-byte base64-encoded master key for AES-256-GCM encryption of vendor tokens.
    pub master_key: String,

    // ── Dexcom ──────────────────────────────────────────────────────────
    pub dexcom: DexcomConfig,

    // ── Outbound HTTP ───────────────────────────────────────────────────
    pub http_timeout: Duration,
    /// Hue bridges serve a self-signed certificate on the local network.
    pub hue_accept_invalid_certs: bool,

    // ── EmailJS (password reset codes) ──────────────────────────────────
    pub emailjs: Option<EmailJsConfig>,
}

#[derive(Debug, Clone)]
pub struct DexcomConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub redirect_uri: String,
    /// How far behind "now" the EGV window ends. The sandbox only has older data.
    pub data_lag: chrono::Duration,
    pub egv_window: chrono::Duration,
}

impl DexcomConfig {
    pub fn token_url(&self) -> String {
        format!("{}/v2/oauth2/token", self.base_url)
    }

    pub fn egvs_url(&self) -> String {
        format!("{}/v3/users/self/egvs", self.base_url)
    }

    pub fn devices_url(&self) -> String {
        format!("{}/v3/users/self/devices", self.base_url)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base_url: &str) -> Self {
        DexcomConfig {
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            base_url: base_url.into(),
            redirect_uri: "https://app.test/dexcomRedirect".into(),
            data_lag: chrono::Duration::days(14),
            egv_window: chrono::Duration::hours(72),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let emailjs = match (
            std::env::var("EMAILJS_SERVICE_KEY"),
            std::env::var("EMAILJS_TEMPLATE_KEY"),
            std::env::var("EMAILJS_PUBLIC_KEY"),
            std::env::var("EMAILJS_PRIVATE_KEY"),
        ) {
            (Ok(service_id), Ok(template_id), Ok(public_key), Ok(private_key)) => {
                Some(EmailJsConfig {
                    service_id,
                    template_id,
                    public_key,
                    private_key,
                })
            }
            _ => None,
        };

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .context("Invalid PORT")?,
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "https://projectsmercury.com".into()),

            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,
            master_key: std::env::var("MASTER_KEY")
                .context("MASTER_KEY is required (32 bytes, base64)")?,

            dexcom: DexcomConfig {
                client_id: std::env::var("DEXCOM_CLIENT_ID")
                    .context("DEXCOM_CLIENT_ID is required")?,
                client_secret: std::env::var("DEXCOM_SECRET")
                    .context("DEXCOM_SECRET is required")?,
                base_url: std::env::var("DEXCOM_BASE_URL")
                    .unwrap_or_else(|_| "https://sandbox-api.dexcom.com".into()),
                redirect_uri: std::env::var("DEXCOM_REDIRECT_URI")
                    .unwrap_or_else(|_| "Https://ProjectsMercury.com/dexcomRedirect".into()),
                data_lag: chrono::Duration::days(
                    env_or("DEXCOM_DATA_LAG_DAYS", 14).context("Invalid DEXCOM_DATA_LAG_DAYS")?,
                ),
                egv_window: chrono::Duration::hours(
                    env_or("DEXCOM_WINDOW_HOURS", 72).context("Invalid DEXCOM_WINDOW_HOURS")?,
                ),
            },

            http_timeout: Duration::from_secs(
                env_or("HTTP_TIMEOUT_SECS", 30).context("Invalid HTTP_TIMEOUT_SECS")?,
            ),
            hue_accept_invalid_certs: env_or("HUE_ACCEPT_INVALID_CERTS", true)
                .context("Invalid HUE_ACCEPT_INVALID_CERTS")?,

            emailjs,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse()?),
        Err(_) => Ok(default),
    }
}
