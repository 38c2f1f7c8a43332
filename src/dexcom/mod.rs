//! Dexcom data endpoints served through the authenticated fetcher.

pub mod mappers;

pub use mappers::{map_devices, DeviceRecord, DevicesResponse};

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DexcomConfig;
use crate::error::TokenError;
use crate::oauth::AuthenticatedFetcher;
use crate::store::UserId;

/// Vendor timestamps: UTC, second precision, no offset suffix.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct DexcomClient {
    fetcher: Arc<AuthenticatedFetcher>,
    config: DexcomConfig,
}

impl DexcomClient {
    pub fn new(fetcher: Arc<AuthenticatedFetcher>, config: DexcomConfig) -> Self {
        Self { fetcher, config }
    }

    /// Estimated glucose values for the configured window, passed through as-is.
    pub async fn egvs(&self, user_id: UserId) -> Result<serde_json::Value, TokenError> {
        let url = self.egvs_url(Utc::now());
        self.fetcher.fetch(user_id, &url).await
    }

    pub async fn devices(&self, user_id: UserId) -> Result<Vec<DeviceRecord>, TokenError> {
        let resp: DevicesResponse = self
            .fetcher
            .fetch(user_id, &self.config.devices_url())
            .await?;
        Ok(map_devices(resp))
    }

    fn egvs_url(&self, now: DateTime<Utc>) -> String {
        let end = now - self.config.data_lag;
        let start = end - self.config.egv_window;
        format!(
            "{}?startDate={}&endDate={}",
            self.config.egvs_url(),
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        )
    }
}
