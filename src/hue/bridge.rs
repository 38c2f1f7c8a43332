//! Client for the Hue bridge's local REST API (v1 `lights` resource).

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid bridge address: {0}")]
    Address(String),

    #[error("bridge request failed: {0}")]
    Transport(String),

    #[error("bridge returned HTTP {0}")]
    Status(u16),

    /// The bridge answered with its `[{"error": {...}}]` envelope.
    #[error("bridge error {kind}: {description}")]
    Api { kind: i64, description: String },

    #[error("unexpected bridge response: {0}")]
    Body(String),
}

/// A light as reported by `GET /api/<username>/lights`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLight {
    pub id: String,
    pub name: String,
    pub kind: String,
}

#[derive(Deserialize)]
struct LightEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Talks to bridges on the local network. One instance serves every user;
/// the bridge address and username are supplied per call.
#[derive(Clone)]
pub struct HueBridge {
    http: reqwest::Client,
    scheme: String,
}

impl HueBridge {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self::from_client(http, "https"))
    }

    pub fn from_client(http: reqwest::Client, scheme: &str) -> Self {
        Self {
            http,
            scheme: scheme.to_string(),
        }
    }

    fn lights_url(&self, address: &str, username: &str) -> Result<Url, BridgeError> {
        let base = Url::parse(&format!("{}://{}/", self.scheme, address))
            .map_err(|e| BridgeError::Address(format!("{address}: {e}")))?;
        if base.host_str().is_none() || base.path() != "/" {
            return Err(BridgeError::Address(address.to_string()));
        }
        let mut url = base;
        url.path_segments_mut()
            .map_err(|_| BridgeError::Address(address.to_string()))?
            .pop_if_empty()
            .extend(["api", username, "lights"]);
        Ok(url)
    }

    pub async fn list_lights(
        &self,
        address: &str,
        username: &str,
    ) -> Result<Vec<BridgeLight>, BridgeError> {
        let url = self.lights_url(address, username)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        let body = read_json(resp).await?;

        let entries: BTreeMap<String, LightEntry> =
            serde_json::from_value(body).map_err(|e| BridgeError::Body(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|(id, entry)| BridgeLight {
                id,
                name: entry.name,
                kind: entry.kind,
            })
            .collect())
    }

    pub async fn set_light_on(
        &self,
        address: &str,
        username: &str,
        light_id: &str,
        on: bool,
    ) -> Result<(), BridgeError> {
        let mut url = self.lights_url(address, username)?;
        url.path_segments_mut()
            .map_err(|_| BridgeError::Address(address.to_string()))?
            .extend([light_id, "state"]);

        let resp = self
            .http
            .put(url)
            .json(&json!({ "on": on }))
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        read_json(resp).await?;
        Ok(())
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, BridgeError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(BridgeError::Status(status.as_u16()));
    }
    let body: Value = resp
        .json()
        .await
        .map_err(|e| BridgeError::Body(e.to_string()))?;

    if let Some(err) = first_error(&body) {
        return Err(err);
    }
    Ok(body)
}

/// The bridge reports failures with HTTP 200 and a list of `{"error": ...}` items.
fn first_error(body: &Value) -> Option<BridgeError> {
    body.as_array()?
        .iter()
        .find_map(|item| item.get("error"))
        .map(|err| BridgeError::Api {
            kind: err.get("type").and_then(Value::as_i64).unwrap_or_default(),
            description: err
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        })
}
