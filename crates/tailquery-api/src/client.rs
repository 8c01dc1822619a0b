// Async HTTP client for the Tailscale v2 REST API.
//
// Base path: {base}/api/v2/tailnet/{tailnet}/
// Auth: `Authorization: Bearer <api key>`

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ApiDevice, ApiUser, DeviceList, ErrorResponse, UserList};
use crate::transport::TransportConfig;

/// Public API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tailscale.com";

/// Tailnet alias meaning "the tailnet that owns the API key".
pub const DEFAULT_TAILNET: &str = "-";

/// Async client for the Tailscale v2 API.
///
/// Cheap to share behind an `Arc`: `reqwest::Client` pools connections
/// internally and every method takes `&self`.
pub struct TailscaleClient {
    http: reqwest::Client,
    base_url: Url,
    tailnet: String,
}

impl TailscaleClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `Authorization: Bearer ...` as a default, sensitive header.
    pub fn from_api_key(
        base_url: &str,
        tailnet: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| Error::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = transport.build_client_with_headers(headers)?;
        Self::from_reqwest(base_url, tailnet, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, tailnet: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let tailnet = if tailnet.is_empty() { DEFAULT_TAILNET } else { tailnet };

        Ok(Self {
            http,
            base_url,
            tailnet: tailnet.to_owned(),
        })
    }

    /// The tailnet this client is scoped to.
    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// `{base}/api/v2/tailnet/{tailnet}/{resource}` with each segment encoded.
    fn tailnet_url(&self, resource: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v2", "tailnet", self.tailnet.as_str(), resource]);
        }
        url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every device in the tailnet with all optional fields populated.
    ///
    /// `GET /api/v2/tailnet/{tailnet}/devices?fields=all`
    pub async fn list_devices(&self) -> Result<Vec<ApiDevice>, Error> {
        let url = self.tailnet_url("devices");
        let list: DeviceList = self.get(url, &[("fields", "all")]).await?;
        debug!(count = list.devices.len(), "listed devices");
        Ok(list.devices)
    }

    /// List every user in the tailnet.
    ///
    /// `GET /api/v2/tailnet/{tailnet}/users`
    pub async fn list_users(&self) -> Result<Vec<ApiUser>, Error> {
        let url = self.tailnet_url("users");
        let list: UserList = self.get(url, &[]).await?;
        debug!(count = list.users.len(), "listed users");
        Ok(list.users)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).query(query).send().await?;
        Self::handle_response(resp).await
    }

    /// Decode a success body, or translate the status into an `Error`.
    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            let body = resp.text().await?;
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            return Err(Error::RateLimited { retry_after_secs });
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned());

        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(Error::Authentication { message })
            }
            _ => Err(Error::Api {
                message,
                status: status.as_u16(),
            }),
        }
    }
}
