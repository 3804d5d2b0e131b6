//! Client for the National Weather Service API.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::constants::{ACCEPT_GEO_JSON, REQUEST_TIMEOUT, USER_AGENT};
use crate::models::{AlertResponse, ForecastResponse, PointsResponse};

#[derive(Debug, thiserror::Error)]
pub enum NwsError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("request failed with status: {0}")]
    Status(StatusCode),
    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct NwsClient {
    client: Client,
    base_url: String,
}

impl NwsClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// Idle connections are not kept, so every call opens its own connection.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GEO_JSON));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Makes an HTTP GET request and deserializes the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NwsError> {
        tracing::debug!(url, "NWS request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(NwsError::Transport)?;

        if !response.status().is_success() {
            return Err(NwsError::Status(response.status()));
        }

        response.json::<T>().await.map_err(NwsError::Decode)
    }

    /// Active alerts for a region code, forwarded as given
    pub async fn alerts(&self, state: &str) -> Result<AlertResponse, NwsError> {
        let url = format!("{}/alerts/active/area/{}", self.base_url, state);
        self.get_json(&url).await
    }

    /// Resolves coordinates to the grid point carrying the forecast URL.
    ///
    /// Coordinates use the shortest `f64` display form, so `39.0` is sent as
    /// `39`. The API accepts either spelling.
    pub async fn points(&self, latitude: f64, longitude: f64) -> Result<PointsResponse, NwsError> {
        let url = format!("{}/points/{},{}", self.base_url, latitude, longitude);
        self.get_json(&url).await
    }

    pub async fn forecast(&self, forecast_url: &str) -> Result<ForecastResponse, NwsError> {
        self.get_json(forecast_url).await
    }
}
