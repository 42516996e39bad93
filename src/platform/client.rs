use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::AppConfig;
use crate::error::PlatformError;
use crate::platform::session_store::SessionStore;

/// HTTP client for the hosted platform.
///
/// Constructed once by the host and shared by every view through the platform
/// traits. Requests carry the project's anon key, plus the current session's
/// access token when one exists.
#[derive(Clone)]
pub struct PlatformClient {
    http: ReqwestClient,
    base_url: String,
    anon_key: String,
    pub(crate) profile_table: String,
    pub(crate) redirect_url: Option<String>,
    pub(crate) sessions: Arc<dyn SessionStore>,
}

impl PlatformClient {
    pub fn new(config: &AppConfig, sessions: Arc<dyn SessionStore>) -> Result<Self, PlatformError> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.platform.base_url().to_string(),
            anon_key: config.platform.anon_key.clone(),
            profile_table: config.platform.profile_table.clone(),
            redirect_url: config.platform.redirect_url.clone(),
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<path>` for a fixed service path
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Like [`endpoint`](Self::endpoint) but appends percent-encoded segments
    pub(crate) fn endpoint_with_segments(&self, path: &str, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = Url::parse(&self.endpoint(path)).map_err(|e| PlatformError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PlatformError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request with the project key and the given bearer token (anon key if none)
    pub(crate) fn request<U>(&self, method: Method, url: U, bearer: Option<&str>) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        let token = bearer.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    /// Send a request and turn non-success statuses into API errors
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, PlatformError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, path = url.path(), "sending platform request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(%method, path = url.path(), %status, "received platform response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::from_response(status, &body))
    }

    pub(crate) async fn send_json<T>(&self, builder: RequestBuilder) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Access token of the current (refreshed if needed) session
    pub(crate) async fn access_token(&self) -> Result<Option<String>, PlatformError> {
        Ok(self.current_session().await?.map(|s| s.access_token))
    }
}
