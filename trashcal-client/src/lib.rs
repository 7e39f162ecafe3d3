//! HTTP implementation of the resolver port for a town's calendar service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use trashcal_core::{
    ApiError, DebugPreview, Endpoints, ResolutionInput, ResolveSuccess, ResolvedRoute,
    ResolverPort, Selection, TownConfig, VersionResponse, canonical_types, join_types,
};

/// Upper bound for every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

const JSON: &str = "application/json";

/// Resolver talking to one town's calendar service over HTTP.
pub struct HttpResolver {
    client: Client,
    town: TownConfig,
    endpoints: Endpoints,
    timeout: Duration,
}

impl HttpResolver {
    /// Create a resolver for `town` using already resolved endpoints.
    #[must_use]
    pub fn new(client: Client, town: TownConfig, endpoints: Endpoints) -> Self {
        Self {
            client,
            town,
            endpoints,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoints.join(path)?;
        Ok(self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(JSON))
            .timeout(self.timeout))
    }
}

#[async_trait]
impl ResolverPort for HttpResolver {
    fn town(&self) -> &TownConfig {
        &self.town
    }

    async fn fetch_version(&self) -> Result<VersionResponse, ApiError> {
        let req = self.get(&self.endpoints.api().version_path)?;
        fetch_json(req).await
    }

    async fn resolve_route(&self, input: &ResolutionInput) -> Result<ResolvedRoute, ApiError> {
        let req = self
            .get(&self.endpoints.api().resolve_path)?
            .query(&input.query_pairs());
        let resolved: ResolveSuccess = fetch_json(req).await?;
        Ok(resolved.route)
    }

    async fn fetch_debug_preview(&self, selection: &Selection) -> Result<DebugPreview, ApiError> {
        // Unlike the subscription URL, the preview always names its types.
        let types = join_types(&canonical_types(&selection.types));
        let mut req = self.get(&self.endpoints.api().debug_path)?.query(&[
            ("weekday", selection.weekday.as_str()),
            ("color", selection.color.as_str()),
            ("types", types.as_str()),
        ]);
        if let Some(days) = selection.days.filter(|days| *days > 0) {
            req = req.query(&[("days", days)]);
        }
        fetch_json(req).await
    }

    async fn fetch_streets(&self) -> Result<Vec<String>, ApiError> {
        let req = self
            .get(&self.endpoints.api().streets_path)?
            .query(&[("full", "1")]);
        fetch_json(req).await
    }
}

// Send, check the status, and decode JSON; error bodies go through `ApiError`.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
    let resp = req.send().await.map_err(|err| {
        warn!(error = %err, timeout = err.is_timeout(), "request failed");
        ApiError::from(err)
    })?;

    let status = resp.status();
    if !status.is_success() {
        let err = error_from_response(resp).await;
        debug!(status = status.as_u16(), error = %err, "service rejected request");
        return Err(err);
    }

    resp.json().await.map_err(ApiError::from)
}

async fn error_from_response(resp: Response) -> ApiError {
    let status = resp.status().as_u16();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(JSON));
    if !is_json {
        return ApiError::Status { status };
    }

    match resp.bytes().await {
        Ok(body) => ApiError::from_error_response(status, Some(body.as_ref())),
        Err(err) if err.is_timeout() => ApiError::Timeout,
        Err(_) => ApiError::Status { status },
    }
}
