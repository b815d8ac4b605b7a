//! HTTP client for the marketplace Catalog Service
//!
//! JSON over HTTP(S). Feed and view-tracking requests carry the viewer's
//! session token as a bearer token; the category list is public.

use super::{CatalogService, FeedPage, FeedQuery};
use crate::error::{Error, FetchError, Result, TrackingFlushError};
use async_trait::async_trait;
use dzm_common::config::ClientSettings;
use dzm_common::models::{ApiResponse, FeedPayload};
use dzm_common::{Category, ViewEvent};
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!("dzm-shorts/", env!("CARGO_PKG_VERSION"));

/// Catalog Service client
pub struct HttpCatalog {
    http_client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpCatalog {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: settings.api_base_url.clone(),
            session_token: settings.session_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and unwrap the `{success, data}` envelope
    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        if !envelope.success {
            let (code, message) = match envelope.error {
                Some(err) => (err.code, err.message),
                None => (
                    "ERROR".to_string(),
                    envelope.message.unwrap_or_else(|| "request failed".to_string()),
                ),
            };
            return Err(FetchError::Rejected { code, message });
        }

        envelope
            .data
            .ok_or_else(|| FetchError::Parse("envelope has no data".to_string()))
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn fetch_feed(&self, query: &FeedQuery) -> std::result::Result<FeedPage, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }

        tracing::debug!(
            category = ?query.category,
            page = query.page,
            limit = query.limit,
            "Fetching shorts feed"
        );

        let request = self.authorized(self.http_client.get(self.url("/shorts/feed")).query(&params));
        let payload: FeedPayload = self.fetch_envelope(request).await?;
        let page = FeedPage::from_payload(payload);

        tracing::debug!(
            items = page.items.len(),
            has_more = ?page.has_more,
            "Fetched shorts feed page"
        );

        Ok(page)
    }

    async fn fetch_categories(&self) -> std::result::Result<Vec<Category>, FetchError> {
        let request = self.http_client.get(self.url("/shorts/categories"));
        self.fetch_envelope(request).await
    }

    async fn track_view(&self, event: &ViewEvent) -> std::result::Result<(), TrackingFlushError> {
        if self.session_token.is_none() {
            return Err(TrackingFlushError::Unauthenticated);
        }

        let body = event.to_request();
        // The deployed handler reads these from the query string; newer
        // servers read the JSON body. Both carry the same values.
        let duration = body.duration.to_string();
        let request = self
            .http_client
            .post(self.url("/shorts/track-view"))
            .query(&[("product_id", body.product_id.as_str()), ("duration", duration.as_str())])
            .json(&body);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| TrackingFlushError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackingFlushError::Server(status.as_u16()));
        }

        Ok(())
    }
}
