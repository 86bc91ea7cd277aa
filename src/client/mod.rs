//! HTTP client for the image generation service.

mod edit;
mod generate;
mod service;
#[cfg(test)]
mod test_server;

pub use service::{CreateImageRequest, EditImageRequest, ImageService};

use crate::error::{GenEditError, Result};
use crate::image::EncodedImage;
use async_trait::async_trait;
use serde::Deserialize;

/// Environment variable consulted when no base URL is configured.
pub const BASE_URL_ENV: &str = "GENEDIT_API_BASE_URL";

/// Base URL used when neither the builder nor the environment provide one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const CREATE_IMAGE_PATH: &str = "/api/create-image";
const EDIT_IMAGE_PATH: &str = "/api/edit-image";
const HEALTH_PATH: &str = "/api/health";

/// Builder for [`ApiClient`].
#[derive(Debug, Clone, Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL. Falls back to `GENEDIT_API_BASE_URL`, then
    /// `http://localhost:8000`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Uses a preconfigured HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the client, resolving the base URL.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GenEditError::InvalidRequest(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        Ok(ApiClient {
            client: self.client.unwrap_or_default(),
            base_url,
        })
    }
}

/// Client for the create-image and edit-image endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new `ApiClientBuilder`.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Returns the resolved base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying HTTP client.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a response into an image, or into a service error carrying the
    /// body's `detail` (or `default_message` when there is none).
    async fn parse_response(
        response: reqwest::Response,
        default_message: &str,
    ) -> Result<EncodedImage> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_failure(status.as_u16(), &text, default_message));
        }

        let body: ImageResponse = response.json().await?;
        match body.image {
            Some(image) if !image.is_empty() => Ok(image),
            _ => Err(GenEditError::UnexpectedResponse(
                "response contained no image".into(),
            )),
        }
    }
}

#[async_trait]
impl ImageService for ApiClient {
    async fn create_image(&self, request: &CreateImageRequest) -> Result<EncodedImage> {
        ApiClient::create_image(self, request).await
    }

    async fn edit_image(&self, request: &EditImageRequest) -> Result<EncodedImage> {
        ApiClient::edit_image(self, request).await
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.client.get(self.endpoint(HEALTH_PATH)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_failure(
                status.as_u16(),
                &text,
                "Image service is unavailable",
            ));
        }
        Ok(())
    }
}

/// Success body shared by both endpoints.
#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image: Option<EncodedImage>,
}

/// Failure body shared by both endpoints.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Builds the service error for a non-success response.
///
/// Any non-empty string `detail` is surfaced verbatim; anything else (missing
/// body, invalid JSON, structured validation detail) yields `default_message`.
fn parse_failure(status: u16, text: &str, default_message: &str) -> GenEditError {
    let message = serde_json::from_str::<ErrorResponse>(text)
        .ok()
        .and_then(|body| match body.detail {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => Some(detail),
            _ => None,
        })
        .unwrap_or_else(|| default_message.to_string());

    GenEditError::Service { status, message }
}
