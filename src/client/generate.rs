//! Create-image endpoint.

use super::{ApiClient, CreateImageRequest, CREATE_IMAGE_PATH};
use crate::error::Result;
use crate::image::EncodedImage;
use std::time::Instant;

const DEFAULT_FAILURE: &str = "Failed to generate image";

impl ApiClient {
    /// Sends `{prompt, size}` to the create-image endpoint.
    ///
    /// An empty prompt is sent as-is and left for the service to reject.
    pub async fn create_image(&self, request: &CreateImageRequest) -> Result<EncodedImage> {
        let start = Instant::now();
        tracing::debug!(size = %request.size, "sending create-image request");

        let response = self
            .client
            .post(self.endpoint(CREATE_IMAGE_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let image = Self::parse_response(response, DEFAULT_FAILURE).await?;

        tracing::debug!(
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "create-image request complete"
        );
        Ok(image)
    }
}
