//! Edit-image endpoint (multipart/form-data).

use super::{ApiClient, EditImageRequest, EDIT_IMAGE_PATH};
use crate::error::{GenEditError, Result};
use crate::image::{EncodedImage, ImageFile};
use std::time::Instant;

const DEFAULT_FAILURE: &str = "Failed to edit image";

impl ApiClient {
    /// Sends the prompt and image to the edit-image endpoint.
    pub async fn edit_image(&self, request: &EditImageRequest) -> Result<EncodedImage> {
        let start = Instant::now();
        tracing::debug!(
            file_name = %request.image.name,
            mime_type = %request.image.mime_type,
            bytes = request.image.size(),
            "sending edit-image request"
        );

        let form = reqwest::multipart::Form::new()
            .text("prompt", request.prompt.clone())
            .part("image", image_part(&request.image)?);

        let response = self
            .client
            .post(self.endpoint(EDIT_IMAGE_PATH))
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let image = Self::parse_response(response, DEFAULT_FAILURE).await?;

        tracing::debug!(
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "edit-image request complete"
        );
        Ok(image)
    }
}

fn image_part(image: &ImageFile) -> Result<reqwest::multipart::Part> {
    reqwest::multipart::Part::bytes(image.data.clone())
        .file_name(image.name.clone())
        .mime_str(&image.mime_type)
        .map_err(|e| GenEditError::InvalidRequest(format!("invalid MIME type: {e}")))
}
