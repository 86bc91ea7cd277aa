//! Image service trait and request types.

use crate::error::Result;
use crate::image::{EncodedImage, ImageFile, ImageSize};
use async_trait::async_trait;
use serde::Serialize;

/// Body of a create-image request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateImageRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Desired output dimensions.
    pub size: ImageSize,
}

impl CreateImageRequest {
    /// Creates a new request with the given prompt and the default size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
        }
    }

    /// Sets the output size.
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }
}

/// Payload of an edit-image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditImageRequest {
    /// Instructions for the edit.
    pub prompt: String,
    /// The image to edit.
    pub image: ImageFile,
}

impl EditImageRequest {
    /// Creates a new edit request.
    pub fn new(prompt: impl Into<String>, image: ImageFile) -> Self {
        Self {
            prompt: prompt.into(),
            image,
        }
    }
}

/// The remote image generation service.
///
/// Implementations perform a single request/response exchange per call and
/// never touch workflow state.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Creates an image from a prompt.
    async fn create_image(&self, request: &CreateImageRequest) -> Result<EncodedImage>;

    /// Edits an image according to a prompt.
    async fn edit_image(&self, request: &EditImageRequest) -> Result<EncodedImage>;

    /// Checks if the service is reachable.
    async fn health_check(&self) -> Result<()>;
}
