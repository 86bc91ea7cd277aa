//! Core image types: sizes, formats, and the two image representations.

use crate::error::{GenEditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MIME type used when nothing better can be determined.
pub const FALLBACK_MIME_TYPE: &str = "image/png";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Output dimensions offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    /// 1024x1024.
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    /// 1792x1024.
    #[serde(rename = "1792x1024")]
    Landscape,
    /// 1024x1792.
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    /// All size options, in display order.
    pub const ALL: [ImageSize; 3] = [Self::Square, Self::Landscape, Self::Portrait];

    /// Returns the wire value (e.g., "1792x1024").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1024x1024",
            Self::Landscape => "1792x1024",
            Self::Portrait => "1024x1792",
        }
    }

    /// Returns the human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Square => "Square (1024x1024)",
            Self::Landscape => "Landscape (1792x1024)",
            Self::Portrait => "Portrait (1024x1792)",
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImageSize {
    type Err = GenEditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1024x1024" | "square" => Ok(Self::Square),
            "1792x1024" | "landscape" => Ok(Self::Landscape),
            "1024x1792" | "portrait" => Ok(Self::Portrait),
            other => Err(GenEditError::InvalidRequest(format!(
                "unsupported size '{other}' (expected one of 1024x1024, 1792x1024, 1024x1792)"
            ))),
        }
    }
}

/// An image as returned by the service: a data URI or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wraps an encoded representation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds a base64 data URI from raw bytes.
    pub fn from_bytes(mime_type: &str, data: &[u8]) -> Self {
        use base64::Engine;
        Self(format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(data)
        ))
    }

    /// Returns the raw representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is an embedded `data:` URI.
    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Returns true if the representation carries no content.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_data_uri() && self.0.len() > 64 {
            let head: String = self.0.chars().take(48).collect();
            write!(f, "{}... ({} chars)", head, self.0.len())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A named binary image blob, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// File name sent with the multipart part.
    pub name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

impl ImageFile {
    /// Creates a new image file.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Reads a local file, inferring the MIME type from its extension, then its
    /// content, then falling back to PNG.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .map(|f| f.mime_type())
            .unwrap_or(FALLBACK_MIME_TYPE);

        Ok(Self::new(name, mime_type, data))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }

    /// Returns the file as a data URI, suitable for previews.
    pub fn to_data_url(&self) -> String {
        EncodedImage::from_bytes(&self.mime_type, &self.data).0
    }
}

/// The image designated as input to the next edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A representation returned by the service (generated or edited).
    Encoded(EncodedImage),
    /// A file the user picked locally.
    Local(ImageFile),
}

impl ImageSource {
    /// Returns a previewable representation of the source.
    pub fn preview(&self) -> String {
        match self {
            Self::Encoded(image) => image.as_str().to_string(),
            Self::Local(file) => file.to_data_url(),
        }
    }

    /// Returns the local file, if this source is one.
    pub fn local_file(&self) -> Option<&ImageFile> {
        match self {
            Self::Local(file) => Some(file),
            Self::Encoded(_) => None,
        }
    }
}
