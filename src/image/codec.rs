//! Turns an encoded image representation into an uploadable file.

use crate::error::{GenEditError, Result};
use crate::image::types::{EncodedImage, ImageFile, ImageFormat, FALLBACK_MIME_TYPE};

/// Materializes [`EncodedImage`] values into [`ImageFile`]s.
///
/// Data URIs are decoded in place; `http(s)` references are downloaded with the
/// wrapped client.
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    client: reqwest::Client,
}

impl ImageCodec {
    /// Creates a codec that downloads remote references with `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Produces a file named `file_name` holding the decoded image bytes.
    ///
    /// The MIME type comes from the payload (data URI header, `Content-Type`, or
    /// magic bytes) and defaults to `image/png`.
    pub async fn to_file(&self, image: &EncodedImage, file_name: &str) -> Result<ImageFile> {
        if image.is_empty() {
            return Err(GenEditError::Decode("image payload is empty".into()));
        }

        let value = image.as_str().trim();
        let (declared, data) = if value.starts_with("data:") {
            decode_data_uri(value)?
        } else if value.starts_with("http://") || value.starts_with("https://") {
            self.download(value).await?
        } else {
            return Err(GenEditError::Decode(
                "unsupported image reference (expected a data: URI or http(s) URL)".into(),
            ));
        };

        if data.is_empty() {
            return Err(GenEditError::Decode("image payload is empty".into()));
        }

        let mime_type = declared
            .filter(|m| !m.is_empty())
            .or_else(|| ImageFormat::from_magic_bytes(&data).map(|f| f.mime_type().to_string()))
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        tracing::debug!(file_name, mime_type = %mime_type, bytes = data.len(), "materialized image");
        Ok(ImageFile::new(file_name, mime_type, data))
    }

    async fn download(&self, url: &str) -> Result<(Option<String>, Vec<u8>)> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GenEditError::Decode(format!(
                "image download failed with status {}",
                response.status().as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let data = response.bytes().await?.to_vec();
        Ok((content_type, data))
    }
}

/// Splits a `data:[<mediatype>][;base64],<data>` URI into its MIME type and bytes.
fn decode_data_uri(uri: &str) -> Result<(Option<String>, Vec<u8>)> {
    let rest = &uri["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| GenEditError::Decode("data URI has no ',' separator".into()))?;

    let mut params = header.split(';');
    let mime_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        decode_base64_lenient(payload)
            .map_err(|e| GenEditError::Decode(format!("invalid base64 payload: {e}")))?
    } else {
        percent_decode(payload)?
    };

    Ok((mime_type, data))
}

/// Decodes `%XX` escapes in a non-base64 data URI payload.
fn percent_decode(payload: &str) -> Result<Vec<u8>> {
    let bytes = payload.as_bytes();
    for (i, _) in payload.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(GenEditError::Decode(format!(
                "invalid percent escape at offset {i}"
            )));
        }
    }
    Ok(urlencoding::decode_binary(bytes).into_owned())
}

/// Decodes base64 that may carry embedded whitespace or lack padding.
fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;

    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}
