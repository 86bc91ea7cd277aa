//! Image representations and the codec that turns them into uploadable files.

mod codec;
mod types;

pub use codec::ImageCodec;
pub use types::{
    EncodedImage, ImageFile, ImageFormat, ImageSize, ImageSource, FALLBACK_MIME_TYPE,
};
