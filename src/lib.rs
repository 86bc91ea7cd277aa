#![warn(missing_docs)]
//! GenEdit - generate an image from a prompt, then refine it with edit prompts.
//!
//! The [`Workflow`] controller owns the session state: prompts, selected size,
//! the generated/source/edited image slots, the shared error message and the
//! status of the two operations. It talks to the image service through the
//! [`ImageService`] trait, implemented over HTTP by [`ApiClient`].
//!
//! # Quick Start
//!
//! ```no_run
//! use genedit::{ApiClient, ImageSize, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> genedit::Result<()> {
//!     let client = ApiClient::builder().base_url("http://localhost:8000").build()?;
//!     let workflow = Workflow::new(client);
//!
//!     workflow
//!         .generate("a cozy cabin in the mountains during sunset", ImageSize::Square)
//!         .await?;
//!     let edited = workflow.edit("add a light snowfall").await?;
//!     println!("{edited}");
//!     Ok(())
//! }
//! ```
//!
//! # Image sources
//!
//! The image an edit is applied to is an [`ImageSource`]: either an encoded
//! image returned by the service (generated or edited), or a local
//! [`ImageFile`]. Whichever was set most recently wins. Encoded images are
//! turned into uploadable files by the [`ImageCodec`].

mod error;

pub mod client;
pub mod image;
pub mod workflow;

// Re-export error types at crate root
pub use error::{ErrorKind, GenEditError, Operation, Result};

pub use client::{ApiClient, ApiClientBuilder, CreateImageRequest, EditImageRequest, ImageService};
pub use image::{EncodedImage, ImageCodec, ImageFile, ImageFormat, ImageSize, ImageSource};
pub use workflow::{TaskStatus, Workflow, WorkflowState};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{ApiClient, ImageService};
    pub use crate::error::{GenEditError, Result};
    pub use crate::image::{EncodedImage, ImageFile, ImageSize, ImageSource};
    pub use crate::workflow::{Workflow, WorkflowState};
}
