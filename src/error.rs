//! Error types for the generate/edit workflow.

/// Errors that can occur while generating or editing images.
#[derive(Debug, thiserror::Error)]
pub enum GenEditError {
    /// No image is available to send to the edit endpoint.
    #[error("Please upload or generate an image to edit")]
    MissingSourceImage,

    /// The edit prompt is empty or whitespace.
    #[error("Please provide an edit prompt")]
    EmptyEditPrompt,

    /// The service answered with a non-success status.
    ///
    /// Displays as the bare message so it can be shown to the user verbatim.
    #[error("{message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// The body's `detail`, or the operation's default message.
        message: String,
    },

    /// The service answered 2xx but the body did not carry an image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// An image representation could not be turned into bytes.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The same operation is already in flight.
    #[error("{0} already in progress")]
    Busy(Operation),

    /// Invalid configuration or request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., reading or saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The two user-triggered network operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create an image from a prompt.
    Generate,
    /// Edit the current source image with a prompt.
    Edit,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generation"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// Coarse classification of a [`GenEditError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally before any request was sent.
    Validation,
    /// Non-success or malformed answer from the service.
    Service,
    /// The stored image could not be materialized into a file.
    Decode,
    /// Network, body parsing, or local I/O failure.
    Transport,
    /// Duplicate submission of a pending operation.
    Busy,
}

impl GenEditError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSourceImage | Self::EmptyEditPrompt | Self::InvalidRequest(_) => {
                ErrorKind::Validation
            }
            Self::Service { .. } | Self::UnexpectedResponse(_) => ErrorKind::Service,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Network(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Transport,
        }
    }

    /// Returns true if the error was raised before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Decode | ErrorKind::Busy
        )
    }

    /// Returns the HTTP status for service errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, GenEditError>;
