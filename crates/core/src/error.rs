//! Unified error types for api2md.
//!
//! Every per-URL failure that aborts a conversion is one of these. Failures
//! that only degrade output (unclassifiable markup, exhausted filename
//! suffixes) have their own local error types and never reach this enum.

/// Unified error type for a single URL conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network or DNS failure while retrieving the page.
    #[error("FETCH_ERROR: {0}")]
    Fetch(String),

    /// Retrieval, rendering or disclosure expansion exceeded its time ceiling.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The page is not HTML.
    #[error("UNSUPPORTED_CONTENT: {0}")]
    UnsupportedContent(String),

    /// The headless browser failed to produce a document.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Normalization produced no usable content region.
    #[error("EMPTY_CONTENT: {0}")]
    EmptyContent(String),

    /// The Markdown file could not be written.
    #[error("WRITE_FAILED: {0}")]
    WriteFailed(#[from] std::io::Error),
}

impl Error {
    /// True for failures in retrieving or rendering the page.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_)
                | Error::FetchTimeout(_)
                | Error::FetchTooLarge(_)
                | Error::HttpError(_)
                | Error::UnsupportedContent(_)
                | Error::RenderFailed(_)
        )
    }

    /// Transient retrieval failures that a second attempt may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::FetchTimeout(_) | Error::RenderFailed(_))
    }

    /// Short machine-readable code, the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Fetch(_) => "FETCH_ERROR",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::UnsupportedContent(_) => "UNSUPPORTED_CONTENT",
            Error::RenderFailed(_) => "RENDER_FAILED",
            Error::EmptyContent(_) => "EMPTY_CONTENT",
            Error::WriteFailed(_) => "WRITE_FAILED",
        }
    }
}
