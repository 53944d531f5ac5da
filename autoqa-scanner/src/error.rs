use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Failures surfaced by a [`crate::PageDriver`].
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Navigation to {0} timed out")]
    Timeout(String),

    #[error("Page at {url} has no document body (content-type: {content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("No page loaded")]
    NoPage,

    #[error("Other error: {0}")]
    Other(String),
}

impl DriverError {
    /// Timeouts and transport failures are worth another attempt; bad
    /// selectors and non-HTML documents are not.
    pub fn is_transient(&self) -> bool {
        match self {
            DriverError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DriverError::Timeout(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
