use thiserror::Error;

/// Failures while retrieving a page.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Fetch failed earlier in this run: {0}")]
    PreviouslyFailed(String),

    #[error("Failed to fetch {url} after {attempts} attempts: {reason}")]
    RetriesExhausted { url: String, attempts: u32, reason: String },
}

/// Failures of the semantic-extraction service.
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Response carried no message content")]
    MissingContent,

    #[error("Malformed JSON in response: {0}")]
    MalformedJson(#[from] serde_json::Error),
}
