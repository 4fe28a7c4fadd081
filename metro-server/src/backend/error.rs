//! Backend client error types.

/// Errors from the MetroInfo HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum MetroError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON parse error: {message}{}", fmt_body(.body))]
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend could not produce a route
    #[error("route unavailable: {0}")]
    RouteUnavailable(String),

    /// Rate limited by the API
    #[error("rate limited by metro backend")]
    RateLimited,

    /// Backend rejected our credentials
    #[error("unauthorized")]
    Unauthorized,

    /// Request could not be built from the configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Mock fixture missing or unreadable
    #[error("mock data error: {0}")]
    Mock(String),
}

fn fmt_body(body: &Option<String>) -> String {
    body.as_ref()
        .map(|b| format!(" (body: {b})"))
        .unwrap_or_default()
}

impl MetroError {
    /// Whether the failure is the caller's fault (unknown station, no route)
    /// rather than a backend or transport problem.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MetroError::NotFound(_) | MetroError::RouteUnavailable(_))
    }
}
