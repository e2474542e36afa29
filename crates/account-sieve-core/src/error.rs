#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Transport failures, 5xx and 429 responses are worth another attempt.
    /// A body that does not decode will not decode the second time either.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: usize },
    #[error("base URL is empty")]
    EmptyBaseUrl,
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SieveError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(
        "page retrieval failed after {attempts} attempt(s) at token {}: {source}",
        .token.as_deref().unwrap_or("<first page>")
    )]
    PageRetrieval {
        token: Option<String>,
        attempts: u32,
        #[source]
        source: FetchError,
    },
    #[error("page feed closed before retrieval finished")]
    FeedClosed,
    #[error("pipeline task ended without reporting an outcome")]
    Aborted,
}
