use crate::ResponseStatus;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The verb is not a valid HTTP method token.
    #[error("invalid http method '{verb}': {url}")]
    InvalidMethod { url: String, verb: String },
    /// The request could not be built from the url, headers and body.
    #[error("invalid request: {source}: {url}")]
    Build { url: String, source: reqwest::Error },
    /// The configured product/version is not a valid header value.
    #[error("invalid user agent '{value}': {url}")]
    InvalidUserAgent { url: String, value: String },
    /// Network, TLS or timeout failure while sending or reading the response.
    #[error("transport error: {source}: {url}")]
    Transport { url: String, source: reqwest::Error },
    /// A rate-limit response carried a retry hint that could not be parsed.
    #[error("invalid retry hint '{header}: {value}': {url}")]
    InvalidRetryHint {
        url: String,
        header: &'static str,
        value: String,
    },
    /// The attempt budget ran out before a terminal response.
    #[error("Invalid Status Code: {url}")]
    AttemptsExhausted {
        url: String,
        /// Number of attempts consumed.
        attempts: u32,
        /// Status of the last response seen, if any.
        last_status: Option<u16>,
    },
    /// The cancellation token fired during a send or a backoff wait.
    #[error("request cancelled: {url}")]
    Cancelled { url: String },
    /// Response body decoding error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl HttpError {
    /// The `-1`-coded status envelope describing this failure.
    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::failed(self.to_string())
    }

    /// URL of the failed request, when the error belongs to one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InvalidMethod { url, .. }
            | Self::Build { url, .. }
            | Self::InvalidUserAgent { url, .. }
            | Self::Transport { url, .. }
            | Self::InvalidRetryHint { url, .. }
            | Self::AttemptsExhausted { url, .. }
            | Self::Cancelled { url } => Some(url),
            Self::Decode(_) => None,
        }
    }
}
