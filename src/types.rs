use reqwest::header::{HeaderMap, LINK};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{link::header_link, HttpError, Result};

/// Status line and code of a finished call.
///
/// `code` is `-1` only for failures reported through [`HttpError::status`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub text: String,
    pub code: i32,
}

impl ResponseStatus {
    /// Sentinel code for calls that ended without a usable HTTP status.
    pub const FAILED: i32 = -1;

    pub(crate) fn from_http(status: reqwest::StatusCode) -> Self {
        Self {
            text: status.to_string(),
            code: i32::from(status.as_u16()),
        }
    }

    pub(crate) fn failed(text: String) -> Self {
        Self {
            text,
            code: Self::FAILED,
        }
    }
}

/// Body, status and headers of a terminal (2xx or 404) response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub body: Vec<u8>,
    pub status: ResponseStatus,
    /// Case-insensitive, multi-valued response headers.
    pub headers: HeaderMap,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status.code)
    }

    pub fn is_not_found(&self) -> bool {
        self.status.code == 404
    }

    /// Body as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            HttpError::Decode(format!(
                "invalid JSON body: {err}; body: {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    /// URL for `rel` in the `Link` header, or `""`.
    ///
    /// Multiple `Link` header lines are searched in order.
    pub fn link(&self, rel: &str) -> String {
        self.headers
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(|value| header_link(value, rel))
            .find(|url| !url.is_empty())
            .unwrap_or_default()
    }

    /// Next page of a paginated listing, if the server advertised one.
    pub fn next_page(&self) -> Option<String> {
        Some(self.link("next")).filter(|url| !url.is_empty())
    }
}
