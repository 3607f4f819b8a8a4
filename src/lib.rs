//! `backoff-http` is an async HTTP request helper for paginated,
//! rate-limited REST APIs (GitHub-style).
//!
//! Every call runs a bounded retry loop:
//! - 2xx and 404 end the call with an [`HttpResponse`]
//! - 429 and 403 wait (server retry hint, else exponential backoff) and retry
//! - other statuses are retried at once until the attempt budget runs out
//!
//! Entry points: [`HttpClient::get`], [`HttpClient::post`],
//! [`HttpClient::request`] and [`header_link`] for `Link` pagination.

mod backoff;
mod classify;
mod client;
mod error;
mod link;
mod options;
mod types;

pub use backoff::{backoff_delay, backoff_seconds};
pub use classify::{classify_status, retry_hint, RetryHintError, StatusClass};
pub use client::{get, post, request, HttpClient};
pub use error::HttpError;
pub use link::{header_link, parse_link_header, Link};
pub use options::{ClientOptions, DEFAULT_PRODUCT};
pub use types::{HttpResponse, ResponseStatus};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, HttpError>;
