use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{header, Method};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    backoff::backoff_delay,
    classify::{classify_status, retry_hint, StatusClass},
    ClientOptions, HttpError, HttpResponse, ResponseStatus, Result,
};

#[derive(Clone, Debug, Default)]
/// HTTP client that retries rate-limited (429) and forbidden (403) responses
/// with exponential backoff.
///
/// Each call owns its attempt counter; clones share only the connection pool.
pub struct HttpClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl HttpClient {
    /// Creates a client with default options (60 s timeout, 8 attempts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies client options such as timeout, attempt budget and identity.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Issues a `GET` request.
    pub async fn get<I, K, V>(&self, url: &str, headers: I) -> Result<HttpResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request(url, "GET", headers, None::<Vec<u8>>).await
    }

    /// Issues a `POST` request with `body` as payload.
    pub async fn post<I, K, V, B>(&self, url: &str, headers: I, body: B) -> Result<HttpResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        B: Into<Vec<u8>>,
    {
        self.request(url, "POST", headers, Some(body)).await
    }

    /// Issues a request with any verb, retrying 429/403 responses.
    ///
    /// Returns the response for 2xx and 404. Construction and transport errors
    /// are returned at once and never retried.
    pub async fn request<I, K, V, B>(
        &self,
        url: &str,
        verb: &str,
        headers: I,
        body: Option<B>,
    ) -> Result<HttpResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        B: Into<Vec<u8>>,
    {
        self.request_cancellable(url, verb, headers, body, &CancellationToken::new())
            .await
    }

    /// Same as [`HttpClient::request`], aborting the pending send or backoff
    /// wait with [`HttpError::Cancelled`] once `cancel` fires.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use backoff_http::{CancellationToken, HttpClient};
    ///
    /// # async fn run() -> backoff_http::Result<()> {
    /// let client = HttpClient::new();
    /// let cancel = CancellationToken::new();
    /// let deadline = cancel.clone();
    /// tokio::spawn(async move {
    ///     tokio::time::sleep(Duration::from_secs(300)).await;
    ///     deadline.cancel();
    /// });
    ///
    /// let repos = client
    ///     .request_cancellable(
    ///         "https://api.github.com/orgs/rust-lang/repos",
    ///         "GET",
    ///         [("Accept", "application/vnd.github+json")],
    ///         None::<Vec<u8>>,
    ///         &cancel,
    ///     )
    ///     .await?;
    /// println!("{}", repos.status.text);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request_cancellable<I, K, V, B>(
        &self,
        url: &str,
        verb: &str,
        headers: I,
        body: Option<B>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        B: Into<Vec<u8>>,
    {
        let method = Method::from_bytes(verb.as_bytes()).map_err(|_| HttpError::InvalidMethod {
            url: url.to_owned(),
            verb: verb.to_owned(),
        })?;
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let body: Option<Vec<u8>> = body.map(Into::into);
        let identity = self.options.user_agent();
        let user_agent = header::HeaderValue::from_str(&identity).map_err(|_| {
            HttpError::InvalidUserAgent {
                url: url.to_owned(),
                value: identity.clone(),
            }
        })?;

        let mut attempts = 0u32;
        let mut last_status = None;

        while attempts < self.options.max_attempts {
            let mut builder = self
                .http
                .request(method.clone(), url)
                .timeout(self.options.timeout);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(payload) = &body {
                builder = builder.body(payload.clone());
            }
            let mut request = builder.build().map_err(|source| HttpError::Build {
                url: url.to_owned(),
                source,
            })?;
            // Replaces any caller-supplied value: the identity is single-valued.
            request
                .headers_mut()
                .insert(header::USER_AGENT, user_agent.clone());

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(url)),
                sent = self.http.execute(request) => sent.map_err(|source| HttpError::Transport {
                    url: url.to_owned(),
                    source,
                })?,
            };

            let status = response.status();
            last_status = Some(status.as_u16());

            match classify_status(status) {
                StatusClass::Success => {
                    return self.finish(response, url, cancel).await;
                }
                StatusClass::NotFound => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Status: {} - Resource: {}", status, url);
                    return self.finish(response, url, cancel).await;
                }
                StatusClass::RateLimited | StatusClass::Forbidden => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Status: {} - Resource: {}", status, url);
                    let response_headers = response.headers().clone();
                    drop(response);
                    attempts = self
                        .back_off(&response_headers, attempts, url, cancel)
                        .await?;
                }
                StatusClass::Unclassified => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Status: {} - Resource: {} (retrying)", status, url);
                    drop(response);
                    attempts += 1;
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            "giving up on {} after {} attempts (last status {:?})",
            url,
            attempts,
            last_status
        );

        Err(HttpError::AttemptsExhausted {
            url: url.to_owned(),
            attempts,
            last_status,
        })
    }

    async fn finish(
        &self,
        response: reqwest::Response,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let status = ResponseStatus::from_http(response.status());
        let headers = response.headers().clone();
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled(url)),
            read = response.bytes() => read.map_err(|source| HttpError::Transport {
                url: url.to_owned(),
                source,
            })?,
        };

        Ok(HttpResponse {
            body: body.to_vec(),
            status,
            headers,
        })
    }

    /// Waits out a 429/403 response and returns the next attempt count.
    ///
    /// The server's retry hint is honored when present; otherwise the
    /// exponential backoff for `attempts` applies.
    async fn back_off(
        &self,
        headers: &header::HeaderMap,
        attempts: u32,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<u32> {
        let hint = retry_hint(headers, now_epoch_secs()).map_err(|err| {
            HttpError::InvalidRetryHint {
                url: url.to_owned(),
                header: err.header,
                value: err.value,
            }
        })?;
        let delay = hint.unwrap_or_else(|| backoff_delay(attempts, self.options.backoff_unit));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "attempt {} for {}: retrying after {} ms",
            attempts + 1,
            url,
            delay.as_millis()
        );

        wait(delay, url, cancel).await?;
        Ok(attempts + 1)
    }
}

async fn wait(delay: Duration, url: &str, cancel: &CancellationToken) -> Result<()> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(cancelled(url)),
        _ = sleep(delay) => Ok(()),
    }
}

fn cancelled(url: &str) -> HttpError {
    HttpError::Cancelled {
        url: url.to_owned(),
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Issues a `GET` request with a default [`HttpClient`].
pub async fn get<I, K, V>(url: &str, headers: I) -> Result<HttpResponse>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    HttpClient::new().get(url, headers).await
}

/// Issues a `POST` request with a default [`HttpClient`].
pub async fn post<I, K, V, B>(url: &str, headers: I, body: B) -> Result<HttpResponse>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    B: Into<Vec<u8>>,
{
    HttpClient::new().post(url, headers, body).await
}

/// Issues a request with any verb using a default [`HttpClient`].
pub async fn request<I, K, V, B>(
    url: &str,
    verb: &str,
    headers: I,
    body: Option<B>,
) -> Result<HttpResponse>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    B: Into<Vec<u8>>,
{
    HttpClient::new().request(url, verb, headers, body).await
}

#[cfg(test)]
mod tests {
    use super::HttpClient;
    use crate::{ClientOptions, HttpError};

    #[tokio::test]
    async fn invalid_verb_fails_before_sending() {
        let err = HttpClient::new()
            .request("http://127.0.0.1:1/", "GE T", [("a", "b")], None::<Vec<u8>>)
            .await
            .expect_err("must reject verb");
        assert!(matches!(err, HttpError::InvalidMethod { .. }));
        assert_eq!(err.status().code, -1);
    }

    #[tokio::test]
    async fn malformed_url_is_a_build_error() {
        let err = HttpClient::new()
            .get("not a url", Vec::<(String, String)>::new())
            .await
            .expect_err("must reject url");
        assert!(matches!(err, HttpError::Build { .. }));
        assert!(err.to_string().ends_with("not a url"));
    }

    #[tokio::test]
    async fn invalid_header_name_is_a_build_error() {
        let err = HttpClient::new()
            .get("http://127.0.0.1:1/", [("bad header", "x")])
            .await
            .expect_err("must reject header");
        assert!(matches!(err, HttpError::Build { .. }));
    }

    #[tokio::test]
    async fn unencodable_user_agent_fails_before_sending() {
        let client = HttpClient::new().with_options(ClientOptions {
            product: "crawler\n".to_owned(),
            ..ClientOptions::default()
        });
        let err = client
            .get("http://127.0.0.1:1/", Vec::<(String, String)>::new())
            .await
            .expect_err("must reject user agent");
        assert!(matches!(err, HttpError::InvalidUserAgent { .. }));
        assert_eq!(err.status().code, -1);
    }

    #[tokio::test]
    async fn zero_attempt_budget_exhausts_without_sending() {
        let client = HttpClient::new().with_options(ClientOptions {
            max_attempts: 0,
            ..ClientOptions::default()
        });
        let err = client
            .get("http://127.0.0.1:1/", Vec::<(String, String)>::new())
            .await
            .expect_err("must exhaust");
        match err {
            HttpError::AttemptsExhausted {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(attempts, 0);
                assert_eq!(last_status, None);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
