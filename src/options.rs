use std::time::Duration;

/// Default User-Agent product token.
pub const DEFAULT_PRODUCT: &str = "backoff-http";

/// Configures timeout, retry budget and identity of the client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total number of attempts a single call may consume.
    pub max_attempts: u32,
    /// Length of one "second" in the backoff formula.
    pub backoff_unit: Duration,
    /// Product token sent in the `User-Agent` header.
    pub product: String,
    /// Version appended to the product token.
    pub version: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 8,
            backoff_unit: Duration::from_secs(1),
            product: DEFAULT_PRODUCT.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl ClientOptions {
    /// Builds options from environment variables, keeping defaults for unset ones.
    ///
    /// Reads:
    /// - `BACKOFF_HTTP_TIMEOUT_MS`
    /// - `BACKOFF_HTTP_MAX_ATTEMPTS`
    /// - `BACKOFF_HTTP_BACKOFF_UNIT_MS`
    /// - `BACKOFF_HTTP_PRODUCT`
    /// - `BACKOFF_HTTP_VERSION`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use backoff_http::{ClientOptions, HttpClient};
    ///
    /// let opts = ClientOptions::from_env().expect("invalid BACKOFF_HTTP_* env vars");
    /// let client = HttpClient::new().with_options(opts);
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "BACKOFF_HTTP_TIMEOUT_MS")? {
            opts.timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "BACKOFF_HTTP_MAX_ATTEMPTS")? {
            opts.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BACKOFF_HTTP_BACKOFF_UNIT_MS")? {
            opts.backoff_unit = Duration::from_millis(ms);
        }
        if let Some(product) = non_empty(&lookup, "BACKOFF_HTTP_PRODUCT") {
            opts.product = product;
        }
        if let Some(version) = non_empty(&lookup, "BACKOFF_HTTP_VERSION") {
            opts.version = version;
        }

        Ok(opts)
    }

    /// Value of the `User-Agent` header, `product/version`.
    pub fn user_agent(&self) -> String {
        if self.version.is_empty() {
            self.product.clone()
        } else {
            format!("{}/{}", self.product, self.version)
        }
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_var<T, F>(lookup: &F, name: &str) -> std::result::Result<Option<T>, String>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{name} is not a valid number: {raw}")),
    }
}
