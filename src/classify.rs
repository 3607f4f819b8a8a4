//! Response classification and retry hints for rate-limited APIs.

use std::time::{Duration, UNIX_EPOCH};

use reqwest::{
    header::{HeaderMap, RETRY_AFTER},
    StatusCode,
};

pub(crate) const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// How the retry loop treats a response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx, terminal.
    Success,
    /// 404, terminal and not an error.
    NotFound,
    /// 429, back off and retry.
    RateLimited,
    /// 403, back off and retry.
    Forbidden,
    /// Anything else: consumes an attempt, retried without waiting.
    Unclassified,
}

impl StatusClass {
    /// Whether the loop stops on this class.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::NotFound)
    }
}

pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        404 => StatusClass::NotFound,
        429 => StatusClass::RateLimited,
        403 => StatusClass::Forbidden,
        _ => StatusClass::Unclassified,
    }
}

/// A retry hint header that is present but unusable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryHintError {
    pub header: &'static str,
    pub value: String,
}

/// Wait requested by the server, if any.
///
/// `Retry-After` (delta seconds or HTTP-date) wins. Otherwise an exhausted quota
/// (`X-RateLimit-Remaining: 0`) waits until the `X-RateLimit-Reset` epoch
/// second, measured against `now_epoch_secs`.
pub fn retry_hint(
    headers: &HeaderMap,
    now_epoch_secs: u64,
) -> std::result::Result<Option<Duration>, RetryHintError> {
    if let Some(value) = headers.get(RETRY_AFTER) {
        let secs = parse_retry_after(value, now_epoch_secs)?;
        return Ok(Some(Duration::from_secs(secs)));
    }

    let exhausted = headers
        .get(RATELIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    if !exhausted {
        return Ok(None);
    }

    match headers.get(RATELIMIT_RESET) {
        Some(value) => {
            let reset = parse_secs(value, RATELIMIT_RESET)?;
            Ok(Some(Duration::from_secs(reset.saturating_sub(now_epoch_secs))))
        }
        None => Ok(None),
    }
}

// Delta seconds, or an HTTP-date measured against `now_epoch_secs`.
fn parse_retry_after(
    value: &reqwest::header::HeaderValue,
    now_epoch_secs: u64,
) -> std::result::Result<u64, RetryHintError> {
    let date_secs = value
        .to_str()
        .ok()
        .and_then(|raw| httpdate::parse_http_date(raw.trim()).ok())
        .map(|date| {
            date.duration_since(UNIX_EPOCH)
                .map(|since| since.as_secs())
                .unwrap_or_default()
        });
    match date_secs {
        Some(date) => Ok(date.saturating_sub(now_epoch_secs)),
        None => parse_secs(value, "retry-after"),
    }
}

fn parse_secs(
    value: &reqwest::header::HeaderValue,
    header: &'static str,
) -> std::result::Result<u64, RetryHintError> {
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .ok_or_else(|| RetryHintError {
            header,
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{
        header::{HeaderMap, HeaderValue, RETRY_AFTER},
        StatusCode,
    };

    use super::{classify_status, retry_hint, StatusClass, RATELIMIT_REMAINING, RATELIMIT_RESET};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn classifies_status_ranges() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusClass::Success);
        assert_eq!(
            classify_status(StatusCode::from_u16(299).expect("valid")),
            StatusClass::Success
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::NotFound);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::RateLimited
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Forbidden);
        assert_eq!(
            classify_status(StatusCode::MOVED_PERMANENTLY),
            StatusClass::Unclassified
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            StatusClass::Unclassified
        );
        assert!(StatusClass::NotFound.is_terminal());
        assert!(!StatusClass::RateLimited.is_terminal());
    }

    #[test]
    fn no_headers_means_no_hint() {
        assert_eq!(retry_hint(&HeaderMap::new(), 0), Ok(None));
    }

    #[test]
    fn retry_after_seconds() {
        let hint = retry_hint(&headers(&[("retry-after", " 7 ")]), 0);
        assert_eq!(hint, Ok(Some(Duration::from_secs(7))));
    }

    #[test]
    fn retry_after_wins_over_reset() {
        let map = headers(&[
            ("retry-after", "2"),
            (RATELIMIT_REMAINING, "0"),
            (RATELIMIT_RESET, "5000"),
        ]);
        assert_eq!(retry_hint(&map, 1000), Ok(Some(Duration::from_secs(2))));
    }

    #[test]
    fn retry_after_http_date_waits_until_that_date() {
        // Wed, 21 Oct 2015 07:28:00 GMT
        let date = 1_445_412_480;
        let map = headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")]);
        assert_eq!(
            retry_hint(&map, date - 90),
            Ok(Some(Duration::from_secs(90)))
        );
    }

    #[test]
    fn retry_after_http_date_in_the_past_waits_nothing() {
        let map = headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")]);
        assert_eq!(retry_hint(&map, 1_700_000_000), Ok(Some(Duration::ZERO)));
    }

    #[test]
    fn unparsable_retry_after_is_an_error() {
        let err = retry_hint(&headers(&[("retry-after", "soon")]), 0).expect_err("must fail");
        assert_eq!(err.header, RETRY_AFTER.as_str());
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn exhausted_quota_waits_until_reset() {
        let map = headers(&[(RATELIMIT_REMAINING, "0"), (RATELIMIT_RESET, "1030")]);
        assert_eq!(retry_hint(&map, 1000), Ok(Some(Duration::from_secs(30))));
    }

    #[test]
    fn reset_in_the_past_waits_nothing() {
        let map = headers(&[(RATELIMIT_REMAINING, "0"), (RATELIMIT_RESET, "900")]);
        assert_eq!(retry_hint(&map, 1000), Ok(Some(Duration::ZERO)));
    }

    #[test]
    fn remaining_quota_ignores_reset() {
        let map = headers(&[(RATELIMIT_REMAINING, "12"), (RATELIMIT_RESET, "junk")]);
        assert_eq!(retry_hint(&map, 1000), Ok(None));
    }

    #[test]
    fn unparsable_reset_is_an_error() {
        let map = headers(&[(RATELIMIT_REMAINING, "0"), (RATELIMIT_RESET, "tomorrow")]);
        let err = retry_hint(&map, 1000).expect_err("must fail");
        assert_eq!(err.header, RATELIMIT_RESET);
    }
}
