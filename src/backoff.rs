use std::time::Duration;

/// Exponential backoff in seconds for the given attempt: `(2^attempts - 1) / 2`.
///
/// `0` for the first attempt, `127.5` for the eighth.
pub fn backoff_seconds(attempts: u32) -> f64 {
    (2f64.powi(attempts.min(i32::MAX as u32) as i32) - 1.0) / 2.0
}

/// [`backoff_seconds`] scaled by `unit`, the duration of one formula second.
pub fn backoff_delay(attempts: u32, unit: Duration) -> Duration {
    let secs = backoff_seconds(attempts) * unit.as_secs_f64();
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
