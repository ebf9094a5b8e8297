use axum::{http::StatusCode, Json};
use serde_json::json;

/// Checks an email-keyed rate limit stored in Redis.
///
/// INCR + EXPIRE strategy: increments a counter for `key`, sets the TTL to
/// `window_secs` on the first increment only, and rejects with 429 once the
/// counter exceeds `max_attempts`.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(0);

    if count == 1 {
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many attempts. Try again in a few minutes." })),
        ));
    }

    Ok(())
}
