//! Bounded exponential backoff with full jitter for bus reconnects (§4.A):
//! delay = random(0, min(cap, base * 2^attempt)).

use std::time::Duration;

const BASE: Duration = Duration::from_millis(500);
const CAP: Duration = Duration::from_secs(30);

/// Sleep for one backoff interval given the number of consecutive failed
/// connection attempts so far.
pub async fn sleep(attempt: u32) {
    let capped_ms = BASE.as_millis().saturating_mul(1u128 << attempt.min(16)).min(CAP.as_millis()) as u64;
    let jittered_ms = (rand::random::<f64>() * capped_ms as f64) as u64;
    tokio::time::sleep(Duration::from_millis(jittered_ms)).await;
}
