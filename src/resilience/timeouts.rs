//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a downstream call end to end (send plus body read)
//! - Report the limit that was hit
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Connect timeouts live on the HTTP client, not here
//! - Streaming calls have no overall deadline

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline passed before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Run `future` with an overall deadline.
pub async fn with_deadline<F, T>(limit: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TimedOut(limit))
}
