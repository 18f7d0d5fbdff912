//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered call to a downstream:
//!     → retries.rs (up to max_retries extra attempts, fixed delay)
//!         → circuit_breaker.rs (fail fast while open)
//!         → timeouts.rs (overall deadline on send + body read)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable for buffered calls
//! - Breaker state is per client instance
//! - Streaming calls only get a connect timeout

pub mod circuit_breaker;
pub mod clock;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerOpen, CallPermit, CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use retries::{Retryable, RetryPolicy};
pub use timeouts::{with_deadline, TimedOut};
