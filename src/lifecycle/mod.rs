//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain → exit
//!
//! Reload (reload.rs):
//!     config file change → validated config → new route table swapped in
//! ```

pub mod reload;
pub mod shutdown;
pub mod signals;

pub use reload::spawn_route_reloader;
pub use shutdown::Shutdown;
pub use signals::{spawn_signal_handler, wait_for_signal};
