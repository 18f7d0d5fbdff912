//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (scan current RouteTable snapshot)
//!     → matcher.rs (longest literal prefix per route)
//!     → Return: RouteMatch { route, matched_prefix } or no match
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → route.rs (validate, resolve target base URL)
//!     → Freeze as immutable RouteTable
//!     → SharedRouteTable swaps the snapshot atomically
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load time, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins, table order breaks ties

pub mod matcher;
pub mod route;
pub mod router;

pub use route::{RouteDefinition, RouteError, TargetDefinition};
pub use router::{RouteMatch, RouteSource, RouteTable, SharedRouteTable};
