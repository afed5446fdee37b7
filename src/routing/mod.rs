//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered rule scan)
//!     → matcher.rs (anchored pattern match, capture extraction)
//!     → Handled(handler output) or Unhandled(request)
//!
//! Route Compilation (at startup):
//!     (method, "/talks/{title}", handler)
//!     → PathPattern::parse
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{Resolution, Router};
