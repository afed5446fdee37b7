//! Change notification subsystem.
//!
//! # Data Flow
//! ```text
//! GET /talks with matching ETag + Prefer: wait=N
//!     → store checks version and registers a Waiter under its lock
//!     → Waiter::wait(N) suspends the request
//!
//! Store mutation:
//!     → version += 1, new Snapshot
//!     → ChangeNotifier::notify(snapshot) drains every pending waiter
//!     → each suspended request renders the fresh listing
//!
//! Timeout:
//!     → Waiter removes itself if still pending → 304 Not Modified
//! ```

pub mod notifier;

pub use notifier::{ChangeNotifier, Waiter};
