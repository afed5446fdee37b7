//! Talk storage subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     talks.json → persistence.rs (JsonFile::load) → TalkStore::new
//!
//! Mutation (put / delete / add_comment):
//!     → memory.rs: validate, apply under lock, version += 1
//!     → publish Snapshot (ArcSwap) for lock-free listing reads
//!     → ChangeNotifier::notify wakes long polls
//!     → watch channel → Persister writes the latest snapshot
//! ```
//!
//! # Design Decisions
//! - One mutex serialises mutations; version bumps can't interleave
//! - Listing order is order of first creation
//! - Persistence is best effort and never blocks a response

pub mod memory;
pub mod model;
pub mod persistence;

pub use memory::{Changes, TalkStore, ValidationError};
pub use model::{Comment, Snapshot, Talk, TalkMap};
pub use persistence::{JsonFile, PersistError, Persister, TalkPersistence};
