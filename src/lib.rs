//! Talk sharing server library.
//!
//! A collection of talks exposed over HTTP, with conditional GETs and
//! long polling so clients can block until the collection changes.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod routing;
pub mod store;

pub use client::{PollResult, TalkClient};
pub use config::ServerConfig;
pub use http::TalkServer;
pub use lifecycle::Shutdown;
pub use store::{Talk, TalkStore};
