//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID, body reading)
//!     → routing::Router (pattern dispatch to handlers.rs)
//!         → conditional.rs (If-None-Match / Prefer: wait)
//!         → store / notifier
//!     → response.rs (Reply / ApiError → wire response)
//!     → Unhandled: static files → 404 page
//! ```

pub mod conditional;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use handlers::{talk_routes, AppContext, TalkRouter};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{ApiError, HandlerResult, Reply};
pub use server::TalkServer;
