//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store (method, pattern, handler) rules in registration order
//! - Resolve a request to the first matching rule and run its handler
//! - Hand the request back untouched when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction, shared behind `Arc`
//! - O(n) scan over rules (route tables here are tiny)
//! - Explicit `Unhandled` rather than a silent default, so the caller
//!   decides what falls through

use axum::body::Body;
use axum::http::{Method, Request};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::routing::matcher::{PathPattern, PatternError};

type Handler<C, T> =
    Box<dyn Fn(Arc<C>, Vec<String>, Request<Body>) -> BoxFuture<'static, T> + Send + Sync>;

struct Rule<C, T> {
    method: Method,
    pattern: PathPattern,
    handler: Handler<C, T>,
}

/// Result of [`Router::resolve`].
pub enum Resolution<T> {
    /// A rule matched; this is its handler's output.
    Handled(T),
    /// No rule matched. The request is returned for the next responder.
    Unhandled(Request<Body>),
}

/// Ordered method + path pattern router.
///
/// Handlers receive the shared context, the pattern captures in encounter
/// order, and the raw request (for headers and body).
pub struct Router<C, T> {
    rules: Vec<Rule<C, T>>,
}

impl<C, T> Router<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a handler for `method` requests whose path matches `pattern`.
    pub fn add<F, Fut>(&mut self, method: Method, pattern: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(Arc<C>, Vec<String>, Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let pattern = PathPattern::parse(pattern)?;
        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        let handler: Handler<C, T> = Box::new(
            move |context: Arc<C>, captures: Vec<String>, request: Request<Body>| -> BoxFuture<'static, T> {
                Box::pin(handler(context, captures, request))
            },
        );
        self.rules.push(Rule {
            method,
            pattern,
            handler,
        });
        Ok(self)
    }

    /// Run the first rule matching the request's method and full path.
    pub async fn resolve(&self, context: Arc<C>, request: Request<Body>) -> Resolution<T> {
        let path = request.uri().path();
        let matched = self.rules.iter().find_map(|rule| {
            if rule.method != *request.method() {
                return None;
            }
            rule.pattern.captures(path).map(|captures| (rule, captures))
        });

        match matched {
            Some((rule, captures)) => {
                Resolution::Handled((rule.handler)(context, captures, request).await)
            }
            None => Resolution::Unhandled(request),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<C, T> Default for Router<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
