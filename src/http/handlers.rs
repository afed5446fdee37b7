//! Talk route handlers.
//!
//! Every handler takes the shared [`AppContext`], the path captures and the
//! raw request, and returns a [`HandlerResult`].

use axum::body::Body;
use axum::http::{Method, Request};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::{LongPollConfig, ServerConfig};
use crate::http::conditional::{if_none_match, prefer_wait};
use crate::http::request::{read_json, request_id};
use crate::http::response::{ApiError, HandlerResult, Reply};
use crate::observability::metrics;
use crate::routing::{PatternError, Router};
use crate::store::{Changes, Snapshot, TalkStore, ValidationError};

/// State shared by every handler.
pub struct AppContext {
    pub store: Arc<TalkStore>,
    pub long_poll: LongPollConfig,
    pub max_body_size: usize,
}

impl AppContext {
    pub fn new(store: Arc<TalkStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            long_poll: config.long_poll.clone(),
            max_body_size: config.limits.max_body_size,
        }
    }
}

pub type TalkRouter = Router<AppContext, HandlerResult>;

/// The talk API route table.
pub fn talk_routes() -> Result<TalkRouter, PatternError> {
    let mut router = TalkRouter::new();
    router
        .add(Method::GET, "/talks", list_talks)?
        .add(Method::GET, "/talks/{title}", get_talk)?
        .add(Method::PUT, "/talks/{title}", put_talk)?
        .add(Method::DELETE, "/talks/{title}", delete_talk)?
        .add(Method::POST, "/talks/{title}/comments", post_comment)?;
    Ok(router)
}

#[derive(Deserialize)]
struct TalkBody {
    presenter: String,
    summary: String,
}

#[derive(Deserialize)]
struct CommentBody {
    author: String,
    message: String,
}

fn title(captures: Vec<String>) -> Result<String, ApiError> {
    captures
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("route is missing its title capture".to_string()))
}

/// GET /talks, with conditional and long-poll semantics.
async fn list_talks(ctx: Arc<AppContext>, _captures: Vec<String>, request: Request<Body>) -> HandlerResult {
    let headers = request.headers();
    let snapshot = ctx.store.snapshot();

    let known = match if_none_match(headers) {
        Some(tag) if tag == snapshot.version => tag,
        _ => return Ok(Reply::Listing(snapshot)),
    };
    let Some(wait) = prefer_wait(headers) else {
        return Ok(Reply::NotModified);
    };
    let wait = ctx.long_poll.clamp(wait);

    match ctx.store.changes_since(known) {
        Changes::Changed(snapshot) => Ok(Reply::Listing(snapshot)),
        Changes::Pending(waiter) => {
            let id = request_id(&request);
            tracing::debug!(request_id = %id, version = known, wait_secs = wait.as_secs(), "Long poll suspended");
            Ok(resolve_wait(waiter.wait(wait).await, &id))
        }
    }
}

fn resolve_wait(result: Option<Arc<Snapshot>>, id: &str) -> Reply {
    match result {
        Some(snapshot) => {
            metrics::record_long_poll("changed");
            tracing::debug!(request_id = %id, version = snapshot.version, "Long poll resolved");
            Reply::Listing(snapshot)
        }
        None => {
            metrics::record_long_poll("timeout");
            tracing::debug!(request_id = %id, "Long poll timed out");
            Reply::NotModified
        }
    }
}

/// GET /talks/{title}
async fn get_talk(ctx: Arc<AppContext>, captures: Vec<String>, _request: Request<Body>) -> HandlerResult {
    let title = title(captures)?;
    ctx.store
        .get(&title)
        .map(Reply::Talk)
        .ok_or_else(|| ApiError::no_talk(&title))
}

/// PUT /talks/{title}
async fn put_talk(ctx: Arc<AppContext>, captures: Vec<String>, request: Request<Body>) -> HandlerResult {
    let title = title(captures)?;
    let body: TalkBody = read_json(request, ctx.max_body_size)
        .await
        .map_err(|e| ValidationError::talk(e.to_string()))?;

    ctx.store.put(&title, &body.presenter, &body.summary)?;
    Ok(Reply::NoContent)
}

/// DELETE /talks/{title}. Deleting a missing talk is a no-op.
async fn delete_talk(ctx: Arc<AppContext>, captures: Vec<String>, _request: Request<Body>) -> HandlerResult {
    let title = title(captures)?;
    if !ctx.store.delete(&title) {
        tracing::debug!(title = %title, "Delete of missing talk ignored");
    }
    Ok(Reply::NoContent)
}

/// POST /talks/{title}/comments
async fn post_comment(ctx: Arc<AppContext>, captures: Vec<String>, request: Request<Body>) -> HandlerResult {
    let title = title(captures)?;
    let body: CommentBody = read_json(request, ctx.max_body_size)
        .await
        .map_err(|e| ValidationError::comment(e.to_string()))?;

    if ctx.store.add_comment(&title, &body.author, &body.message)? {
        Ok(Reply::NoContent)
    } else {
        Err(ApiError::no_talk(&title))
    }
}
