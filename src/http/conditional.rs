//! Conditional-request header parsing.
//!
//! - `If-None-Match: "<version>"`: the text between the first and last
//!   quote, parsed as a version. Anything else counts as no tag.
//! - `Prefer: wait=<seconds>`: the first `wait=<digits>` token that starts
//!   at a word boundary.

use axum::http::{header, HeaderMap};
use std::time::Duration;

/// Version the client already holds, if it sent a usable tag.
pub fn if_none_match(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::IF_NONE_MATCH)?.to_str().ok()?;
    let start = value.find('"')?;
    let end = value.rfind('"')?;
    if end <= start {
        return None;
    }
    value[start + 1..end].parse().ok()
}

/// Long-poll wait requested through `Prefer`.
pub fn prefer_wait(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all("prefer")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(parse_wait)
}

fn parse_wait(value: &str) -> Option<Duration> {
    let mut search = 0;
    while let Some(offset) = value[search..].find("wait=") {
        let at = search + offset;
        let boundary = value[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));

        let digits: &str = {
            let rest = &value[at + "wait=".len()..];
            let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            &rest[..len]
        };

        if boundary && !digits.is_empty() {
            // Absurdly long waits saturate; the caller clamps anyway.
            let secs = digits.parse().unwrap_or(u64::MAX);
            return Some(Duration::from_secs(secs));
        }
        search = at + "wait=".len();
    }
    None
}
