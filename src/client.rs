//! HTTP client for the talk API, including the long-poll loop.

use reqwest::{header, Client, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::store::Talk;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("server URL cannot have path segments: {0}")]
    BaseUrl(String),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("listing response had no usable ETag")]
    MissingEtag,
}

/// Result of a conditional listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Changed { version: u64, talks: Vec<Talk> },
    NotModified,
}

#[derive(Serialize)]
struct TalkBody<'a> {
    presenter: &'a str,
    summary: &'a str,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    author: &'a str,
    message: &'a str,
}

/// Client for a talk server.
#[derive(Clone)]
pub struct TalkClient {
    http: Client,
    base: Url,
}

impl TalkClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    /// URL of `/talks` followed by `segments`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("talks")
            .extend(segments);
        Ok(url)
    }

    /// Fetch the listing unconditionally.
    pub async fn list(&self) -> Result<(u64, Vec<Talk>), ClientError> {
        match self.poll(None, None).await? {
            PollResult::Changed { version, talks } => Ok((version, talks)),
            // Without If-None-Match the server never answers 304.
            PollResult::NotModified => Err(ClientError::MissingEtag),
        }
    }

    /// Conditional listing: sends `If-None-Match` for `known` and, when
    /// `wait_secs` is set, asks the server to hold the request that long.
    pub async fn poll(&self, known: Option<u64>, wait_secs: Option<u64>) -> Result<PollResult, ClientError> {
        let mut request = self.http.get(self.url(&[])?);
        if let Some(version) = known {
            request = request.header(header::IF_NONE_MATCH, format!("\"{version}\""));
        }
        if let Some(wait) = wait_secs {
            request = request.header("prefer", format!("wait={wait}"));
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(PollResult::NotModified);
        }
        let response = check(response).await?;
        let version = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim_matches('"').parse().ok())
            .ok_or(ClientError::MissingEtag)?;
        let talks = response.json().await?;
        Ok(PollResult::Changed { version, talks })
    }

    pub async fn get(&self, title: &str) -> Result<Option<Talk>, ClientError> {
        let response = self.http.get(self.url(&[title])?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    pub async fn put(&self, title: &str, presenter: &str, summary: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url(&[title])?)
            .json(&TalkBody { presenter, summary })
            .send()
            .await?;
        check(response).await.map(drop)
    }

    pub async fn delete(&self, title: &str) -> Result<(), ClientError> {
        let response = self.http.delete(self.url(&[title])?).send().await?;
        check(response).await.map(drop)
    }

    pub async fn comment(&self, title: &str, author: &str, message: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&[title, "comments"])?)
            .json(&CommentBody { author, message })
            .send()
            .await?;
        check(response).await.map(drop)
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_are_encoded_as_one_segment() {
        let client = TalkClient::new("http://localhost:8000").unwrap();
        let url = client.url(&["Unituning / tips?", "comments"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/talks/Unituning%20%2F%20tips%3F/comments"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = TalkClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(client.url(&[]).unwrap().as_str(), "http://localhost:8000/api/talks");
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            TalkClient::new("mailto:someone@example.com"),
            Err(ClientError::BaseUrl(_))
        ));
        assert!(matches!(TalkClient::new("not a url"), Err(ClientError::Url(_))));
    }
}
