//! Talk and comment records.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A comment left on a talk. Comments are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub message: String,
}

/// A talk, keyed by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talk {
    pub title: String,
    pub presenter: String,
    pub summary: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Talk {
    /// A talk with no comments yet.
    pub fn new(
        title: impl Into<String>,
        presenter: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            presenter: presenter.into(),
            summary: summary.into(),
            comments: Vec::new(),
        }
    }
}

/// The full listing at a given store version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    /// Talks in creation order.
    pub talks: Vec<Talk>,
}

/// Ordered `title -> talk` object, the on-disk shape of the store.
///
/// Serialization keeps the listing order; deserialization keeps document
/// order and takes the object key as the title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TalkMap(pub Vec<Talk>);

impl Serialize for TalkMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for talk in &self.0 {
            map.serialize_entry(&talk.title, talk)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct StoredTalk {
    presenter: String,
    summary: String,
    #[serde(default)]
    comments: Vec<Comment>,
}

struct TalkMapVisitor;

impl<'de> Visitor<'de> for TalkMapVisitor {
    type Value = TalkMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping talk titles to talks")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TalkMap, A::Error> {
        let mut talks: Vec<Talk> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((title, stored)) = access.next_entry::<String, StoredTalk>()? {
            let talk = Talk {
                title,
                presenter: stored.presenter,
                summary: stored.summary,
                comments: stored.comments,
            };
            // A repeated key replaces the earlier entry in place.
            match talks.iter_mut().find(|t| t.title == talk.title) {
                Some(existing) => *existing = talk,
                None => talks.push(talk),
            }
        }
        Ok(TalkMap(talks))
    }
}

impl<'de> Deserialize<'de> for TalkMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TalkMapVisitor)
    }
}
