//! The in-memory talk store.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;

use crate::notify::{ChangeNotifier, Waiter};
use crate::observability::metrics;
use crate::store::model::{Comment, Snapshot, Talk};

/// Rejected talk or comment input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bad {subject} data: {reason}")]
pub struct ValidationError {
    subject: &'static str,
    reason: String,
}

impl ValidationError {
    pub fn talk(reason: impl Into<String>) -> Self {
        Self {
            subject: "talk",
            reason: reason.into(),
        }
    }

    pub fn comment(reason: impl Into<String>) -> Self {
        Self {
            subject: "comment",
            reason: reason.into(),
        }
    }
}

fn non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} must be a non-empty string"));
    }
    Ok(())
}

/// Outcome of checking a client's known version.
pub enum Changes {
    /// The store has moved past the client's version.
    Changed(Arc<Snapshot>),
    /// The client is current; the waiter resolves on the next mutation.
    Pending(Waiter),
}

#[derive(Default)]
struct State {
    talks: HashMap<String, Talk>,
    /// Titles in order of first creation.
    order: Vec<String>,
    version: u64,
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            talks: self
                .order
                .iter()
                .filter_map(|title| self.talks.get(title).cloned())
                .collect(),
        }
    }
}

/// Title → talk map with a change version.
///
/// All mutations go through one mutex. Each successful mutation bumps the
/// version once, publishes a new snapshot, wakes every pending waiter and
/// hands the snapshot to the persistence channel before the lock is released.
pub struct TalkStore {
    state: Mutex<State>,
    published: ArcSwap<Snapshot>,
    notifier: ChangeNotifier,
    changes: watch::Sender<Arc<Snapshot>>,
}

impl TalkStore {
    /// Create a store holding `talks` at version 0.
    pub fn new(talks: Vec<Talk>) -> Self {
        let mut state = State::default();
        for talk in talks {
            if !state.talks.contains_key(&talk.title) {
                state.order.push(talk.title.clone());
            }
            state.talks.insert(talk.title.clone(), talk);
        }
        let snapshot = Arc::new(state.snapshot());
        let (changes, _) = watch::channel(snapshot.clone());

        Self {
            state: Mutex::new(state),
            published: ArcSwap::new(snapshot),
            notifier: ChangeNotifier::new(),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("talk store mutex poisoned")
    }

    pub fn get(&self, title: &str) -> Option<Talk> {
        self.lock().talks.get(title).cloned()
    }

    /// All talks in creation order.
    pub fn list(&self) -> Vec<Talk> {
        self.published.load().talks.clone()
    }

    /// The latest published listing.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    pub fn version(&self) -> u64 {
        self.published.load().version
    }

    /// Create or fully replace the talk at `title`. Replacing clears its
    /// comments but keeps its listing position.
    pub fn put(&self, title: &str, presenter: &str, summary: &str) -> Result<u64, ValidationError> {
        non_empty(presenter, "presenter")
            .and_then(|_| non_empty(summary, "summary"))
            .map_err(ValidationError::talk)?;

        let mut state = self.lock();
        let talk = Talk::new(title, presenter, summary);
        if state.talks.insert(title.to_string(), talk).is_none() {
            state.order.push(title.to_string());
        }
        Ok(self.commit(&mut state, "put", title))
    }

    /// Remove `title`. Returns whether it existed; a miss changes nothing.
    pub fn delete(&self, title: &str) -> bool {
        let mut state = self.lock();
        if state.talks.remove(title).is_none() {
            return false;
        }
        state.order.retain(|t| t != title);
        self.commit(&mut state, "delete", title);
        true
    }

    /// Append a comment to `title`. Returns whether the talk existed.
    pub fn add_comment(&self, title: &str, author: &str, message: &str) -> Result<bool, ValidationError> {
        non_empty(author, "author")
            .and_then(|_| non_empty(message, "message"))
            .map_err(ValidationError::comment)?;

        let mut state = self.lock();
        let Some(talk) = state.talks.get_mut(title) else {
            return Ok(false);
        };
        talk.comments.push(Comment {
            author: author.to_string(),
            message: message.to_string(),
        });
        self.commit(&mut state, "comment", title);
        Ok(true)
    }

    /// Compare `known_version` against the store, registering a waiter if
    /// the client is current.
    ///
    /// The comparison and registration happen under the mutation lock, so a
    /// concurrent mutation is seen either here or through the waiter.
    pub fn changes_since(&self, known_version: u64) -> Changes {
        let current = self.published.load_full();
        if current.version != known_version {
            return Changes::Changed(current);
        }

        let _state = self.lock();
        let current = self.published.load_full();
        if current.version != known_version {
            return Changes::Changed(current);
        }
        Changes::Pending(self.notifier.register())
    }

    /// Subscribe to every published snapshot (used for persistence).
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.changes.subscribe()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Resolve all pending long polls as not modified.
    pub fn release_waiters(&self) -> usize {
        self.notifier.release_all()
    }

    fn commit(&self, state: &mut State, kind: &'static str, title: &str) -> u64 {
        state.version += 1;
        let snapshot = Arc::new(state.snapshot());
        self.published.store(snapshot.clone());
        self.changes.send_replace(snapshot.clone());
        let woken = self.notifier.notify(snapshot);

        metrics::record_mutation(kind, state.version);
        tracing::info!(
            kind,
            title = %title,
            version = state.version,
            woken,
            "Talks updated"
        );
        state.version
    }
}

impl Default for TalkStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
