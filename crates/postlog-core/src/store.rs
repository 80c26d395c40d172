//! [`ThreadStore`], the keyed correlation engine.
//!
//! The store owns every live thread, keyed by queue id. It merges partial
//! facts, links a thread to the queue id it was re-queued under, attributes
//! spam verdicts by message id and decides when a thread is finished.
//!
//! A message that passes the content filter lives under two ids: the parent
//! it arrived as and the child it was re-queued as. The spam verdict lands
//! on the child but consumers key on the parent, so completion waits until
//! the queue manager has removed both.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{Error, NoopSink, Result, SpamRecord, ThreadRecord, ThreadSink};

// ─── Entry ───────────────────────────────────────────────────────────────────

struct Entry {
  thread: ThreadRecord,
  /// Creation order; ties between threads sharing a message id go to the
  /// newest one.
  seq:    u64,
  /// Completed and retained. Closed entries never complete again.
  closed: bool,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Live threads plus the sink that receives finished ones.
///
/// Single writer: every operation runs to completion before the next line is
/// processed.
pub struct ThreadStore<S = NoopSink> {
  threads: HashMap<String, Entry>,
  sink:    S,
  retain:  bool,
  next:    u64,
}

impl ThreadStore<NoopSink> {
  pub fn new() -> Self { Self::with_sink(NoopSink) }
}

impl Default for ThreadStore<NoopSink> {
  fn default() -> Self { Self::new() }
}

impl<S: ThreadSink> ThreadStore<S> {
  pub fn with_sink(sink: S) -> Self {
    Self {
      threads: HashMap::new(),
      sink,
      retain: false,
      next: 0,
    }
  }

  /// Keep completed threads queryable instead of deleting them.
  pub fn set_retention(&mut self, retain: bool) { self.retain = retain; }

  pub fn sink(&self) -> &S { &self.sink }

  /// Number of stored threads, retained ones included.
  pub fn len(&self) -> usize { self.threads.len() }

  pub fn is_empty(&self) -> bool { self.threads.is_empty() }

  pub fn get(&self, id: &str) -> Option<&ThreadRecord> {
    self.threads.get(id).map(|e| &e.thread)
  }

  /// Insert `partial`, or merge it into the thread already stored under the
  /// same id. A partial with an empty id is ignored.
  ///
  /// If the thread names a child that is already stored, the child gets a
  /// back-reference to this thread, whichever of the two arrived first.
  pub fn upsert(&mut self, partial: ThreadRecord) -> Result<()> {
    if partial.id.is_empty() {
      return Ok(());
    }

    let id = partial.id.clone();
    let child_id = match self.threads.get_mut(&id) {
      Some(entry) => {
        entry.thread.merge(partial)?;
        entry.thread.child_id.clone()
      }
      None => {
        let mut partial = partial;
        let child_id = partial.child_id.clone();
        if partial.parent_id.is_none() {
          partial.parent_id = self.parent_of(&id);
        }
        trace!(id = %id, parent = ?partial.parent_id, "new thread");
        self.threads.insert(id.clone(), Entry {
          thread: partial,
          seq:    self.next,
          closed: false,
        });
        self.next += 1;
        child_id
      }
    };

    if let Some(child_id) = child_id
      && child_id != id
      && let Some(child) = self.threads.get_mut(&child_id)
      && child.thread.parent_id.as_deref() != Some(id.as_str())
    {
      debug!(parent = %id, child = %child_id, "linked re-queued thread");
      child.thread.parent_id = Some(id);
    }

    Ok(())
  }

  /// Add the score of `spam` to the live thread carrying the same message
  /// id. A `queued_as` hint restricts the match to that exact queue id.
  ///
  /// Fails with [`Error::UnknownSpamAttribution`] when nothing matches; the
  /// store is left untouched in that case.
  pub fn attribute_spam(&mut self, spam: &SpamRecord) -> Result<()> {
    let unknown = || Error::UnknownSpamAttribution {
      message_id: spam.message_id.clone(),
    };
    let message_id = spam.message_id.as_deref().ok_or_else(unknown)?;

    let target = self
      .threads
      .iter_mut()
      .filter(|(_, e)| !e.closed)
      .filter(|(_, e)| e.thread.message_id.as_deref() == Some(message_id))
      .filter(|(id, _)| {
        spam.queued_as.as_deref().is_none_or(|q| q == id.as_str())
      })
      .max_by_key(|(_, e)| e.seq)
      .map(|(_, e)| e)
      .ok_or_else(unknown)?;

    target.thread.spam_score = target.thread.spam_score.saturating_add(spam.score);
    debug!(
      id = %target.thread.id,
      message_id,
      score = target.thread.spam_score,
      "attributed spam verdict"
    );
    Ok(())
  }

  /// Fire the sink if the thread at `id` has reached its terminal state.
  /// Returns `true` when a completion fired.
  ///
  /// - a thread with no known partner completes once it is removed;
  /// - a parent/child pair completes once both sides are removed, reported
  ///   under the parent id with the child's spam score.
  pub fn check_completion(&mut self, id: &str) -> bool {
    let Some(item) = self.live(id) else {
      return false;
    };

    let child_id = item
      .child_id
      .as_deref()
      .filter(|c| self.live(c).is_some())
      .unwrap_or(id)
      .to_owned();
    let parent_id = item
      .parent_id
      .as_deref()
      .filter(|p| self.live(p).is_some())
      .unwrap_or(id)
      .to_owned();

    let Some(parent) = self.live(&parent_id) else {
      return false;
    };
    if !parent.removed {
      return false;
    }

    if parent_id == child_id {
      self.complete(&parent_id);
      self.evict(&parent_id);
      return true;
    }

    let child_score = match self.live(&child_id) {
      Some(child) if child.removed => child.spam_score,
      _ => {
        trace!(parent = %parent_id, child = %child_id, "waiting for child removal");
        return false;
      }
    };

    if let Some(parent) = self.threads.get_mut(&parent_id) {
      parent.thread.spam_score = parent.thread.spam_score.max(child_score);
    }
    self.complete(&parent_id);
    self.evict(&parent_id);
    self.evict(&child_id);
    true
  }

  /// The live thread that already names `id` as its child.
  fn parent_of(&self, id: &str) -> Option<String> {
    self
      .threads
      .values()
      .filter(|e| !e.closed && e.thread.id != id)
      .find(|e| e.thread.child_id.as_deref() == Some(id))
      .map(|e| e.thread.id.clone())
  }

  fn live(&self, id: &str) -> Option<&ThreadRecord> {
    self
      .threads
      .get(id)
      .filter(|e| !e.closed)
      .map(|e| &e.thread)
  }

  fn complete(&mut self, id: &str) {
    if let Some(entry) = self.threads.get(id) {
      debug!(id, score = entry.thread.spam_score, "thread complete");
      self.sink.thread_done(&entry.thread);
    }
  }

  fn evict(&mut self, id: &str) {
    if self.retain {
      if let Some(entry) = self.threads.get_mut(id) {
        entry.closed = true;
      }
    } else {
      self.threads.remove(id);
    }
  }
}
