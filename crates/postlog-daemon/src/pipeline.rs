//! The per-line driver.
//!
//! Every line is first tried as a postfix thread fact; a line that is not
//! one is tried as a spam verdict. Unrecognised lines are dropped silently
//! and a verdict for an unknown message is only logged.

use chrono::{Local, NaiveDateTime};
use postlog_core::{ThreadSink, ThreadStore};
use postlog_parse::{spam_fact, thread_fact};
use tracing::{debug, error, trace, warn};

/// What one line did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
  /// A thread fact was merged; `completed` if it finished a thread.
  Thread { id: String, completed: bool },
  /// A spam verdict was added to a live thread.
  Spam,
  /// A spam verdict that matched no live thread.
  Unattributed,
  /// Not a line the pipeline reads.
  Skipped,
}

/// Owns the [`ThreadStore`] and feeds it one line at a time.
pub struct Pipeline<S: ThreadSink> {
  store: ThreadStore<S>,
  lines: u64,
}

impl<S: ThreadSink> Pipeline<S> {
  pub fn new(sink: S) -> Self {
    Self { store: ThreadStore::with_sink(sink), lines: 0 }
  }

  pub fn store(&self) -> &ThreadStore<S> { &self.store }

  /// Lines seen so far, skipped ones included.
  pub fn lines(&self) -> u64 { self.lines }

  /// Process `line`, resolving its syslog stamp against the local clock.
  pub fn ingest(&mut self, line: &str) -> Ingested {
    self.ingest_at(line, Local::now().naive_local())
  }

  /// Process `line` with `now` as the reference time for its stamp.
  pub fn ingest_at(&mut self, line: &str, now: NaiveDateTime) -> Ingested {
    self.lines += 1;

    match thread_fact(line, now) {
      Ok(fact) => {
        let id = fact.id.clone();
        if let Err(e) = self.store.upsert(fact) {
          error!(%id, error = %e, "failed to merge thread fact");
          return Ingested::Skipped;
        }
        let completed = self.store.check_completion(&id);
        debug!(%id, completed, "thread fact");
        return Ingested::Thread { id, completed };
      }
      Err(e) if e.is_not_recognized() => {}
      Err(e) => {
        error!(error = %e, line, "unreadable postfix line");
        return Ingested::Skipped;
      }
    }

    match spam_fact(line) {
      Ok(spam) => match self.store.attribute_spam(&spam) {
        Ok(()) => {
          debug!(message_id = ?spam.message_id, score = spam.score, "spam verdict");
          Ingested::Spam
        }
        Err(postlog_core::Error::UnknownSpamAttribution { message_id }) => {
          warn!(?message_id, score = spam.score, "spam verdict for unknown thread");
          Ingested::Unattributed
        }
        Err(e) => {
          error!(error = %e, "failed to attribute spam verdict");
          Ingested::Skipped
        }
      },
      Err(e) if e.is_not_recognized() => {
        trace!(error = %e, "line skipped");
        Ingested::Skipped
      }
      Err(e) => {
        error!(error = %e, line, "unreadable scanner line");
        Ingested::Skipped
      }
    }
  }
}
