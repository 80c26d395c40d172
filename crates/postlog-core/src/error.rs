//! Error types for `postlog-core`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("thread id is empty")]
  EmptyIdentity,

  /// Two partial records with different ids were merged. Merges are always
  /// keyed by id, so this points at a caller bug.
  #[error("cannot merge thread {found} into thread {expected}")]
  IdentityMismatch { expected: String, found: String },

  #[error("no live thread for spam entry (message-id {message_id:?})")]
  UnknownSpamAttribution { message_id: Option<String> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
