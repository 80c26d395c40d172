//! Spam verdicts, joined to threads by message id.

use serde::{Deserialize, Serialize};

/// A scanner or content-filter verdict for one message.
///
/// Spam records are never stored; [`crate::ThreadStore::attribute_spam`]
/// adds the score to a live thread and the record is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamRecord {
  /// Join key against [`crate::ThreadRecord::message_id`].
  pub message_id: Option<String>,
  /// Queue id the filter received the message under (`Queue-ID:`).
  pub queue_id:   Option<String>,
  /// Queue id the filter re-queued the message under (`queued_as:`). When
  /// present, only the thread with exactly this id may take the score.
  pub queued_as:  Option<String>,
  pub score:      u32,
}
