//! Thread records: the accumulating view of one mail transaction.
//!
//! A thread is keyed by its queue id. Every log line that mentions the id
//! yields a partial [`ThreadRecord`]; partials are folded into the live record
//! with [`ThreadRecord::merge`], which only ever fills gaps.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Client ──────────────────────────────────────────────────────────────────

/// The peer that handed the message to the front-end, as reported by the
/// `client=` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
  /// Reverse-DNS name, or `unknown`.
  pub name:        String,
  pub ip:          String,
  /// Syslog stamp of the accept line.
  pub accepted_at: Option<NaiveDateTime>,
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Last known outcome reported by the outbound transport.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
  #[default]
  Unknown,
  Sent,
  Deferred,
}

impl DeliveryStatus {
  pub fn is_known(&self) -> bool { !matches!(self, Self::Unknown) }
}

// ─── ThreadRecord ────────────────────────────────────────────────────────────

/// Everything known about one queue id.
///
/// Optional fields are "first seen wins": once set, a later partial cannot
/// overwrite them. `removed` only moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
  pub id:              String,
  pub message_id:      Option<String>,
  pub from:            Option<String>,
  /// Queue id the message was re-queued under after content filtering.
  pub child_id:        Option<String>,
  /// Back-reference maintained by the store; never set by parsers.
  pub parent_id:       Option<String>,
  pub client:          Option<ClientIdentity>,
  pub spam_score:      u32,
  pub delivery_status: DeliveryStatus,
  pub removed:         bool,
}

impl ThreadRecord {
  /// An empty record for `id`. Fails on an empty id.
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::EmptyIdentity);
    }

    Ok(Self {
      id,
      message_id: None,
      from: None,
      child_id: None,
      parent_id: None,
      client: None,
      spam_score: 0,
      delivery_status: DeliveryStatus::Unknown,
      removed: false,
    })
  }

  /// Fold `incoming` into `self`, filling only the fields that are still
  /// unset. Both records must describe the same id.
  pub fn merge(&mut self, incoming: ThreadRecord) -> Result<()> {
    if self.id != incoming.id {
      return Err(Error::IdentityMismatch {
        expected: self.id.clone(),
        found:    incoming.id,
      });
    }

    fill(&mut self.message_id, incoming.message_id);
    fill(&mut self.from, incoming.from);
    fill(&mut self.child_id, incoming.child_id);
    fill(&mut self.parent_id, incoming.parent_id);
    fill(&mut self.client, incoming.client);

    if !self.delivery_status.is_known() {
      self.delivery_status = incoming.delivery_status;
    }
    self.spam_score = self.spam_score.max(incoming.spam_score);
    self.removed |= incoming.removed;

    Ok(())
  }

  pub fn client_ip(&self) -> Option<&str> {
    self.client.as_ref().map(|c| c.ip.as_str())
  }

  /// When the front-end accepted the message, if the accept line was seen.
  pub fn accepted_at(&self) -> Option<NaiveDateTime> {
    self.client.as_ref().and_then(|c| c.accepted_at)
  }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
  if slot.is_none() {
    *slot = value;
  }
}
