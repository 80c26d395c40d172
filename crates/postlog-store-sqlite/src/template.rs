//! Output query templates.
//!
//! A template is plain SQL in which `?x` placeholders name a thread field.
//! Parsing rewrites every placeholder to a positional `?` and remembers the
//! field order, so binding is a single pass over [`QueryTemplate::columns`].

use postlog_core::ThreadRecord;
use rusqlite::types::Value;

use crate::{Error, Result};

/// Inserts every completed thread into the bundled `threads` table.
pub const DEFAULT_QUERY: &str = "INSERT INTO threads \
  (queue_id, message_id, sender, client_ip, accepted_at, spam_score) \
  VALUES (?i, ?m, ?f, ?c, ?t, ?s)";

/// Format of the `?t` column.
const ACCEPTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Column ──────────────────────────────────────────────────────────────────

/// A thread field that can be bound into the output query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
  /// `?i`
  QueueId,
  /// `?m`
  MessageId,
  /// `?f`
  Sender,
  /// `?c`
  ClientIp,
  /// `?t`
  AcceptedAt,
  /// `?s`
  SpamScore,
}

impl Column {
  pub fn from_tag(tag: char) -> Option<Self> {
    Some(match tag {
      'i' => Self::QueueId,
      'm' => Self::MessageId,
      'f' => Self::Sender,
      'c' => Self::ClientIp,
      't' => Self::AcceptedAt,
      's' => Self::SpamScore,
      _ => return None,
    })
  }

  /// The SQL value this column binds for `thread`.
  ///
  /// Missing text fields bind as `''` and a missing accept time as `NULL`.
  pub fn value(self, thread: &ThreadRecord) -> Value {
    let read: fn(&ThreadRecord) -> Value = match self {
      Self::QueueId => queue_id,
      Self::MessageId => message_id,
      Self::Sender => sender,
      Self::ClientIp => client_ip,
      Self::AcceptedAt => accepted_at,
      Self::SpamScore => spam_score,
    };
    read(thread)
  }
}

fn text(value: Option<&str>) -> Value {
  Value::Text(value.unwrap_or_default().to_owned())
}

fn queue_id(t: &ThreadRecord) -> Value { Value::Text(t.id.clone()) }

fn message_id(t: &ThreadRecord) -> Value { text(t.message_id.as_deref()) }

fn sender(t: &ThreadRecord) -> Value { text(t.from.as_deref()) }

fn client_ip(t: &ThreadRecord) -> Value { text(t.client_ip()) }

fn accepted_at(t: &ThreadRecord) -> Value {
  t.accepted_at().map_or(Value::Null, |at| {
    Value::Text(at.format(ACCEPTED_AT_FORMAT).to_string())
  })
}

fn spam_score(t: &ThreadRecord) -> Value {
  Value::Integer(i64::from(t.spam_score))
}

// ─── QueryTemplate ───────────────────────────────────────────────────────────

/// A parsed output template: SQL with positional parameters plus the
/// column bound to each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
  sql:     String,
  columns: Vec<Column>,
}

impl QueryTemplate {
  /// Parse `template`. A `?` not followed by a known tag is kept as is.
  pub fn parse(template: &str) -> Result<Self> {
    if template.trim().is_empty() {
      return Err(Error::EmptyTemplate);
    }

    Ok(Self::rewrite(template))
  }

  fn rewrite(template: &str) -> Self {
    let mut sql = String::with_capacity(template.len());
    let mut columns = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
      sql.push(c);
      if c != '?' {
        continue;
      }
      if let Some(column) = chars.peek().copied().and_then(Column::from_tag) {
        chars.next();
        columns.push(column);
      }
    }

    Self { sql, columns }
  }

  pub fn sql(&self) -> &str { &self.sql }

  pub fn columns(&self) -> &[Column] { &self.columns }

  /// Bind values for `thread`, in placeholder order.
  pub fn bind(&self, thread: &ThreadRecord) -> Vec<Value> {
    self.columns.iter().map(|c| c.value(thread)).collect()
  }
}

impl Default for QueryTemplate {
  fn default() -> Self { Self::rewrite(DEFAULT_QUERY) }
}
