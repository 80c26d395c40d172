//! Fact extractors for postfix service lines.
//!
//! Each line-level extractor classifies the line itself and only answers for
//! the component it understands; [`thread_fact`] classifies once and runs the
//! payload-level helpers directly.

use std::sync::LazyLock;

use chrono::{Datelike as _, Duration, NaiveDateTime};
use postlog_core::{ClientIdentity, DeliveryStatus, ThreadRecord};
use regex::Regex;

use crate::{
  EMAIL,
  classify::{PostfixLine, Subsystem, classify},
  error::{Error, Result},
};

static STAMP: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(\w+\s+\d{1,2} \d{1,2}:\d{1,2}:\d{1,2})")
    .expect("timestamp regex is valid")
});

static CLIENT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"client=([A-Za-z0-9_.\-]+)\[([0-9A-Fa-f:.]+)\]")
    .expect("client regex is valid")
});

static MESSAGE_ID: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[Mm]essage-[Ii][Dd][=:][\s<]*([A-Za-z0-9\-_.@$]+)>*")
    .expect("message-id regex is valid")
});

static QUEUED_AS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"queued as ([A-Za-z0-9]+)\)").expect("queued-as regex is valid")
});

static STATUS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"status=(sent|deferred)\b").expect("status regex is valid")
});

static FROM: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"from=<({EMAIL})>,")).expect("from regex is valid")
});

/// Words postfix writes where a queue id would otherwise be.
const DIAGNOSTIC_KEYWORDS: &[&str] =
  &["WARNING", "NOQUEUE", "ERROR", "FATAL", "PANIC"];

// ─── Line-level extractors ───────────────────────────────────────────────────

/// The queue id of a thread-carrying postfix line.
///
/// Fails with [`Error::FormatNotRecognized`] for non-postfix lines, for
/// components that do not carry a thread and for diagnostic keywords in the
/// id position.
pub fn transaction_id(line: &str) -> Result<String> {
  let parsed = classify(line).ok_or(Error::FormatNotRecognized)?;
  thread_id_of(&parsed)
}

/// The syslog stamp at the start of `line`, placed in the year of `now`.
///
/// Stamps carry no year; one that would land more than a day after `now`, or
/// that does not exist in that year, is placed in the closest earlier year
/// where it is valid.
pub fn timestamp(line: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
  let caps = STAMP.captures(line).ok_or(Error::FormatNotRecognized)?;
  let stamp = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");

  let at_year = |year: i32| {
    NaiveDateTime::parse_from_str(&format!("{year} {stamp}"), "%Y %b %d %H:%M:%S")
  };

  // `Feb 29` only exists in leap years, at most eight apart.
  let latest = now + Duration::days(1);
  (0..=8)
    .filter_map(|back| at_year(now.year() - back).ok())
    .find(|parsed| *parsed <= latest)
    .ok_or(Error::FormatNotRecognized)
}

/// The connecting client of a front-end (`smtpd`) line.
pub fn client_identity(line: &str, now: NaiveDateTime) -> Option<ClientIdentity> {
  let parsed = classify(line).filter(|p| p.subsystem == Subsystem::Smtpd)?;
  client_of(parsed.payload, line, now)
}

/// A `message-id=` or `Message-ID:` token anywhere in `text`, without its
/// angle brackets.
pub fn message_id(text: &str) -> Option<String> {
  MESSAGE_ID
    .captures(text)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().to_owned())
}

/// The re-queue pointer of an outbound-transport (`smtp`) line.
pub fn queued_as(line: &str) -> Option<String> {
  classify(line)
    .filter(|p| p.subsystem == Subsystem::Smtp)
    .and_then(|p| queued_as_of(p.payload))
}

/// The delivery status of an outbound-transport (`smtp`) line.
pub fn delivery_status(line: &str) -> DeliveryStatus {
  classify(line)
    .filter(|p| p.subsystem == Subsystem::Smtp)
    .map(|p| status_of(p.payload))
    .unwrap_or_default()
}

/// The envelope sender of a queue-manager (`qmgr`) line.
pub fn sender(line: &str) -> Option<String> {
  classify(line)
    .filter(|p| p.subsystem == Subsystem::Qmgr)
    .and_then(|p| sender_of(p.payload))
}

/// True for the queue manager's `removed` line.
pub fn is_removed(line: &str) -> bool {
  classify(line)
    .filter(|p| p.subsystem == Subsystem::Qmgr)
    .is_some_and(|p| removed_of(p.payload))
}

/// Build the partial [`ThreadRecord`] a postfix line contributes.
///
/// `now` anchors the year of the client-accept stamp.
pub fn thread_fact(line: &str, now: NaiveDateTime) -> Result<ThreadRecord> {
  let parsed = classify(line).ok_or(Error::FormatNotRecognized)?;
  let mut fact = ThreadRecord::new(thread_id_of(&parsed)?)?;
  let payload = parsed.payload;

  match parsed.subsystem {
    Subsystem::Smtpd => fact.client = client_of(payload, line, now),
    Subsystem::Cleanup => fact.message_id = message_id(payload),
    Subsystem::Qmgr => {
      fact.from = sender_of(payload);
      fact.removed = removed_of(payload);
    }
    Subsystem::Smtp => {
      fact.child_id = queued_as_of(payload);
      fact.delivery_status = status_of(payload);
    }
    Subsystem::LocalDelivery | Subsystem::Other => {}
  }

  Ok(fact)
}

// ─── Payload-level helpers ───────────────────────────────────────────────────

fn thread_id_of(parsed: &PostfixLine<'_>) -> Result<String> {
  if !parsed.subsystem.carries_thread() {
    return Err(Error::FormatNotRecognized);
  }

  let id = parsed.queue_id.trim();
  let upper = id.to_ascii_uppercase();
  if DIAGNOSTIC_KEYWORDS.contains(&upper.as_str()) {
    return Err(Error::FormatNotRecognized);
  }
  if id.is_empty() {
    return Err(postlog_core::Error::EmptyIdentity.into());
  }
  Ok(id.to_owned())
}

fn client_of(
  payload: &str,
  line: &str,
  now: NaiveDateTime,
) -> Option<ClientIdentity> {
  let caps = CLIENT.captures(payload)?;
  Some(ClientIdentity {
    name:        caps[1].to_owned(),
    ip:          caps[2].to_owned(),
    accepted_at: timestamp(line, now).ok(),
  })
}

fn queued_as_of(payload: &str) -> Option<String> {
  QUEUED_AS.captures(payload).map(|c| c[1].to_owned())
}

fn status_of(payload: &str) -> DeliveryStatus {
  match STATUS.captures(payload).as_ref().map(|c| &c[1]) {
    Some("sent") => DeliveryStatus::Sent,
    Some("deferred") => DeliveryStatus::Deferred,
    _ => DeliveryStatus::Unknown,
  }
}

fn sender_of(payload: &str) -> Option<String> {
  FROM.captures(payload).map(|c| c[1].to_owned())
}

fn removed_of(payload: &str) -> bool {
  payload.trim().eq_ignore_ascii_case("removed")
}
