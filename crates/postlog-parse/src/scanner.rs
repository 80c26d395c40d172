//! Spam verdicts from spamd and amavis.
//!
//! Neither scanner logs a postfix queue id in the usual position, so their
//! verdicts become [`SpamRecord`]s keyed by message id.

use std::{collections::BTreeSet, sync::LazyLock};

use postlog_core::SpamRecord;
use regex::Regex;

use crate::{
  EMAIL,
  error::{Error, Result},
  extract::message_id,
};

static SPAMD_RESULT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"spamd\[\d+\]: spamd: result: ").expect("spamd prefix regex is valid")
});

static SPAMD: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"spamd\[\d+\]: spamd: result: ([.Yy]) (-?\d+) - .*,mid=<*([A-Za-z0-9\-_.@$]+)>*,",
  )
  .expect("spamd regex is valid")
});

/// `(<log-id>) Passed|Blocked <VERDICT> ... [<ip>] <sender> -> <rcpt>,...`
static AMAVIS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"amavis\[\d+\]: \([\w\-]+\) (?:Passed|Blocked) ([A-Za-z\-]+).*\[[0-9A-Fa-f:.]+\] <([^>]*)> -> (.*)$",
  )
  .expect("amavis regex is valid")
});

static AMAVIS_QUEUE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\b(queue-id|queued_as): ([a-z0-9]+)")
    .expect("amavis queue regex is valid")
});

static EMAIL_EXACT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!("^{EMAIL}$")).expect("email regex is valid")
});

/// Parse a spamd `result:` line. One point when the verdict flag is `Y`.
///
/// A `result:` line whose `mid=` is a placeholder (`< >`, `(unknown)`) fails
/// with [`Error::MalformedScannerResult`]; anything else that is not a
/// `result:` line fails with [`Error::FormatNotRecognized`].
pub fn spamd_result(line: &str) -> Result<SpamRecord> {
  if !SPAMD_RESULT.is_match(line) {
    return Err(Error::FormatNotRecognized);
  }

  let caps = SPAMD
    .captures(line)
    .ok_or_else(|| Error::MalformedScannerResult(line.to_owned()))?;

  let spam = caps[1].eq_ignore_ascii_case("y");
  Ok(SpamRecord {
    message_id: Some(caps[3].to_owned()),
    queue_id:   None,
    queued_as:  None,
    score:      u32::from(spam),
  })
}

/// Parse an amavis `Passed`/`Blocked` statistics line.
///
/// `Queue-ID` and `queued_as` are always picked up. For `SPAM*` and
/// `BANNED` verdicts the score is the number of distinct valid recipient
/// addresses; clean verdicts score zero.
pub fn amavis_result(line: &str) -> Result<SpamRecord> {
  let caps = AMAVIS.captures(line).ok_or(Error::FormatNotRecognized)?;
  let verdict = caps[1].to_ascii_uppercase();
  let tail = caps.get(3).map_or("", |m| m.as_str());

  let mut record = SpamRecord {
    message_id: message_id(tail),
    ..SpamRecord::default()
  };

  for q in AMAVIS_QUEUE.captures_iter(tail) {
    let value = q[2].to_owned();
    if q[1].eq_ignore_ascii_case("queue-id") {
      record.queue_id.get_or_insert(value);
    } else {
      record.queued_as.get_or_insert(value);
    }
  }

  if verdict.starts_with("SPAM") || verdict.starts_with("BANN") {
    record.score = protected_recipients(tail);
  }

  Ok(record)
}

/// A spam verdict from whichever scanner wrote `line`.
pub fn spam_fact(line: &str) -> Result<SpamRecord> {
  match spamd_result(line) {
    Err(Error::FormatNotRecognized) => amavis_result(line),
    other => other,
  }
}

/// Count the distinct valid addresses in the leading `<a>,<b>,...` run of
/// an amavis recipient list.
fn protected_recipients(tail: &str) -> u32 {
  let recipients: BTreeSet<&str> = tail
    .split(',')
    .map(str::trim)
    .take_while(|item| item.starts_with('<'))
    .map(|item| item.trim_matches(|c| c == '<' || c == '>'))
    .filter(|addr| EMAIL_EXACT.is_match(addr))
    .collect();

  u32::try_from(recipients.len()).unwrap_or(u32::MAX)
}
