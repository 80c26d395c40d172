//! Line classifier: recognises postfix service lines and splits them into
//! their fixed fields.

use std::sync::LazyLock;

use regex::Regex;

/// `<stamp> <host> postfix[-inst]/[service/]<component>[<pid>]: <id>: <payload>`
static POSTFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r" postfix(?:-[\w.\-]+)?/(?:[\w.\-]+/)*([\w\-]+)\[(\d+)\]: ([A-Za-z0-9]+): (.*)$",
  )
  .expect("postfix line regex is valid")
});

// ─── Subsystem ───────────────────────────────────────────────────────────────

/// The postfix component that emitted a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
  /// SMTP front-end; reports the connecting client.
  Smtpd,
  /// Header cleanup; assigns the message id.
  Cleanup,
  /// Queue manager; reports the sender and the final removal.
  Qmgr,
  /// Outbound SMTP transport; reports delivery status and re-queue ids.
  Smtp,
  /// Final delivery agents (`pipe`, `local`, `virtual`).
  LocalDelivery,
  /// Any other postfix component (`bounce`, `anvil`, ...).
  Other,
}

impl Subsystem {
  pub fn from_component(component: &str) -> Self {
    match component {
      "smtpd" => Self::Smtpd,
      "cleanup" => Self::Cleanup,
      "qmgr" => Self::Qmgr,
      "smtp" => Self::Smtp,
      "pipe" | "local" | "virtual" => Self::LocalDelivery,
      _ => Self::Other,
    }
  }

  /// Components whose lines carry a real queue id.
  pub fn carries_thread(&self) -> bool { !matches!(self, Self::Other) }
}

// ─── PostfixLine ─────────────────────────────────────────────────────────────

/// The structural fields of a postfix service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostfixLine<'a> {
  pub subsystem: Subsystem,
  /// The raw component name, e.g. `smtpd` or `bounce`.
  pub component: &'a str,
  pub pid:       u32,
  /// The queue-id field, unvalidated; may be a keyword like `warning`.
  pub queue_id:  &'a str,
  pub payload:   &'a str,
}

/// Split `line` into its postfix fields. `None` for anything that is not a
/// `<component>[pid]: <id>: <payload>` line.
pub fn classify(line: &str) -> Option<PostfixLine<'_>> {
  let caps = POSTFIX.captures(line)?;
  let component = caps.get(1)?.as_str();

  Some(PostfixLine {
    subsystem: Subsystem::from_component(component),
    component,
    pid: caps.get(2)?.as_str().parse().ok()?,
    queue_id: caps.get(3)?.as_str(),
    payload: caps.get(4)?.as_str(),
  })
}

/// True if `line` is a postfix line from one of `accepted`. An empty slice
/// accepts every component.
pub fn is_postfix(line: &str, accepted: &[Subsystem]) -> bool {
  classify(line)
    .is_some_and(|p| accepted.is_empty() || accepted.contains(&p.subsystem))
}
