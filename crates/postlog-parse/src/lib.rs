//! Postfix / spamd / amavis log-line parser for postlog.
//!
//! Turns one raw syslog line into a typed partial fact. Pure and
//! synchronous; no I/O and no state.
//!
//! Pipeline:
//!   raw &str
//!     └─ classify()          → PostfixLine (subsystem, pid, queue id, payload)
//!          └─ thread_fact()  → partial ThreadRecord
//!     └─ spam_fact()         → SpamRecord (spamd or amavis verdict)
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::Local;
//! use postlog_parse::thread_fact;
//!
//! let line = "Nov 22 01:45:57 mx postfix/smtpd[5910]: A2CAFB08A049: client=unknown[1.1.1.1]";
//! let fact = thread_fact(line, Local::now().naive_local()).unwrap();
//! assert_eq!(fact.client_ip(), Some("1.1.1.1"));
//! ```

mod classify;
mod extract;
mod scanner;

pub mod error;

pub use classify::{PostfixLine, Subsystem, classify, is_postfix};
pub use error::{Error, Result};
pub use extract::{
  client_identity, delivery_status, is_removed, message_id, queued_as,
  sender, thread_fact, timestamp, transaction_id,
};
pub use scanner::{amavis_result, spam_fact, spamd_result};

/// Loose e-mail address shape shared by the sender and recipient matchers.
pub(crate) const EMAIL: &str =
  r"[a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-]+\.[a-zA-Z0-9.\-]+";
