//! Completed-thread reporting.
//!
//! The store hands every finished thread to a [`ChannelSink`]; the
//! [`report`] task logs it, optionally prints it as JSON and writes it to
//! the SQLite sink, off the line-processing path.

use postlog_core::{ThreadRecord, ThreadSink};
use postlog_store_sqlite::SqliteSink;
use tokio::sync::mpsc;
use tracing::{error, info, trace};

use crate::settings::SinkSettings;

/// Forwards completions to the reporting task.
pub struct ChannelSink(pub mpsc::UnboundedSender<ThreadRecord>);

impl ThreadSink for ChannelSink {
  fn thread_done(&mut self, thread: &ThreadRecord) {
    if self.0.send(thread.clone()).is_err() {
      trace!(id = %thread.id, "reporter gone; completion dropped");
    }
  }
}

/// Totals kept by the reporting task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
  pub completed: u64,
  pub spam:      u64,
  pub persisted: u64,
}

/// Drain `rx` until every sender is dropped.
pub async fn report(
  mut rx: mpsc::UnboundedReceiver<ThreadRecord>,
  settings: SinkSettings,
  database: Option<SqliteSink>,
) -> ReportStats {
  let mut stats = ReportStats::default();

  while let Some(thread) = rx.recv().await {
    stats.completed += 1;

    if thread.spam_score > 0 {
      stats.spam += 1;
      info!(
        id = %thread.id,
        accepted_at = ?thread.accepted_at(),
        from = thread.from.as_deref().unwrap_or_default(),
        client_ip = thread.client_ip().unwrap_or_default(),
        score = thread.spam_score,
        "spam thread complete"
      );
    }

    if settings.json {
      match serde_json::to_string(&thread) {
        Ok(line) => println!("{line}"),
        Err(e) => error!(id = %thread.id, error = %e, "failed to encode thread"),
      }
    }

    if let Some(db) = &database
      && settings.should_persist(&thread)
    {
      match db.record(&thread).await {
        Ok(_) => stats.persisted += 1,
        Err(e) => error!(id = %thread.id, error = %e, "failed to record thread"),
      }
    }
  }

  stats
}
