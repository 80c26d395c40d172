//! postlog daemon: tails a mail log and reports finished mail threads.
//!
//! Three tasks connected by channels:
//!
//!   tail_lines ──(bounded, ordered)──▶ Pipeline ──(unbounded)──▶ report
//!
//! The pipeline is the only writer of the thread store; completed threads
//! leave it through a [`ChannelSink`] so database writes never stall line
//! processing.

pub mod error;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod tail;

use std::future::Future;

use postlog_store_sqlite::{QueryTemplate, SqliteSink};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub use error::{Error, Result};
pub use pipeline::{Ingested, Pipeline};
pub use report::{ChannelSink, ReportStats, report};
pub use settings::Settings;

/// Capacity of the line channel between the tailer and the pipeline.
const LINE_BUFFER: usize = 1024;

/// Totals for one [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
  pub lines:   u64,
  /// Threads still waiting for their removal when the run ended.
  pub open:    usize,
  pub reports: ReportStats,
}

/// Run the daemon until the input ends or `shutdown` resolves.
pub async fn run(
  settings: Settings,
  shutdown: impl Future<Output = ()>,
) -> Result<RunStats> {
  let database = match &settings.sink.database {
    Some(path) => {
      let template = QueryTemplate::parse(&settings.sink.query)?;
      let sink = SqliteSink::open(path, template).await?;
      info!(path = %path.display(), "recording completed threads");
      Some(sink)
    }
    None => None,
  };

  let (line_tx, mut line_rx) = mpsc::channel(LINE_BUFFER);
  let (done_tx, done_rx) = mpsc::unbounded_channel();

  let tailer = tokio::spawn(tail::tail_lines(settings.tail.clone(), line_tx));
  let reporter =
    tokio::spawn(report(done_rx, settings.sink.clone(), database));

  let mut pipeline = Pipeline::new(ChannelSink(done_tx));
  tokio::pin!(shutdown);

  let interrupted = loop {
    tokio::select! {
      line = line_rx.recv() => match line {
        Some(line) => {
          pipeline.ingest(&line);
        }
        None => break false,
      },
      () = &mut shutdown => break true,
    }
  };

  let lines = pipeline.lines();
  let open = pipeline.store().len();
  drop(pipeline);

  if interrupted {
    debug!("shutdown requested");
    tailer.abort();
  } else {
    tailer.await??;
  }
  let reports = reporter.await?;

  info!(lines, open, completed = reports.completed, spam = reports.spam, "finished");
  Ok(RunStats { lines, open, reports })
}
