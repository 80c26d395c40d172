//! Line supply: follows the mail log and sends complete lines downstream.
//!
//! Behaves like `tail -F`. A partial trailing line is held back until its
//! newline arrives; a file that shrinks or is replaced at the same path is
//! reopened from the start.

use std::{fs::Metadata, io::SeekFrom};

use tokio::{
  fs::File,
  io::{AsyncRead, AsyncReadExt as _, AsyncSeekExt as _},
  sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{Result, settings::TailSettings};

const READ_CHUNK: usize = 64 * 1024;
/// Longest partial line held back while waiting for its newline.
const MAX_LINE: usize = 16 * READ_CHUNK;

/// Read lines according to `settings` into `tx` until the input ends (replay
/// or stdin) or the receiver is dropped.
pub async fn tail_lines(
  settings: TailSettings,
  tx: mpsc::Sender<String>,
) -> Result<()> {
  if settings.reads_stdin() {
    return read_stdin(tx).await;
  }

  let path = settings.file.as_path();
  let mut file = File::open(path).await?;
  let mut identity = file_identity(&file.metadata().await?);

  let mut pos = if settings.follow && !settings.from_start {
    file.seek(SeekFrom::End(0)).await?
  } else {
    0
  };
  info!(path = %path.display(), pos, follow = settings.follow, "reading mail log");

  let mut pending = Vec::new();
  let mut chunk = vec![0u8; READ_CHUNK];

  loop {
    let n = file.read(&mut chunk).await?;
    if n > 0 {
      pos += n as u64;
      pending.extend_from_slice(&chunk[..n]);
      if !send_complete_lines(&mut pending, &tx).await {
        return Ok(());
      }
      continue;
    }

    if !settings.follow {
      flush_partial_line(&pending, &tx).await;
      debug!(path = %path.display(), "end of replay");
      return Ok(());
    }

    tokio::time::sleep(settings.poll_interval()).await;
    if tx.is_closed() {
      return Ok(());
    }

    let meta = match tokio::fs::metadata(path).await {
      Ok(meta) => meta,
      // Rotated away and not recreated yet.
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
      Err(e) => return Err(e.into()),
    };

    let truncated = meta.len() < pos;
    let replaced = file_identity(&meta) != identity;
    if truncated || replaced {
      info!(path = %path.display(), truncated, replaced, "reopening mail log");
      file = File::open(path).await?;
      identity = file_identity(&file.metadata().await?);
      pos = 0;
      pending.clear();
    }
  }
}

async fn read_stdin(tx: mpsc::Sender<String>) -> Result<()> {
  read_lines(tokio::io::stdin(), &tx).await?;
  debug!("end of stdin");
  Ok(())
}

/// Read `reader` to its end, sending every line including an unterminated
/// last one.
async fn read_lines<R: AsyncRead + Unpin>(
  mut reader: R,
  tx: &mpsc::Sender<String>,
) -> Result<()> {
  let mut pending = Vec::new();
  let mut chunk = vec![0u8; READ_CHUNK];
  loop {
    let n = reader.read(&mut chunk).await?;
    if n == 0 {
      flush_partial_line(&pending, tx).await;
      return Ok(());
    }
    pending.extend_from_slice(&chunk[..n]);
    if !send_complete_lines(&mut pending, tx).await {
      return Ok(());
    }
  }
}

/// Drain every newline-terminated line from `pending` into `tx`. A partial
/// line that reaches [`MAX_LINE`] is sent as it is. Returns `false` once the
/// receiver is gone.
async fn send_complete_lines(
  pending: &mut Vec<u8>,
  tx: &mpsc::Sender<String>,
) -> bool {
  while let Some(end) = pending.iter().position(|&b| b == b'\n') {
    let line = decode(&pending[..end]);
    pending.drain(..=end);
    if tx.send(line).await.is_err() {
      return false;
    }
  }
  if pending.len() >= MAX_LINE {
    warn!(len = pending.len(), "overlong line split");
    let line = decode(&pending[..]);
    pending.clear();
    if tx.send(line).await.is_err() {
      return false;
    }
  }
  true
}

async fn flush_partial_line(pending: &[u8], tx: &mpsc::Sender<String>) {
  if pending.is_empty() {
    return;
  }
  if tx.send(decode(pending)).await.is_err() {
    debug!("receiver gone before the last line");
  }
}

fn decode(raw: &[u8]) -> String {
  String::from_utf8_lossy(raw).trim_end_matches('\r').to_owned()
}

#[cfg(unix)]
fn file_identity(meta: &Metadata) -> u64 {
  use std::os::unix::fs::MetadataExt as _;
  meta.ino()
}

#[cfg(not(unix))]
fn file_identity(_meta: &Metadata) -> u64 { 0 }
