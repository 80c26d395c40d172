//! The completion capability held by [`crate::ThreadStore`].

use crate::ThreadRecord;

/// Receives every finished thread exactly once.
///
/// Called synchronously from the thread that drove completion, so
/// implementations that do I/O should hand the record off rather than block.
pub trait ThreadSink {
  fn thread_done(&mut self, thread: &ThreadRecord);
}

/// The default sink; drops every completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ThreadSink for NoopSink {
  fn thread_done(&mut self, _thread: &ThreadRecord) {}
}

/// Keeps a copy of every completion, in order.
impl ThreadSink for Vec<ThreadRecord> {
  fn thread_done(&mut self, thread: &ThreadRecord) { self.push(thread.clone()); }
}

impl<F> ThreadSink for F
where
  F: FnMut(&ThreadRecord),
{
  fn thread_done(&mut self, thread: &ThreadRecord) { self(thread) }
}
