//! Core types and the correlation engine for postlog.
//!
//! This crate knows nothing about log formats, files or databases. Parsers
//! produce [`ThreadRecord`] and [`SpamRecord`] facts; the [`ThreadStore`]
//! merges them, links re-queued transactions and hands every finished thread
//! to a [`ThreadSink`] exactly once.

pub mod error;
pub mod sink;
pub mod spam;
pub mod store;
pub mod thread;

pub use error::{Error, Result};
pub use sink::{NoopSink, ThreadSink};
pub use spam::SpamRecord;
pub use store::ThreadStore;
pub use thread::{ClientIdentity, DeliveryStatus, ThreadRecord};
