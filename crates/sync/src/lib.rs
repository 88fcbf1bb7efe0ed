//! Keeps a local metadata graph in step with the data service.
//!
//! This crate provides:
//! - `GraphDiff` and the `Synchronizer` that applies diffs atomically
//! - `GraphSource` trait for the transport, with HTTP and in-memory sources
//! - `Poller`, the periodic loop that publishes change batches

pub mod diff;
pub mod error;
pub mod http;
pub mod memory;
pub mod poller;
pub mod source;
pub mod synchronizer;

pub use diff::GraphDiff;
pub use error::{Result, SyncError};
pub use http::HttpGraphSource;
pub use memory::InMemorySource;
pub use poller::{ChangeBatch, Poller};
pub use source::GraphSource;
pub use synchronizer::Synchronizer;
