#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Text-block synchronization with a backing file
pub mod block;

/// Configuration options
pub mod config;

/// Unified-diff codec
pub mod diff;

/// Host-facing versioning engine
pub mod engine;

/// Error (common error types)
pub mod error;

/// In-process sync event bus
pub mod events;

/// Snapshot/diff reconstruction
pub mod history;

/// Entry payload codec
pub mod payload;

/// Append-only update queue
pub mod queue;

/// Two-way conservative text merge
pub mod merge;
