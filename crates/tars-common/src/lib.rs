//! TARS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the TARS export tooling.
//!
//! # Overview
//!
//! This crate provides common functionality used across all TARS workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: MD5 digests used to confirm that an export landed intact
//! - **Types**: Metadata records, drafts and the daily sequence number
//! - **Logging**: Subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use tars_common::checksum;
//!
//! let digest = checksum::checksum(b"test");
//! assert!(checksum::matches(b"test", &digest));
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TarsError};
pub use types::{
    BasicMetadataDraft, Clock, DailySequenceNumber, FixedClock, MetadataRecord, SystemClock,
};
