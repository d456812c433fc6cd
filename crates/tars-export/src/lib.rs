//! TARS export sequencing
//!
//! Allocates sequence numbers for periodic TARS exports and keeps the file
//! share and the metadata container pruned down to the newest files.
//!
//! # Overview
//!
//! - **Metadata**: locate and load the current record of a family (`tars latest`)
//! - **Allocation**: draft the next sequence numbers, retrying unconfirmed exports (`tars allocate`)
//! - **Export**: allocate, upload the result file, persist metadata (`tars export`)
//! - **Housekeeping**: prune processed result files and old metadata blobs (`tars housekeeping`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod retention;
pub mod sequence;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{AllocatorError, ExportError, HousekeepingError, MetadataError, PruneError, StoreError};
pub use metadata::{MetadataFamily, MetadataStore};
pub use retention::{Housekeeping, HousekeepingReport, PruneOutcome, RetentionPruner};
pub use sequence::{AllocatorSettings, ExportCycle, SequenceAllocator};
pub use storage::ObjectStore;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TARS export sequencing and housekeeping
#[derive(Parser, Debug)]
#[command(name = "tars")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the current metadata record
    Latest,

    /// Print the sequence numbers the next export would use
    Allocate,

    /// Run a full export cycle for one result file
    Export {
        /// File with the exported content
        #[arg(short, long)]
        input: PathBuf,

        /// Result file name; `{sequence}`, `{daily}` and `{date}` are expanded
        #[arg(short, long, default_value = sequence::cycle::DEFAULT_RESULT_FILE_TEMPLATE)]
        file_name: String,

        /// Number of exported rows
        #[arg(short, long)]
        rows: u64,
    },

    /// Prune processed result files and superseded metadata blobs
    Housekeeping {
        /// Keep running, once every this many seconds, until Ctrl+C.
        /// Without a value the configured interval is used.
        #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "0")]
        every: Option<u64>,
    },
}
