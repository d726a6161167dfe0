//! bbiq CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line interface for the BookBrainz import queue.
//!
//! # Overview
//!
//! - **Consuming**: validate and persist queued entities (`bbiq consume`)
//! - **Inspection**: show queue metadata (`bbiq info`)
//! - **Maintenance**: drop every waiting message (`bbiq purge`)
//! - **Producing**: push JSON entity files (`bbiq push`) or OpenLibrary dumps (`bbiq import`)

pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use bbiq_importer::config::{parse_failure_queue, Config};
use bbiq_importer::persistence::ExistingImportAction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bbiq - BookBrainz import queue
#[derive(Parser, Debug)]
#[command(name = "bbiq")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(long, env = "BBIQ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Broker connection URL
    #[arg(short = 'c', long, global = true)]
    pub connection: Option<String>,

    /// Primary queue name
    #[arg(short = 'q', long, global = true)]
    pub queue: Option<String>,

    /// Failure queue name, 'none' disables it
    #[arg(short = 'f', long, global = true)]
    pub failure_queue: Option<String>,

    /// Use the non-persistent test queues
    #[arg(short = 't', long, global = true)]
    pub test: bool,

    /// Update pending imports when the source has a newer edit
    #[arg(short = 'u', long, global = true)]
    pub update_pending: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume the queue and import entities until interrupted
    Consume,

    /// Show queue metadata
    Info,

    /// Delete every message waiting in the primary queue
    Purge,

    /// Push JSON entity files into the queue
    Push {
        /// Files holding one entity or an array of entities
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Push every entity of OpenLibrary dump files (plain or .gz)
    Import {
        /// Dump files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// Load the configuration and apply the command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load(self.config.as_deref())?;
        self.apply_overrides(config)
    }

    /// Command-line flags win over the file and the environment
    pub fn apply_overrides(&self, mut config: Config) -> Result<Config> {
        if let Some(url) = &self.connection {
            config.queue.connection_url = url.clone();
        }
        if let Some(name) = &self.queue {
            config.queue.queue_name = name.clone();
        }
        if let Some(name) = &self.failure_queue {
            config.queue.failure_queue = parse_failure_queue(name);
        }
        if self.test {
            config.queue = config.queue.into_test_mode();
        }
        if self.update_pending {
            config.import.existing_import_action = ExistingImportAction::UpdatePending;
        }

        config.validate()?;
        Ok(config)
    }
}
