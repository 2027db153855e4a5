//! Command-line surface shared by every connector binary.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::command::{Command, Invocation, Payload};
use crate::config::RuntimeConfig;

#[derive(Debug, Parser)]
#[command(name = "shift", version, about = "Shift connector protocol runtime")]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to the connector config JSON
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the configured catalog JSON
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Path to the state JSON to resume from
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Records per batch (write) or between checkpoints (read)
    #[arg(long, default_value = "10000", global = true)]
    pub batch: NonZeroUsize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Print the connector specification
    Spec,
    /// Validate config and connectivity
    Check,
    /// List the streams the connector exposes
    Discover,
    /// Extract records (drivers)
    Read,
    /// Load records from stdin (adapters)
    Write,
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Spec => Self::Spec,
            CliCommand::Check => Self::Check,
            CliCommand::Discover => Self::Discover,
            CliCommand::Read => Self::Read,
            CliCommand::Write => Self::Write,
        }
    }
}

impl Cli {
    /// The command with its payload files. Files are read by the command
    /// machine, and only if the command uses them.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            command: self.command.into(),
            config: self.config.clone().map(Payload::File),
            catalog: self.catalog.clone().map(Payload::File),
            state: self.state.clone().map(Payload::File),
        }
    }

    #[must_use]
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::default().with_batch_size(self.batch)
    }
}
