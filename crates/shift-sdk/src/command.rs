//! The command state machine.
//!
//! A [`Runtime`] wraps one registered connector and executes exactly one
//! [`Command`] per process:
//!
//! ```text
//! Idle -> Specifying | Checking | Discovering | Syncing -> Terminated
//! ```
//!
//! Every command is validated in the same order before anything runs:
//! the role must offer the command, required inputs must be present
//! (config before catalog), and the inputs must load and decode. Only the
//! inputs a command uses are ever loaded.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use tokio::io::AsyncBufRead;

use shift_types::catalog::{Catalog, ConfiguredCatalog};
use shift_types::error::ConnectorError;
use shift_types::message::{LogLevel, Message};
use shift_types::state::State;
use shift_types::wire::{ConnectionStatus, ConnectorRole};

use crate::codec::MessageWriter;
use crate::config::{decode_config, RuntimeConfig};
use crate::connector::{Checker, Connector, Destination, Discoverer, Source, Specifier};
use crate::engine::{catch_panic, run_read, run_write, ReadSummary, WriteSummary};
use crate::error::{Result, ShiftError, EXIT_OK};

/// A protocol command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Spec,
    Check,
    Discover,
    Read,
    Write,
}

impl Command {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Check => "check",
            Self::Discover => "discover",
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    /// Phase the machine occupies while this command runs.
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::Spec => Phase::Specifying,
            Self::Check => Phase::Checking,
            Self::Discover => Phase::Discovering,
            Self::Read | Self::Write => Phase::Syncing,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const DRIVER_COMMANDS: &[Command] = &[
    Command::Spec,
    Command::Check,
    Command::Discover,
    Command::Read,
];

const ADAPTER_COMMANDS: &[Command] = &[
    Command::Spec,
    Command::Check,
    Command::Discover,
    Command::Write,
];

/// Commands a connector of `role` may execute.
#[must_use]
pub fn commands_for(role: ConnectorRole) -> &'static [Command] {
    match role {
        ConnectorRole::Driver => DRIVER_COMMANDS,
        ConnectorRole::Adapter => ADAPTER_COMMANDS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Specifying,
    Checking,
    Discovering,
    Syncing,
    Terminated,
}

/// A raw input, given inline or named by a file read when first needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline(String),
    File(PathBuf),
}

impl Payload {
    async fn load(&self, argument: &'static str) -> Result<String> {
        match self {
            Self::Inline(raw) => Ok(raw.clone()),
            Self::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ShiftError::InvalidInput {
                    argument,
                    reason: format!("cannot read {}: {}", path.display(), e),
                }
            }),
        }
    }
}

impl From<String> for Payload {
    fn from(raw: String) -> Self {
        Self::Inline(raw)
    }
}

impl From<&str> for Payload {
    fn from(raw: &str) -> Self {
        Self::Inline(raw.to_string())
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Raw inputs for one command. Payloads are loaded and decoded by the
/// machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub config: Option<Payload>,
    pub catalog: Option<Payload>,
    pub state: Option<Payload>,
}

impl Invocation {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            config: None,
            catalog: None,
            state: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: impl Into<Payload>) -> Self {
        self.config = Some(config.into());
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<Payload>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<Payload>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Specified,
    Checked(ConnectionStatus),
    Discovered(Catalog),
    Read(ReadSummary),
    Wrote(WriteSummary),
}

/// A connector registered under a role.
///
/// Implemented by [`Driver`] and [`Adapter`]; the role fixes which sync
/// command the connector serves.
#[allow(async_fn_in_trait)]
pub trait Registered {
    const ROLE: ConnectorRole;

    type Connector: Specifier + Checker + Discoverer;

    fn connector(&self) -> &Self::Connector;

    /// Run the role's sync command (`read` or `write`).
    async fn sync<R, W>(
        &self,
        config: &<Self::Connector as Connector>::Config,
        catalog: &ConfiguredCatalog,
        state: &State,
        input: R,
        runtime: &RuntimeConfig,
        out: &mut MessageWriter<W>,
    ) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write;
}

/// A source connector.
#[derive(Debug)]
pub struct Driver<S>(pub S);

/// A destination connector.
#[derive(Debug)]
pub struct Adapter<D>(pub D);

impl<S: Source> Registered for Driver<S> {
    const ROLE: ConnectorRole = ConnectorRole::Driver;

    type Connector = S;

    fn connector(&self) -> &S {
        &self.0
    }

    async fn sync<R, W>(
        &self,
        config: &S::Config,
        catalog: &ConfiguredCatalog,
        state: &State,
        _input: R,
        runtime: &RuntimeConfig,
        out: &mut MessageWriter<W>,
    ) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        run_read(&self.0, config, catalog, state, runtime, out)
            .await
            .map(Outcome::Read)
    }
}

impl<D: Destination> Registered for Adapter<D> {
    const ROLE: ConnectorRole = ConnectorRole::Adapter;

    type Connector = D;

    fn connector(&self) -> &D {
        &self.0
    }

    async fn sync<R, W>(
        &self,
        config: &D::Config,
        catalog: &ConfiguredCatalog,
        _state: &State,
        input: R,
        runtime: &RuntimeConfig,
        out: &mut MessageWriter<W>,
    ) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        run_write(&self.0, config, catalog, input, runtime, out)
            .await
            .map(Outcome::Wrote)
    }
}

type ConfigOf<C> = <<C as Registered>::Connector as Connector>::Config;

fn require<'i>(value: Option<&'i Payload>, argument: &'static str) -> Result<&'i Payload> {
    value.ok_or(ShiftError::MissingArgument { argument })
}

fn decode_catalog(raw: &str) -> Result<ConfiguredCatalog> {
    let catalog: ConfiguredCatalog =
        serde_json::from_str(raw).map_err(|e| ShiftError::InvalidInput {
            argument: "catalog",
            reason: e.to_string(),
        })?;
    catalog.validate().map_err(|e| ShiftError::InvalidInput {
        argument: "catalog",
        reason: e.to_string(),
    })?;
    Ok(catalog)
}

fn decode_state(raw: Option<&str>) -> Result<State> {
    match raw.map(str::trim) {
        None | Some("") => Ok(State::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| ShiftError::InvalidInput {
            argument: "state",
            reason: e.to_string(),
        }),
    }
}

/// Executes one command against a registered connector.
pub struct Runtime<C> {
    connector: C,
    config: RuntimeConfig,
    commands: &'static [Command],
    phase: Phase,
    transitions: Vec<Phase>,
}

impl<C: Registered> Runtime<C> {
    pub fn new(connector: C, config: RuntimeConfig) -> Self {
        Self {
            connector,
            config,
            commands: commands_for(C::ROLE),
            phase: Phase::Idle,
            transitions: vec![Phase::Idle],
        }
    }

    #[must_use]
    pub fn role(&self) -> ConnectorRole {
        C::ROLE
    }

    #[must_use]
    pub fn commands(&self) -> &'static [Command] {
        self.commands
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`.
    #[must_use]
    pub fn transitions(&self) -> &[Phase] {
        &self.transitions
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Phase transition");
        self.phase = phase;
        self.transitions.push(phase);
    }

    /// Execute `invocation`. The machine is terminated afterwards whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ShiftError::AlreadyTerminated`] on a second call, otherwise
    /// whatever the command fails with.
    pub async fn execute<R, W>(
        &mut self,
        invocation: &Invocation,
        input: R,
        out: &mut MessageWriter<W>,
    ) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if self.phase != Phase::Idle {
            return Err(ShiftError::AlreadyTerminated);
        }
        let result = self.dispatch(invocation, input, out).await;
        self.enter(Phase::Terminated);
        result
    }

    /// [`Runtime::execute`], then [`conclude`]: the process exit code.
    pub async fn run<R, W>(
        &mut self,
        invocation: &Invocation,
        input: R,
        out: &mut MessageWriter<W>,
    ) -> u8
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let result = self.execute(invocation, input, out).await;
        conclude(&result, out)
    }

    async fn dispatch<R, W>(
        &mut self,
        invocation: &Invocation,
        input: R,
        out: &mut MessageWriter<W>,
    ) -> Result<Outcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let command = invocation.command;
        if !self.commands.contains(&command) {
            return Err(ShiftError::UnsupportedCommand {
                command,
                role: C::ROLE,
            });
        }
        tracing::info!(command = %command, role = %C::ROLE, "Executing command");
        self.enter(command.phase());

        match command {
            Command::Spec => {
                let spec = catch_panic(self.connector.connector().spec()).await?;
                out.emit(&Message::from(spec))?;
                Ok(Outcome::Specified)
            }
            Command::Check => {
                let raw = require(invocation.config.as_ref(), "config")?
                    .load("config")
                    .await?;
                let status = self.check(&raw).await?;
                out.emit(&Message::from(status.clone()))?;
                Ok(Outcome::Checked(status))
            }
            Command::Discover => {
                let raw = require(invocation.config.as_ref(), "config")?
                    .load("config")
                    .await?;
                let config = Self::config(&raw)?;
                let catalog = catch_panic(self.connector.connector().discover(&config)).await?;
                catalog.validate().map_err(|e| {
                    ConnectorError::discovery("DUPLICATE_STREAM", e.to_string())
                })?;
                tracing::info!(streams = catalog.streams.len(), "Discovered streams");
                out.emit(&Message::from(catalog.clone()))?;
                Ok(Outcome::Discovered(catalog))
            }
            Command::Read | Command::Write => {
                let raw_config = require(invocation.config.as_ref(), "config")?;
                let raw_catalog = require(invocation.catalog.as_ref(), "catalog")?;
                let config = Self::config(&raw_config.load("config").await?)?;
                let catalog = decode_catalog(&raw_catalog.load("catalog").await?)?;
                let raw_state = match &invocation.state {
                    Some(payload) => Some(payload.load("state").await?),
                    None => None,
                };
                let state = decode_state(raw_state.as_deref())?;
                self.connector
                    .sync(&config, &catalog, &state, input, &self.config, out)
                    .await
            }
        }
    }

    fn config(raw: &str) -> Result<ConfigOf<C>> {
        decode_config(raw).map_err(|e| ShiftError::InvalidInput {
            argument: "config",
            reason: e.to_string(),
        })
    }

    async fn check(&self, raw: &str) -> Result<ConnectionStatus> {
        let config: ConfigOf<C> = match decode_config(raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config rejected before check: {}", e);
                return Ok(ConnectionStatus::failed(e.to_string()));
            }
        };
        match catch_panic(self.connector.connector().check(&config)).await {
            Ok(status) => Ok(status),
            Err(ShiftError::Connector(e)) => {
                tracing::warn!(code = %e.code, "Check failed: {}", e.message);
                Ok(ConnectionStatus::failed(e.to_string()))
            }
            Err(other) => Err(other),
        }
    }
}

/// Emit a fatal error as a LOG(FATAL) and a TRACE message.
pub fn report<W: Write>(err: &ShiftError, out: &mut MessageWriter<W>) {
    tracing::error!(failure_type = ?err.failure_type(), "{}", err);
    for message in [Message::log(LogLevel::Fatal, err.to_string()), err.to_trace()] {
        if let Err(e) = out.emit(&message) {
            tracing::error!("Failed to report error: {}", e);
            return;
        }
    }
}

/// Report a failed command and map the result to a process exit code.
pub fn conclude<W: Write>(result: &Result<Outcome>, out: &mut MessageWriter<W>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(err) => {
            report(err, out);
            err.exit_code()
        }
    }
}
