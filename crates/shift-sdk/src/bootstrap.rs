//! Process entry points for connector binaries.

use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;

use crate::cli::Cli;
use crate::codec::MessageWriter;
use crate::command::{conclude, report, Adapter, Driver, Registered, Runtime};
use crate::connector::{Destination, Source};
use crate::error::{ShiftError, EXIT_FAILURE};
use crate::logging;

/// Run `source` as a driver binary and return its exit code.
pub fn driver_main<S: Source>(source: S) -> ExitCode {
    launch(Driver(source))
}

/// Run `destination` as an adapter binary and return its exit code.
pub fn adapter_main<D: Destination>(destination: D) -> ExitCode {
    launch(Adapter(destination))
}

fn launch<C: Registered>(connector: C) -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut out = MessageWriter::new(std::io::stdout());
    let invocation = cli.invocation();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            report(&ShiftError::Io(err), &mut out);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let mut machine = Runtime::new(connector, cli.runtime_config());
    let code = runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        // Whole messages only: cancellation lands between emits.
        let result = tokio::select! {
            result = machine.execute(&invocation, input, &mut out) => result,
            _ = tokio::signal::ctrl_c() => Err(ShiftError::Interrupted),
        };
        conclude(&result, &mut out)
    });
    ExitCode::from(code)
}
