pub mod assemble;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod document;
pub mod error;
pub mod inference;
pub mod ir;
pub mod lower;
pub mod trace;

use std::process::ExitCode;

use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::TraceFlags;
use crate::error::Error;

/// Every failure exits with the same code; the message prefix tells them apart.
const FAILURE: u8 = 255;

/// Log to stderr. `RUST_LOG` overrides the default filter, which is raised to
/// debug when the debug diagnostic channel is selected.
fn init_logging(flags: TraceFlags) {
    let default = if flags.contains(TraceFlags::DEBUG) { "plist2config=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report(error: &anyhow::Error) {
    let internal = error.downcast_ref::<Error>().is_some_and(Error::is_internal);
    let label = if internal { "INTERNAL_ERROR:" } else { "ERROR:" };
    eprintln!("{} {error:#}", label.red().bold());
}

fn main() -> ExitCode {
    let result = cli::CommandLineInterface::load().and_then(|command_line_interface| {
        init_logging(command_line_interface.trace_flags());
        command_line_interface.run()
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::from(FAILURE)
        }
    }
}
