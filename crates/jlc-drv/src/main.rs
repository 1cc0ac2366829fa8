use std::process::ExitCode;

use clap::Parser;
use jlc_drv::{Cli, DriverError};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match compile(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

fn compile(cli: &Cli) -> anyhow::Result<()> {
    jlc_drv::run(cli)?;
    Ok(())
}

/// Maps the driver's own error categories to their promised exit code;
/// anything else (none expected, but anyhow makes the boundary honest)
/// falls back to a generic failure.
fn report(err: anyhow::Error) -> ExitCode {
    match err.downcast_ref::<DriverError>() {
        Some(driver_err) => {
            match driver_err.diagnostic() {
                Some(line) => eprintln!("{line}"),
                None => eprintln!("error: {driver_err}"),
            }
            ExitCode::from(driver_err.exit_code().as_i32() as u8)
        }
        None => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = if verbose > 0 { "jlc_drv=debug" } else { "jlc_drv=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).without_time().with_target(false).init();
}
