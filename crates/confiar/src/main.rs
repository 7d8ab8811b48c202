//! confiar: self-signed TLS certificates made easy.
//!
//! ```bash
//! # on the host that owns the certificate
//! confiar generate --fqdn registry.example.com --ip 10.11.12.13
//! confiar serve
//!
//! # on every host that should trust it
//! confiar install --target docker --from http://10.11.12.13:8787
//! ```

mod cli;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use confiar_core::ErrorCategory;

use crate::cli::{
    Cli,
    CliHandler,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.as_deref(), cli.logs_to_file.as_deref()) {
        eprintln!("Error: failed to initialize logging: {e}");
        return ExitCode::from(EXIT_FAILURE);
    }

    match CliHandler::new(cli).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<confiar_core::Error>().map(|e| e.category()) {
        Some(ErrorCategory::InvalidInput) => EXIT_INVALID_INPUT,
        _ => EXIT_FAILURE,
    }
}
