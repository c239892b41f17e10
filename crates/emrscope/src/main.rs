mod cli;
mod commands;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises our crates only and `-vvv`
/// opens up the AWS SDK as well.
fn init_tracing(global: &GlobalOpts) {
    let directives = log_directives(global.verbose, global.quiet);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_directives(verbose: u8, quiet: bool) -> String {
    let ours = match (quiet, verbose) {
        (true, _) => return "error".into(),
        (false, 0) => return "warn".into(),
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => return "trace".into(),
    };
    ["emrscope", "emrscope_core", "emrscope_aws", "emrscope_config"]
        .iter()
        .fold("warn".to_owned(), |acc, krate| format!("{acc},{krate}={ours}"))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "emrscope", &mut std::io::stdout());
            Ok(())
        }
        cmd => {
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cli.global).await
        }
    }
}
