use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use gerador::config::{self, Cli, RunContext};
use gerador::process;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = RunContext::from_entropy();
    let config = match config::resolve(cli, &mut ctx) {
        Ok(config) => config,
        Err(err) => {
            // Bad configuration behaves like a missing flag: diagnostic plus
            // usage, non-zero exit, nothing runs.
            eprintln!("gerador: {err}\n");
            let _ = Cli::command().print_help();
            return ExitCode::from(2);
        }
    };

    match process::run(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gerador: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "gerador=debug" } else { "gerador=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
