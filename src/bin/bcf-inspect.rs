//! Command-line entry point.
//!
//! Usage:
//!   bcf-inspect header calls.bcf
//!   bcf-inspect filter calls.bcf --tag SAS_AF --threshold 0.001 --select lt
//!   bcf-inspect parse calls.bcf -q 'AF >= 0.5 && DP > 10' -o selected.tsv
//!
//! Exit status is 0 on success, 1 for argument errors and 2 when the input
//! cannot be read or decoded.

use bcf_inspect::cli::Cli;
use clap::Parser;
use clap::error::ErrorKind;
use std::process;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if config.verbose {
        eprint!("{}", config.summary());
    }

    if let Err(e) = bcf_inspect::run(&config) {
        eprintln!("Error: {e}");
        process::exit(if e.is_usage() { 1 } else { 2 });
    }
}
