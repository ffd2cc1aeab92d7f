//! Command-line surface.

use crate::config::{Config, FilterSettings, Mode, OutputTarget};
use crate::error::{Error, Result};
use crate::pipeline::{MultiValuePolicy, Selector};
use clap::Parser;
use std::path::PathBuf;

/// Inspect BCF headers and filter variant records on numeric INFO tags.
#[derive(Parser, Debug)]
#[command(name = "bcf-inspect", version)]
pub struct Cli {
    /// What to do with the file
    #[arg(value_name = "SUBCOMMAND", value_enum)]
    pub mode: Mode,

    /// BCF file to read (plain or BGZF-compressed)
    #[arg(value_name = "BCF_FILE")]
    pub bcf_file: Option<PathBuf>,

    /// Echo the parsed arguments and log progress
    #[arg(short, long)]
    pub verbose: bool,

    /// File to write to (default stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Print the header and exit (reserved)
    #[arg(short = 'H', long)]
    pub print_header: bool,

    /// Consider only records passing filter (reserved)
    #[arg(short = 'P', long)]
    pub pass: bool,

    /// Query expression for the parse subcommand, e.g. "SAS_AF < 0.001"
    #[arg(short, long, value_name = "QUERY")]
    pub query: Option<String>,

    /// INFO tag used by the filter subcommand
    #[arg(long, default_value = crate::config::DEFAULT_TAG)]
    pub tag: String,

    /// Threshold used by the filter subcommand
    #[arg(long, default_value_t = crate::config::DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Which comparison results select a record
    #[arg(long, value_enum, default_value_t = Selector::Any)]
    pub select: Selector,

    /// How tags with several values are judged
    #[arg(long, value_enum, default_value_t = MultiValuePolicy::First)]
    pub multi: MultiValuePolicy,

    /// Write selected records as VCF text instead of the classification report
    #[arg(long)]
    pub emit: bool,
}

impl Cli {
    /// Validate and freeze into a [`Config`].
    pub fn into_config(self) -> Result<Config> {
        let input = self.bcf_file.ok_or(Error::MissingInput)?;
        if self.mode == Mode::Parse && self.query.is_none() {
            return Err(Error::MissingQuery);
        }

        Ok(Config {
            mode: self.mode,
            input,
            output: self.output.map_or(OutputTarget::Stdout, OutputTarget::File),
            verbose: self.verbose,
            print_header: self.print_header,
            pass_only: self.pass,
            query: self.query,
            filter: FilterSettings {
                tag: self.tag,
                threshold: self.threshold,
                selector: self.select,
            },
            policy: self.multi,
            emit_records: self.emit,
        })
    }
}
