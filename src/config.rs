//! Run configuration, built once from the command line.

use crate::pipeline::{Condition, MultiValuePolicy, Query, Selector};
use std::fmt;
use std::path::PathBuf;

/// Tag filtered on when none is given.
pub const DEFAULT_TAG: &str = "SAS_AF";
/// Threshold compared against when none is given.
pub const DEFAULT_THRESHOLD: f64 = 0.001;

/// What the run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Print every header record as tab-separated rows
    Header,
    /// Classify records on one INFO tag against a threshold
    Filter,
    /// Filter records with a query expression (-q)
    Parse,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Header => "header",
            Mode::Filter => "filter",
            Mode::Parse => "parse",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where emitted rows go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("-"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Filter settings used by the `filter` mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    pub tag: String,
    pub threshold: f64,
    pub selector: Selector,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            threshold: DEFAULT_THRESHOLD,
            selector: Selector::Any,
        }
    }
}

impl FilterSettings {
    pub fn query(&self) -> Query {
        Query::single(Condition::new(self.tag.clone(), self.selector, self.threshold))
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub input: PathBuf,
    pub output: OutputTarget,
    pub verbose: bool,
    /// Accepted but not used by any mode
    pub print_header: bool,
    // TODO: restrict emitted records to those whose FILTER column is PASS
    pub pass_only: bool,
    pub query: Option<String>,
    pub filter: FilterSettings,
    pub policy: MultiValuePolicy,
    /// Re-render selected records instead of the classification report
    pub emit_records: bool,
}

impl Config {
    /// A config with defaults for everything but mode and input.
    pub fn new(mode: Mode, input: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            input: input.into(),
            output: OutputTarget::Stdout,
            verbose: false,
            print_header: false,
            pass_only: false,
            query: None,
            filter: FilterSettings::default(),
            policy: MultiValuePolicy::default(),
            emit_records: false,
        }
    }

    /// The verbose echo of parsed arguments.
    pub fn summary(&self) -> String {
        format!(
            "Parsed Arguments:\n\
             output = {}\n\
             bcf_file = {}\n\
             subcommand = {}\n\
             verbose = {}\n",
            self.output,
            self.input.display(),
            self.mode,
            if self.verbose { "yes" } else { "no" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(Mode::Filter, "calls.bcf");
        assert_eq!(config.output, OutputTarget::Stdout);
        assert_eq!(config.filter.tag, "SAS_AF");
        assert_eq!(config.filter.threshold, 0.001);
        assert_eq!(config.policy, MultiValuePolicy::First);
        assert!(!config.emit_records);
    }

    #[test]
    fn test_filter_query() {
        let settings = FilterSettings {
            tag: "AF".to_string(),
            threshold: 0.5,
            selector: Selector::Ge,
        };
        assert_eq!(settings.query().to_string(), "AF >= 0.5");
    }

    #[test]
    fn test_summary() {
        let mut config = Config::new(Mode::Header, "in.bcf");
        config.output = OutputTarget::File(PathBuf::from("out.tsv"));
        config.verbose = true;
        assert_eq!(
            config.summary(),
            "Parsed Arguments:\n\
             output = out.tsv\n\
             bcf_file = in.bcf\n\
             subcommand = header\n\
             verbose = yes\n"
        );
    }
}
