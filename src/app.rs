//! Top-level dispatch: open the input, run the selected mode, report.

use crate::bcf::{Header, Reader};
use crate::config::{Config, Mode, OutputTarget};
use crate::emit::{RecordEmitter, ReportEmitter};
use crate::error::{Error, Result};
use crate::header_view;
use crate::pipeline::{FilterPipeline, FilterSummary, Query};
use crate::query::parse_query;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    /// Rows written by the header dump
    Header { rows: usize },
    /// Counts from a filter run
    Filter { query: String, summary: FilterSummary },
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Header { rows } => write!(f, "{rows} header rows"),
            RunReport::Filter { query, summary } => write!(f, "[{query}] {summary}"),
        }
    }
}

/// Execute one run as described by `config`.
pub fn run(config: &Config) -> Result<RunReport> {
    // Parse before touching the file so bad queries are usage errors.
    let query = match config.mode {
        Mode::Header => None,
        Mode::Filter => Some(config.filter.query()),
        Mode::Parse => {
            let text = config.query.as_deref().ok_or(Error::MissingQuery)?;
            Some(parse_query(text)?)
        }
    };

    if config.print_header {
        log::debug!("--print-header has no effect");
    }
    if config.pass_only {
        log::debug!("--pass has no effect");
    }

    let mut reader = Reader::from_path(&config.input)?;
    log::debug!(
        "opened {} ({})",
        config.input.display(),
        if reader.is_compressed() { "BGZF" } else { "uncompressed" }
    );
    let header = reader.read_header()?;
    let mut out = open_output(&config.output)?;

    let report = match query {
        None => {
            let rows = header_view::write_dump(&header, &mut out)?;
            RunReport::Header { rows }
        }
        Some(query) => filter(config, query, &mut reader, &header, &mut out)?,
    };

    log::info!("{report}");
    Ok(report)
}

fn filter<R: Read, W: Write>(
    config: &Config,
    query: Query,
    reader: &mut Reader<R>,
    header: &Header,
    out: &mut W,
) -> Result<RunReport> {
    let text = query.to_string();
    log::debug!("query: {text} (multi-value policy {:?})", config.policy);

    let mut pipeline = FilterPipeline::new(query, config.policy);
    let summary = if config.emit_records {
        pipeline.run(reader, header, &mut RecordEmitter::new(out))?
    } else {
        pipeline.run(reader, header, &mut ReportEmitter::new(out))?
    };

    Ok(RunReport::Filter {
        query: text,
        summary,
    })
}

fn open_output(target: &OutputTarget) -> Result<Box<dyn Write>> {
    Ok(match target {
        OutputTarget::Stdout => Box::new(BufWriter::new(io::stdout().lock())),
        OutputTarget::File(path) => {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            Box::new(BufWriter::new(File::create(path)?))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_bad_query_is_reported_before_open() {
        let mut config = Config::new(Mode::Parse, "/nonexistent/calls.bcf");
        config.query = Some("AF <".to_string());
        let err = run(&config).unwrap_err();
        assert!(matches!(err, Error::Query { .. }), "{err:?}");
    }

    #[test]
    fn test_missing_file_is_runtime_error() {
        let config = Config::new(Mode::Header, PathBuf::from("/nonexistent/calls.bcf"));
        let err = run(&config).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_usage());
    }

    #[test]
    fn test_report_display() {
        let report = RunReport::Filter {
            query: "SAS_AF ? 0.001".to_string(),
            summary: FilterSummary {
                records: 2,
                selected: 1,
                absent: 1,
                ..FilterSummary::default()
            },
        };
        assert_eq!(
            report.to_string(),
            "[SAS_AF ? 0.001] 2 records: 1 selected, 0 rejected, 1 skipped"
        );
        assert_eq!(RunReport::Header { rows: 4 }.to_string(), "4 header rows");
    }
}
