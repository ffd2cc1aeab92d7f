//! End-to-end runs over BGZF fixtures: library entry point and binary.

mod common;

use bcf_inspect::config::FilterSettings;
use bcf_inspect::{Config, Mode, OutputTarget, RunReport, Selector};
use common::{AF, DP, SAS_AF, Site, fixture};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn calls(dir: &Path) -> std::path::PathBuf {
    fixture(
        dir,
        "calls.bcf",
        vec![
            Site::new(100, "rs1").float(SAS_AF, 0.0005).build(),
            Site::new(200, "rs2").int(DP, 30).float(AF, 0.7).build(),
            Site::new(300, "rs3").float(SAS_AF, 0.01).build(),
        ],
    )
}

fn run_to_file(dir: &Path, mut config: Config) -> (RunReport, String) {
    let out = dir.join("out").join("result.tsv");
    config.output = OutputTarget::File(out.clone());
    let report = bcf_inspect::run(&config).unwrap();
    (report, fs::read_to_string(out).unwrap())
}

#[test]
fn test_header_dump() {
    let dir = TempDir::new().unwrap();
    let input = calls(dir.path());
    let (report, text) = run_to_file(dir.path(), Config::new(Mode::Header, input));

    assert_eq!(report, RunReport::Header { rows: 17 });
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "0\tfileformat\tVCFv4.2\tGENERIC\tNaN\tNaN");
    assert_eq!(lines[1], "1\tFILTER\tNaN\tFILTER\tID\tPASS");
    assert!(lines.contains(&"5\tcontig\tNaN\tCONTIG\tlength\t248956422"));
}

#[test]
fn test_filter_sas_af() {
    let dir = TempDir::new().unwrap();
    let input = calls(dir.path());
    let (report, text) = run_to_file(dir.path(), Config::new(Mode::Filter, input));

    assert_eq!(
        text,
        "chr1\t100\trs1\tSAS_AF\t0.0005\tless\n\
         chr1\t300\trs3\tSAS_AF\t0.01\tgreater\n"
    );
    match report {
        RunReport::Filter { summary, .. } => {
            assert_eq!(summary.records, 3);
            assert_eq!(summary.selected, 2);
            assert_eq!(summary.absent, 1);
        }
        other => panic!("Expected Filter report, got {other:?}"),
    }
}

#[test]
fn test_filter_selector_and_emit() {
    let dir = TempDir::new().unwrap();
    let input = calls(dir.path());
    let mut config = Config::new(Mode::Filter, input);
    config.filter = FilterSettings {
        selector: Selector::Lt,
        ..FilterSettings::default()
    };
    config.emit_records = true;
    let (_, text) = run_to_file(dir.path(), config);

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "##fileformat=VCFv4.2");
    assert_eq!(lines[6], "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
    assert_eq!(lines[7], "chr1\t100\trs1\tA\tG\t.\tPASS\tSAS_AF=0.0005");
    assert_eq!(lines.len(), 8);
}

#[test]
fn test_parse_query() {
    let dir = TempDir::new().unwrap();
    let input = calls(dir.path());
    let mut config = Config::new(Mode::Parse, input);
    config.query = Some("SAS_AF < 0.001 || INFO/AF > 0.5".to_string());
    let (report, text) = run_to_file(dir.path(), config);

    assert_eq!(
        text,
        "chr1\t100\trs1\tSAS_AF\t0.0005\tless\n\
         chr1\t200\trs2\tAF\t0.7\tgreater\n"
    );
    match report {
        RunReport::Filter { query, summary } => {
            assert_eq!(query, "SAS_AF < 0.001 || AF > 0.5");
            assert_eq!(summary.selected, 2);
            assert_eq!(summary.rejected, 1);
        }
        other => panic!("Expected Filter report, got {other:?}"),
    }
}

#[test]
fn test_header_only_file() {
    let dir = TempDir::new().unwrap();
    let input = fixture(dir.path(), "empty.bcf", vec![]);
    let (report, text) = run_to_file(dir.path(), Config::new(Mode::Filter, input));

    assert!(text.is_empty());
    match report {
        RunReport::Filter { summary, .. } => assert_eq!(summary.records, 0),
        other => panic!("Expected Filter report, got {other:?}"),
    }
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bcf-inspect"))
}

#[test]
fn test_binary_exit_codes() {
    let dir = TempDir::new().unwrap();
    let input = calls(dir.path());
    let missing = dir.path().join("missing.bcf");

    let input = input.to_str().unwrap();
    let missing = missing.to_str().unwrap();
    let status = |args: &[&str]| bin().args(args).output().unwrap().status.code();

    assert_eq!(status(&["header", input]), Some(0));
    assert_eq!(status(&["--help"]), Some(0));
    assert_eq!(status(&[]), Some(1));
    assert_eq!(status(&["header"]), Some(1));
    assert_eq!(status(&["bogus", input]), Some(1));
    assert_eq!(status(&["parse", input]), Some(1));
    assert_eq!(status(&["parse", input, "-q", "AF <"]), Some(1));
    assert_eq!(status(&["header", missing]), Some(2));
}

#[test]
fn test_binary_verbose_echo() {
    let dir = TempDir::new().unwrap();
    let input = fixture(dir.path(), "empty.bcf", vec![]);
    let output = bin().arg("-v").arg("filter").arg(&input).output().unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parsed Arguments:"));
    assert!(stderr.contains("subcommand = filter"));
}
