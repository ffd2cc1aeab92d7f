//! # bcf-inspect
//!
//! Streaming inspection of BCF (binary VCF) call sets.
//!
//! ## Overview
//!
//! - **Header dump**: every header record flattened into tab-separated
//!   `(index, key, value, category, sub-key, sub-value)` rows
//! - **Filtering**: records are pulled one at a time, a float INFO tag is
//!   resolved and compared against a threshold with a magnitude-aware
//!   tolerance, and selected records are reported in input order
//! - **Queries**: several conditions combined with `&&` and `||`
//!
//! ## Example
//!
//! ```no_run
//! use bcf_inspect::bcf::Reader;
//! use bcf_inspect::emit::ReportEmitter;
//! use bcf_inspect::pipeline::{FilterPipeline, MultiValuePolicy};
//! use bcf_inspect::query::parse_query;
//!
//! # fn main() -> bcf_inspect::Result<()> {
//! let mut reader = Reader::from_path("calls.bcf")?;
//! let header = reader.read_header()?;
//!
//! let query = parse_query("SAS_AF < 0.001")?;
//! let mut pipeline = FilterPipeline::new(query, MultiValuePolicy::First);
//! let mut emitter = ReportEmitter::new(std::io::stdout());
//! let summary = pipeline.run(&mut reader, &header, &mut emitter)?;
//! eprintln!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod bcf;
pub mod cli;
pub mod compare;
pub mod config;
pub mod emit;
pub mod error;
pub mod header_view;
pub mod pipeline;
pub mod query;
pub mod resolve;

pub use app::{RunReport, run};
pub use compare::{Comparison, approx_cmp};
pub use config::{Config, Mode, OutputTarget};
pub use error::{Error, Result};
pub use pipeline::{Condition, FilterPipeline, FilterSummary, MultiValuePolicy, Query, Selector};
pub use resolve::{FieldResolution, FieldResolver, SkipReason};
