//! BCF (binary variant call format) decoding.
//!
//! Covers what the inspection and filter modes need:
//! - Header text parsing into ordered header records and dictionaries
//! - Streaming record reads into a reused buffer
//! - Lazy decoding of ID, alleles, FILTER and typed INFO values
//!
//! Per-sample FORMAT data is carried as raw bytes and never decoded.

pub mod header;
pub mod reader;
pub mod record;

pub use header::{Header, HeaderCategory, HeaderRecord, InfoDecl, ValueType};
pub use reader::{Reader, RecordSource, Records};
pub use record::{InfoField, InfoLookup, InfoValue, Record};
