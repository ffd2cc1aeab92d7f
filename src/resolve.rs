//! Typed resolution of a named INFO tag against a header and record.
//!
//! Every lookup ends in exactly one [`FieldResolution`]. The three failure
//! outcomes are per-record states, not errors: a filter run keeps going
//! after any of them. Only undecodable record bytes produce `Err`.

use crate::bcf::{Header, InfoLookup, Record};
use crate::error::Result;
use std::fmt;

/// Why a record has no usable value for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The header has no INFO declaration for the tag
    NotDeclaredInHeader,
    /// The declared or stored type is not Float
    TypeMismatch,
    /// Declared, but this record carries no value
    AbsentInRecord,
}

impl SkipReason {
    pub const ALL: [SkipReason; 3] = [
        SkipReason::NotDeclaredInHeader,
        SkipReason::TypeMismatch,
        SkipReason::AbsentInRecord,
    ];

    /// Diagnostic line for this reason.
    pub fn message(self) -> &'static str {
        match self {
            SkipReason::NotDeclaredInHeader => "no such INFO tag defined in the header",
            SkipReason::TypeMismatch => {
                "clash between types defined in the header and encountered in the BCF record"
            }
            SkipReason::AbsentInRecord => "tag is not present in the BCF record",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One or more values of a tag on the current record. Never empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldValues<'a> {
    values: &'a [f32],
}

impl<'a> FieldValues<'a> {
    fn new(values: &'a [f32]) -> Option<Self> {
        (!values.is_empty()).then_some(Self { values })
    }

    pub fn first(&self) -> f32 {
        self.values[0]
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }
}

/// Outcome of resolving a tag against a (header, record) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldResolution<'a> {
    NotDeclaredInHeader,
    TypeMismatch,
    AbsentInRecord,
    Values(FieldValues<'a>),
}

impl FieldResolution<'_> {
    /// The skip reason, or `None` when values were found.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            FieldResolution::NotDeclaredInHeader => Some(SkipReason::NotDeclaredInHeader),
            FieldResolution::TypeMismatch => Some(SkipReason::TypeMismatch),
            FieldResolution::AbsentInRecord => Some(SkipReason::AbsentInRecord),
            FieldResolution::Values(_) => None,
        }
    }
}

/// Resolves one tag, record after record, through a reused value buffer.
///
/// The buffer is cleared on every call, so values borrowed from a previous
/// resolution cannot outlive the next one and memory does not grow with
/// the number of records.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    tag: String,
    buffer: Vec<f32>,
}

impl FieldResolver {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            buffer: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Resolve the tag against `record`.
    pub fn resolve(&mut self, header: &Header, record: &Record) -> Result<FieldResolution<'_>> {
        if header.info(&self.tag).is_none() {
            self.buffer.clear();
            return Ok(FieldResolution::NotDeclaredInHeader);
        }

        let lookup = record.info_floats(header, &self.tag, &mut self.buffer)?;
        log::trace!("INFO/{} lookup status {}", self.tag, lookup.status());

        Ok(match lookup {
            InfoLookup::NotInHeader => FieldResolution::NotDeclaredInHeader,
            InfoLookup::TypeClash => FieldResolution::TypeMismatch,
            InfoLookup::NotInRecord => FieldResolution::AbsentInRecord,
            InfoLookup::Found(n) => match FieldValues::new(self.buffer.get(..n).unwrap_or(&[])) {
                Some(values) => FieldResolution::Values(values),
                None => FieldResolution::AbsentInRecord,
            },
        })
    }
}
