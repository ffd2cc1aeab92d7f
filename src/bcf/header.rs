//! BCF header parsing.
//!
//! A BCF header is plain VCF header text stored after the magic bytes:
//!
//! ```text
//! ##fileformat=VCFv4.2
//! ##FILTER=<ID=PASS,Description="All filters passed",IDX=0>
//! ##INFO=<ID=SAS_AF,Number=A,Type=Float,Description="...",IDX=1>
//! ##contig=<ID=chr1,length=248956422,IDX=0>
//! #CHROM  POS  ID  REF  ALT  QUAL  FILTER  INFO  [FORMAT  SAMPLE...]
//! ```
//!
//! Every `##` line becomes one [`HeaderRecord`]. Records refer to FILTER,
//! INFO and FORMAT ids through a shared string dictionary and to contigs
//! through a separate contig dictionary; both are built here.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Category of a header record, fixed when the record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderCategory {
    Filter,
    Info,
    Format,
    Contig,
    /// `##key=<...>` lines with any other key
    Structured,
    /// `##key=value` lines
    Generic,
}

impl HeaderCategory {
    /// Label used when printing header records.
    pub fn label(self) -> &'static str {
        match self {
            HeaderCategory::Filter => "FILTER",
            HeaderCategory::Info => "INFO",
            HeaderCategory::Format => "FORMAT",
            HeaderCategory::Contig => "CONTIG",
            HeaderCategory::Structured => "STRUCTURED",
            HeaderCategory::Generic => "GENERIC",
        }
    }

    fn of_structured(key: &str) -> Self {
        match key {
            "FILTER" => HeaderCategory::Filter,
            "INFO" => HeaderCategory::Info,
            "FORMAT" => HeaderCategory::Format,
            "contig" => HeaderCategory::Contig,
            _ => HeaderCategory::Structured,
        }
    }

    /// FILTER, INFO and FORMAT ids share the string dictionary.
    fn in_string_dictionary(self) -> bool {
        matches!(
            self,
            HeaderCategory::Filter | HeaderCategory::Info | HeaderCategory::Format
        )
    }
}

impl fmt::Display for HeaderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One `##` line of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    category: HeaderCategory,
    key: String,
    value: Option<String>,
    attributes: Vec<(String, String)>,
}

impl HeaderRecord {
    /// Create a header record.
    ///
    /// `value` is the text after `=` for generic lines and `None` for
    /// structured lines, whose content lives in `attributes`.
    pub fn new(
        category: HeaderCategory,
        key: impl Into<String>,
        value: Option<String>,
        attributes: Vec<(String, String)>,
    ) -> Self {
        Self {
            category,
            key: key.into(),
            value,
            attributes,
        }
    }

    pub fn category(&self) -> HeaderCategory {
        self.category
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Ordered sub-key/value pairs of a structured record.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up a sub-key, first occurrence wins.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `ID` sub-key, if any.
    pub fn id(&self) -> Option<&str> {
        self.attribute("ID")
    }
}

impl fmt::Display for HeaderRecord {
    /// Render as a `##` header line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "##{}=", self.key)?;
        if self.attributes.is_empty() {
            return f.write_str(self.value.as_deref().unwrap_or(""));
        }
        f.write_str("<")?;
        for (i, (k, v)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str(">")
    }
}

/// Value type declared by the `Type=` attribute of INFO/FORMAT lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    Float,
    Flag,
    String,
    Character,
}

impl ValueType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Integer" => Some(ValueType::Integer),
            "Float" => Some(ValueType::Float),
            "Flag" => Some(ValueType::Flag),
            "String" => Some(ValueType::String),
            "Character" => Some(ValueType::Character),
            _ => None,
        }
    }
}

/// A typed INFO declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDecl {
    pub id: String,
    pub value_type: ValueType,
    /// Raw `Number=` attribute (`1`, `A`, `R`, `G`, `.`, ...)
    pub number: String,
    /// Position in the string dictionary; records store this, not the id
    pub dict_index: usize,
}

/// Decoded BCF header.
#[derive(Debug, Clone, Default)]
pub struct Header {
    records: Vec<HeaderRecord>,
    samples: Vec<String>,
    strings: Vec<Option<String>>,
    string_index: HashMap<String, usize>,
    contigs: Vec<Option<String>>,
    contig_index: HashMap<String, usize>,
    info: HashMap<String, InfoDecl>,
}

impl Header {
    /// Parse VCF header text.
    ///
    /// Text after the first NUL byte is ignored, matching the padding BCF
    /// writers leave at the end of `l_text`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.split('\0').next().unwrap_or("");
        let mut records = Vec::new();
        let mut samples = Vec::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if let Some(meta) = line.strip_prefix("##") {
                let record = parse_meta_line(meta).map_err(|msg| Error::InvalidHeader {
                    line: line_num + 1,
                    msg,
                })?;
                records.push(record);
            } else if line.starts_with("#CHROM") {
                samples = line.split('\t').skip(9).map(str::to_string).collect();
            } else {
                return Err(Error::InvalidHeader {
                    line: line_num + 1,
                    msg: "expected a '##' meta line or the '#CHROM' line".to_string(),
                });
            }
        }

        Self::from_records(records, samples)
    }

    /// Build a header from already-parsed records.
    ///
    /// Errors carry the 1-based ordinal of the offending record.
    pub fn from_records(records: Vec<HeaderRecord>, samples: Vec<String>) -> Result<Self> {
        let mut header = Header {
            samples,
            ..Header::default()
        };

        let explicit_idx = records
            .iter()
            .any(|r| r.category.in_string_dictionary() && r.attribute("IDX").is_some());
        if !explicit_idx {
            header.strings.push(Some("PASS".to_string()));
            header.string_index.insert("PASS".to_string(), 0);
        }

        let limit = records.len().max(MIN_IDX_LIMIT);
        for (ordinal, record) in records.iter().enumerate() {
            let invalid = |msg: String| Error::InvalidHeader {
                line: ordinal + 1,
                msg,
            };

            let is_dict = record.category.in_string_dictionary();
            if !is_dict && record.category != HeaderCategory::Contig {
                continue;
            }

            let Some(id) = record.id() else {
                log::warn!(
                    "header record {} ({}) has no ID; not indexed",
                    ordinal + 1,
                    record.key
                );
                continue;
            };
            let idx = match record.attribute("IDX") {
                Some(raw) => Some(
                    raw.parse::<usize>()
                        .map_err(|_| invalid(format!("invalid IDX '{raw}'")))?,
                ),
                None => None,
            };

            let assigned = if is_dict {
                assign(&mut header.strings, &mut header.string_index, id, idx, limit)
            } else {
                assign(&mut header.contigs, &mut header.contig_index, id, idx, limit)
            };
            let dict_index = assigned.map_err(invalid)?;

            if record.category == HeaderCategory::Info && !header.info.contains_key(id) {
                let raw_type = record
                    .attribute("Type")
                    .ok_or_else(|| invalid(format!("INFO/{id} without Type")))?;
                let value_type = ValueType::parse(raw_type)
                    .ok_or_else(|| invalid(format!("INFO/{id} has unknown Type '{raw_type}'")))?;
                header.info.insert(
                    id.to_string(),
                    InfoDecl {
                        id: id.to_string(),
                        value_type,
                        number: record.attribute("Number").unwrap_or(".").to_string(),
                        dict_index,
                    },
                );
            }
        }

        header.records = records;
        Ok(header)
    }

    /// Header records in file order.
    pub fn records(&self) -> &[HeaderRecord] {
        &self.records
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// The INFO declaration for `tag`, if the header declares one.
    pub fn info(&self, tag: &str) -> Option<&InfoDecl> {
        self.info.get(tag)
    }

    /// Id stored at `index` in the string dictionary.
    pub fn string_id(&self, index: usize) -> Option<&str> {
        self.strings.get(index).and_then(|s| s.as_deref())
    }

    /// Contig name for a record's CHROM index.
    pub fn contig_name(&self, index: usize) -> Option<&str> {
        self.contigs.get(index).and_then(|s| s.as_deref())
    }

    /// Number of contig dictionary slots.
    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }
}

/// Smallest IDX bound; headers with more records than this may go as high
/// as their record count.
const MIN_IDX_LIMIT: usize = 1 << 16;

/// Place `id` in a dictionary, at `idx` when the header pins it there.
///
/// Explicit positions must be below `limit`.
fn assign(
    slots: &mut Vec<Option<String>>,
    index: &mut HashMap<String, usize>,
    id: &str,
    idx: Option<usize>,
    limit: usize,
) -> std::result::Result<usize, String> {
    if let Some(&existing) = index.get(id) {
        return match idx {
            Some(idx) if idx != existing => {
                Err(format!("ID {id} given IDX {idx} but already has IDX {existing}"))
            }
            _ => Ok(existing),
        };
    }

    let idx = idx.unwrap_or(slots.len());
    if idx >= limit {
        return Err(format!("IDX {idx} for {id} is out of range (limit {limit})"));
    }
    if slots.len() <= idx {
        slots.resize(idx + 1, None);
    }
    if let Some(other) = &slots[idx] {
        return Err(format!("IDX {idx} used by both {other} and {id}"));
    }
    slots[idx] = Some(id.to_string());
    index.insert(id.to_string(), idx);
    Ok(idx)
}

/// Parse the text after `##`.
fn parse_meta_line(meta: &str) -> std::result::Result<HeaderRecord, String> {
    let (key, rest) = meta
        .split_once('=')
        .ok_or_else(|| "meta line without '='".to_string())?;
    if key.is_empty() {
        return Err("meta line with empty key".to_string());
    }

    match rest.strip_prefix('<') {
        Some(body) => {
            let body = body
                .strip_suffix('>')
                .ok_or_else(|| format!("{key} line missing closing '>'"))?;
            let attributes = parse_attributes(body)?;
            Ok(HeaderRecord::new(
                HeaderCategory::of_structured(key),
                key,
                None,
                attributes,
            ))
        }
        None => Ok(HeaderRecord::new(
            HeaderCategory::Generic,
            key,
            Some(rest.to_string()),
            Vec::new(),
        )),
    }
}

/// Split `ID=AF,Number=A,Description="a, b"` into pairs.
///
/// Commas inside double quotes do not separate pairs; quotes are kept in
/// the value.
fn parse_attributes(body: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;
    let mut escaped = false;

    for c in body.chars() {
        if in_value {
            if escaped {
                escaped = false;
                value.push(c);
                continue;
            }
            match c {
                '\\' if in_quotes => {
                    escaped = true;
                    value.push(c);
                }
                '"' => {
                    in_quotes = !in_quotes;
                    value.push(c);
                }
                ',' if !in_quotes => {
                    pairs.push((std::mem::take(&mut key), std::mem::take(&mut value)));
                    in_value = false;
                }
                _ => value.push(c),
            }
        } else {
            match c {
                '=' => {
                    if key.is_empty() {
                        return Err("attribute with empty key".to_string());
                    }
                    in_value = true;
                }
                ',' => return Err(format!("attribute '{key}' without value")),
                _ => key.push(c),
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if in_value {
        pairs.push((key, value));
    } else if !key.is_empty() {
        return Err(format!("attribute '{key}' without value"));
    }

    Ok(pairs)
}
