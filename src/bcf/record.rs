//! BCF record decoding.
//!
//! # Format
//!
//! ```text
//! Shared block (little-endian):
//! - 4 bytes: CHROM (contig dictionary index, int32)
//! - 4 bytes: POS (0-based, int32)
//! - 4 bytes: rlen (int32)
//! - 4 bytes: QUAL (float)
//! - 4 bytes: n_allele << 16 | n_info
//! - 4 bytes: n_fmt << 24 | n_sample
//! - typed string: ID
//! - n_allele typed strings: REF, ALT...
//! - typed int vector: FILTER (string dictionary indices)
//! - n_info pairs: typed int key, typed value
//! Per-sample block: FORMAT data (kept raw, not decoded)
//! ```
//!
//! Each typed value starts with a descriptor byte: the low nibble is the
//! type code, the high nibble the element count (15 means the real count
//! follows as a typed integer).
//!
//! The fixed 24-byte prefix is read directly. Everything after it is
//! decoded on first access and cached until the reader refills the record.

use super::header::{Header, ValueType};
use crate::error::{Error, Result};
use std::cell::OnceCell;

/// Length of the fixed prefix of the shared block.
pub const FIXED_LEN: usize = 24;

const INT8_MISSING: i8 = i8::MIN;
const INT8_END: i8 = i8::MIN + 1;
const INT16_MISSING: i16 = i16::MIN;
const INT16_END: i16 = i16::MIN + 1;
const INT32_MISSING: i32 = i32::MIN;
const INT32_END: i32 = i32::MIN + 1;
const FLOAT_MISSING: u32 = 0x7F80_0001;
const FLOAT_END: u32 = 0x7F80_0002;

/// Typed-value type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeCode {
    Missing,
    Int8,
    Int16,
    Int32,
    Float,
    Char,
}

impl TypeCode {
    fn from_nibble(code: u8) -> Option<Self> {
        match code {
            0 => Some(TypeCode::Missing),
            1 => Some(TypeCode::Int8),
            2 => Some(TypeCode::Int16),
            3 => Some(TypeCode::Int32),
            5 => Some(TypeCode::Float),
            7 => Some(TypeCode::Char),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            TypeCode::Missing => 0,
            TypeCode::Int8 | TypeCode::Char => 1,
            TypeCode::Int16 => 2,
            TypeCode::Int32 | TypeCode::Float => 4,
        }
    }

    fn is_int(self) -> bool {
        matches!(self, TypeCode::Int8 | TypeCode::Int16 | TypeCode::Int32)
    }
}

/// Location of one typed value inside the shared block.
#[derive(Debug, Clone, Copy)]
struct TypedSpan {
    code: TypeCode,
    count: usize,
    start: usize,
}

impl TypedSpan {
    fn bytes<'a>(&self, shared: &'a [u8]) -> &'a [u8] {
        &shared[self.start..self.start + self.count * self.code.width()]
    }
}

#[derive(Debug, Clone, Copy)]
struct InfoEntry {
    key: usize,
    value: TypedSpan,
}

/// Offsets of the variable-length fields.
#[derive(Debug, Clone)]
struct Layout {
    id: TypedSpan,
    alleles: Vec<TypedSpan>,
    filters: TypedSpan,
    info: Vec<InfoEntry>,
}

/// Outcome of extracting typed INFO values from a record.
///
/// The integer status convention (`n >= 1` found, `0` or `-1` undeclared,
/// `-2` type clash, `-3` absent) is adapted in exactly one place,
/// [`InfoLookup::from_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoLookup {
    /// `n >= 1` values were written to the caller's buffer
    Found(usize),
    /// The header does not declare the tag as INFO
    NotInHeader,
    /// Header type and requested/stored type disagree
    TypeClash,
    /// Declared, but this record carries no value
    NotInRecord,
}

impl InfoLookup {
    /// Adapt an integer status code. Unknown codes yield `None`.
    pub fn from_status(code: i32) -> Option<Self> {
        match code {
            n if n >= 1 => Some(InfoLookup::Found(n as usize)),
            0 | -1 => Some(InfoLookup::NotInHeader),
            -2 => Some(InfoLookup::TypeClash),
            -3 => Some(InfoLookup::NotInRecord),
            _ => None,
        }
    }

    /// The integer status code for this outcome.
    pub fn status(self) -> i32 {
        match self {
            InfoLookup::Found(n) => i32::try_from(n).unwrap_or(i32::MAX),
            InfoLookup::NotInHeader => -1,
            InfoLookup::TypeClash => -2,
            InfoLookup::NotInRecord => -3,
        }
    }
}

/// Decoded value of one INFO entry.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue<'a> {
    /// No payload (flags, or an explicitly empty value)
    Empty,
    Integers(Vec<Option<i32>>),
    Floats(Vec<Option<f32>>),
    Text(&'a str),
}

/// One INFO entry of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoField<'a> {
    /// String dictionary index of the tag
    pub key_index: usize,
    pub value: InfoValue<'a>,
}

/// A single BCF record.
///
/// Readers fill a caller-owned record in place; anything borrowed from it
/// is invalidated by the next read.
#[derive(Debug, Clone)]
pub struct Record {
    shared: Vec<u8>,
    indiv: Vec<u8>,
    layout: OnceCell<Layout>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// An empty record (contig 0, position 0, no alleles, no INFO).
    pub fn new() -> Self {
        Self {
            shared: vec![0; FIXED_LEN],
            indiv: Vec::new(),
            layout: OnceCell::new(),
        }
    }

    /// Build a record from raw shared and per-sample blocks.
    pub fn from_parts(shared: Vec<u8>, indiv: Vec<u8>) -> Result<Self> {
        if shared.len() < FIXED_LEN {
            return Err(Error::decode(
                shared.len(),
                format!("shared block is {} bytes, need at least {FIXED_LEN}", shared.len()),
            ));
        }
        Ok(Self {
            shared,
            indiv,
            layout: OnceCell::new(),
        })
    }

    /// Hand out the raw buffers for refilling, dropping cached decodes.
    pub(crate) fn buffers_mut(&mut self) -> (&mut Vec<u8>, &mut Vec<u8>) {
        self.layout.take();
        (&mut self.shared, &mut self.indiv)
    }

    pub fn shared(&self) -> &[u8] {
        &self.shared
    }

    pub fn indiv(&self) -> &[u8] {
        &self.indiv
    }

    /// Contig dictionary index (`-1` when unplaced).
    pub fn chrom_id(&self) -> i32 {
        read_i32(&self.shared, 0)
    }

    /// 0-based position.
    pub fn pos(&self) -> i32 {
        read_i32(&self.shared, 4)
    }

    /// Length of the reference allele span.
    pub fn rlen(&self) -> i32 {
        read_i32(&self.shared, 8)
    }

    /// QUAL, or `None` when missing.
    pub fn qual(&self) -> Option<f32> {
        let bits = read_u32(&self.shared, 12);
        (bits != FLOAT_MISSING).then(|| f32::from_bits(bits))
    }

    pub fn n_info(&self) -> usize {
        (read_u32(&self.shared, 16) & 0xFFFF) as usize
    }

    pub fn n_allele(&self) -> usize {
        (read_u32(&self.shared, 16) >> 16) as usize
    }

    pub fn n_sample(&self) -> usize {
        (read_u32(&self.shared, 20) & 0x00FF_FFFF) as usize
    }

    pub fn n_fmt(&self) -> usize {
        (read_u32(&self.shared, 20) >> 24) as usize
    }

    /// Decode the variable-length fields.
    ///
    /// Idempotent within one iteration. Fails when the shared block is
    /// malformed, which callers treat as a fatal decode error.
    pub fn unpack(&self) -> Result<()> {
        self.layout().map(|_| ())
    }

    fn layout(&self) -> Result<&Layout> {
        if let Some(layout) = self.layout.get() {
            return Ok(layout);
        }
        let layout = Layout::decode(&self.shared, self.n_allele(), self.n_info())?;
        Ok(self.layout.get_or_init(|| layout))
    }

    /// The ID column (`.` when missing).
    pub fn id(&self) -> Result<&str> {
        let span = self.layout()?.id;
        let text = decode_text(&self.shared, &span)?;
        Ok(if text.is_empty() { "." } else { text })
    }

    /// REF followed by the ALT alleles.
    pub fn alleles(&self) -> Result<Vec<&str>> {
        self.layout()?
            .alleles
            .iter()
            .map(|span| decode_text(&self.shared, span))
            .collect()
    }

    /// FILTER column as string dictionary indices (empty when missing).
    pub fn filter_ids(&self) -> Result<Vec<usize>> {
        let span = self.layout()?.filters;
        if span.code == TypeCode::Missing {
            return Ok(Vec::new());
        }
        if !span.code.is_int() {
            return Err(Error::decode(span.start, "FILTER vector is not integer-typed"));
        }
        Ok(decode_ints(&self.shared, &span)
            .into_iter()
            .flatten()
            .filter_map(|id| usize::try_from(id).ok())
            .collect())
    }

    /// Extract the float values of INFO `tag` into `buf`.
    ///
    /// `buf` is cleared first and only holds values when the lookup is
    /// [`InfoLookup::Found`]. Vector-end sentinels terminate the list;
    /// missing sentinels become NaN, and a list with nothing but missing
    /// values is reported as [`InfoLookup::NotInRecord`].
    pub fn info_floats(
        &self,
        header: &Header,
        tag: &str,
        buf: &mut Vec<f32>,
    ) -> Result<InfoLookup> {
        let code = self.info_floats_status(header, tag, buf)?;
        InfoLookup::from_status(code)
            .ok_or_else(|| Error::decode(0, format!("INFO/{tag} lookup returned status {code}")))
    }

    /// Fill `buf` and return the integer status for the lookup.
    fn info_floats_status(&self, header: &Header, tag: &str, buf: &mut Vec<f32>) -> Result<i32> {
        buf.clear();

        let Some(decl) = header.info(tag) else {
            return Ok(InfoLookup::NotInHeader.status());
        };
        if decl.value_type != ValueType::Float {
            return Ok(InfoLookup::TypeClash.status());
        }

        let layout = self.layout()?;
        let Some(entry) = layout.info.iter().find(|e| e.key == decl.dict_index) else {
            return Ok(InfoLookup::NotInRecord.status());
        };

        match entry.value.code {
            TypeCode::Float => {}
            TypeCode::Missing => return Ok(InfoLookup::NotInRecord.status()),
            _ => return Ok(InfoLookup::TypeClash.status()),
        }

        let mut present = 0;
        for value in decode_floats(&self.shared, &entry.value) {
            match value {
                Some(v) => {
                    present += 1;
                    buf.push(v);
                }
                None => buf.push(f32::NAN),
            }
        }

        if present == 0 {
            buf.clear();
            return Ok(InfoLookup::NotInRecord.status());
        }
        i32::try_from(buf.len())
            .map_err(|_| Error::decode(entry.value.start, "INFO vector too long"))
    }

    /// Decode every INFO entry in record order.
    pub fn info_fields(&self) -> Result<Vec<InfoField<'_>>> {
        let layout = self.layout()?;
        let mut fields = Vec::with_capacity(layout.info.len());
        for entry in &layout.info {
            let span = &entry.value;
            let value = match span.code {
                TypeCode::Missing => InfoValue::Empty,
                TypeCode::Int8 | TypeCode::Int16 | TypeCode::Int32 => {
                    InfoValue::Integers(decode_ints(&self.shared, span))
                }
                TypeCode::Float => InfoValue::Floats(decode_floats(&self.shared, span)),
                TypeCode::Char => InfoValue::Text(decode_text(&self.shared, span)?),
            };
            fields.push(InfoField {
                key_index: entry.key,
                value,
            });
        }
        Ok(fields)
    }
}

impl Layout {
    fn decode(shared: &[u8], n_allele: usize, n_info: usize) -> Result<Self> {
        let mut cursor = Cursor {
            data: shared,
            pos: FIXED_LEN,
        };

        let id = cursor.typed_span()?;
        let mut alleles = Vec::with_capacity(n_allele);
        for _ in 0..n_allele {
            alleles.push(cursor.typed_span()?);
        }
        let filters = cursor.typed_span()?;

        let mut info = Vec::with_capacity(n_info);
        for _ in 0..n_info {
            let at = cursor.pos;
            let key = cursor.typed_int()?;
            let key = usize::try_from(key)
                .map_err(|_| Error::decode(at, format!("negative INFO key {key}")))?;
            let value = cursor.typed_span()?;
            info.push(InfoEntry { key, value });
        }

        Ok(Layout {
            id,
            alleles,
            filters,
            info,
        })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::decode(
                    self.pos,
                    format!("need {n} bytes, {} left", self.data.len() - self.pos),
                )
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn descriptor(&mut self) -> Result<(TypeCode, usize)> {
        let at = self.pos;
        let byte = self.take(1)?[0];
        let code = TypeCode::from_nibble(byte & 0x0F)
            .ok_or_else(|| Error::decode(at, format!("unknown type code {}", byte & 0x0F)))?;
        Ok((code, (byte >> 4) as usize))
    }

    fn typed_span(&mut self) -> Result<TypedSpan> {
        let (code, mut count) = self.descriptor()?;
        if count == 15 {
            let at = self.pos;
            let long = self.typed_int()?;
            count = usize::try_from(long)
                .map_err(|_| Error::decode(at, format!("negative element count {long}")))?;
        }
        let start = self.pos;
        let len = count
            .checked_mul(code.width())
            .ok_or_else(|| Error::decode(start, "element count overflows"))?;
        self.take(len)?;
        Ok(TypedSpan { code, count, start })
    }

    /// A single typed integer (used for keys and long counts).
    fn typed_int(&mut self) -> Result<i32> {
        let at = self.pos;
        let (code, count) = self.descriptor()?;
        if !code.is_int() || count != 1 {
            return Err(Error::decode(at, "expected a single typed integer"));
        }
        let bytes = self.take(code.width())?;
        Ok(match code {
            TypeCode::Int8 => i32::from(bytes[0] as i8),
            TypeCode::Int16 => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            _ => read_i32(bytes, 0),
        })
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    read_u32(buf, at) as i32
}

fn decode_ints(shared: &[u8], span: &TypedSpan) -> Vec<Option<i32>> {
    let bytes = span.bytes(shared);
    let mut out = Vec::with_capacity(span.count);
    match span.code {
        TypeCode::Int8 => {
            for &b in bytes {
                match b as i8 {
                    INT8_END => break,
                    INT8_MISSING => out.push(None),
                    v => out.push(Some(i32::from(v))),
                }
            }
        }
        TypeCode::Int16 => {
            for chunk in bytes.chunks_exact(2) {
                match i16::from_le_bytes([chunk[0], chunk[1]]) {
                    INT16_END => break,
                    INT16_MISSING => out.push(None),
                    v => out.push(Some(i32::from(v))),
                }
            }
        }
        TypeCode::Int32 => {
            for chunk in bytes.chunks_exact(4) {
                match read_i32(chunk, 0) {
                    INT32_END => break,
                    INT32_MISSING => out.push(None),
                    v => out.push(Some(v)),
                }
            }
        }
        _ => {}
    }
    out
}

fn decode_floats(shared: &[u8], span: &TypedSpan) -> Vec<Option<f32>> {
    let mut out = Vec::with_capacity(span.count);
    for chunk in span.bytes(shared).chunks_exact(4) {
        match read_u32(chunk, 0) {
            FLOAT_END => break,
            FLOAT_MISSING => out.push(None),
            bits => out.push(Some(f32::from_bits(bits))),
        }
    }
    out
}

fn decode_text<'a>(shared: &'a [u8], span: &TypedSpan) -> Result<&'a str> {
    match span.code {
        TypeCode::Missing => Ok(""),
        TypeCode::Char => {
            let bytes = span.bytes(shared);
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::decode(span.start, "string field is not UTF-8"))?;
            Ok(text.trim_end_matches('\0'))
        }
        _ => Err(Error::decode(span.start, "expected a character string")),
    }
}
