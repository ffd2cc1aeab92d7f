//! Output sinks for the filter pipeline.
//!
//! - [`ReportEmitter`]: one tab-separated classification row per evaluated
//!   condition of each selected record
//! - [`RecordEmitter`]: selected records re-rendered as VCF text, preceded
//!   by the header lines (sites only, no sample columns)

use crate::bcf::{Header, InfoValue, Record, ValueType};
use crate::error::Result;
use crate::pipeline::{Emitter, Evaluation};
use std::borrow::Cow;
use std::fmt::Display;
use std::io::Write;

/// CHROM label for a record: the contig name, else the raw index.
fn chrom<'h>(header: &'h Header, record: &Record) -> Cow<'h, str> {
    usize::try_from(record.chrom_id())
        .ok()
        .and_then(|id| header.contig_name(id))
        .map(Cow::Borrowed)
        .unwrap_or_else(|| Cow::Owned(record.chrom_id().to_string()))
}

/// 1-based position.
fn pos(record: &Record) -> i64 {
    i64::from(record.pos()) + 1
}

/// Writes `CHROM POS ID TAG VALUE RESULT` rows.
pub struct ReportEmitter<W: Write> {
    out: W,
}

impl<W: Write> ReportEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Emitter for ReportEmitter<W> {
    fn selected(
        &mut self,
        header: &Header,
        record: &Record,
        evaluations: &[Evaluation<'_>],
    ) -> Result<()> {
        let chrom = chrom(header, record);
        let id = record.id()?;
        for eval in evaluations {
            writeln!(
                self.out,
                "{chrom}\t{}\t{id}\t{}\t{}\t{}",
                pos(record),
                eval.condition.tag,
                eval.value,
                eval.comparison
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Writes selected records as VCF text lines.
pub struct RecordEmitter<W: Write> {
    out: W,
}

impl<W: Write> RecordEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Emitter for RecordEmitter<W> {
    fn begin(&mut self, header: &Header) -> Result<()> {
        for record in header.records() {
            writeln!(self.out, "{record}")?;
        }
        writeln!(self.out, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;
        Ok(())
    }

    fn selected(&mut self, header: &Header, record: &Record, _: &[Evaluation<'_>]) -> Result<()> {
        let line = vcf_line(header, record)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Render the site columns of a record as one VCF line.
pub fn vcf_line(header: &Header, record: &Record) -> Result<String> {
    let alleles = record.alleles()?;
    let reference = alleles.first().copied().unwrap_or(".");
    let alt = if alleles.len() > 1 {
        alleles[1..].join(",")
    } else {
        ".".to_string()
    };
    let qual = record
        .qual()
        .map(|q| q.to_string())
        .unwrap_or_else(|| ".".to_string());

    let filters = record.filter_ids()?;
    let filter = if filters.is_empty() {
        ".".to_string()
    } else {
        filters
            .iter()
            .map(|&id| header.string_id(id).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(";")
    };

    let mut info = Vec::new();
    for field in record.info_fields()? {
        let key = header.string_id(field.key_index).unwrap_or("?");
        let is_flag = header
            .info(key)
            .is_some_and(|decl| decl.value_type == ValueType::Flag);
        let rendered = match field.value {
            _ if is_flag => key.to_string(),
            InfoValue::Empty => key.to_string(),
            InfoValue::Integers(values) => format!("{key}={}", join_optional(&values)),
            InfoValue::Floats(values) => format!("{key}={}", join_optional(&values)),
            InfoValue::Text(text) => format!("{key}={text}"),
        };
        info.push(rendered);
    }
    let info = if info.is_empty() {
        ".".to_string()
    } else {
        info.join(";")
    };

    Ok(format!(
        "{}\t{}\t{}\t{reference}\t{alt}\t{qual}\t{filter}\t{info}",
        chrom(header, record),
        pos(record),
        record.id()?
    ))
}

fn join_optional<T: Display>(values: &[Option<T>]) -> String {
    values
        .iter()
        .map(|v| match v {
            Some(v) => v.to_string(),
            None => ".".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}
