//! Tabular projection of header records.
//!
//! Each header record yields one row per sub-key, or a single row with
//! placeholders when it has none:
//!
//! ```text
//! index  key  value  category  sub-key  sub-value
//! 0      fileformat  VCFv4.2  GENERIC  NaN  NaN
//! 1      INFO  NaN  INFO  ID  SAS_AF
//! ```

use crate::bcf::{Header, HeaderCategory, HeaderRecord};
use crate::error::Result;
use std::fmt;
use std::io::Write;

/// Printed in place of absent values and sub-keys.
pub const PLACEHOLDER: &str = "NaN";

/// One row of the header dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRow<'a> {
    pub index: usize,
    pub key: &'a str,
    pub value: Option<&'a str>,
    pub category: HeaderCategory,
    pub sub_key: Option<&'a str>,
    pub sub_value: Option<&'a str>,
}

impl fmt::Display for HeaderRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.index,
            self.key,
            self.value.unwrap_or(PLACEHOLDER),
            self.category,
            self.sub_key.unwrap_or(PLACEHOLDER),
            self.sub_value.unwrap_or(PLACEHOLDER)
        )
    }
}

fn row<'a>(
    index: usize,
    record: &'a HeaderRecord,
    sub: Option<&'a (String, String)>,
) -> HeaderRow<'a> {
    HeaderRow {
        index,
        key: record.key(),
        value: record.value(),
        category: record.category(),
        sub_key: sub.map(|(k, _)| k.as_str()),
        sub_value: sub.map(|(_, v)| v.as_str()),
    }
}

fn rows_of(index: usize, record: &HeaderRecord) -> Box<dyn Iterator<Item = HeaderRow<'_>> + '_> {
    if record.attributes().is_empty() {
        Box::new(std::iter::once(row(index, record, None)))
    } else {
        Box::new(
            record
                .attributes()
                .iter()
                .map(move |pair| row(index, record, Some(pair))),
        )
    }
}

/// Lazily flatten the header into rows, in header order.
pub fn dump(header: &Header) -> impl Iterator<Item = HeaderRow<'_>> {
    header
        .records()
        .iter()
        .enumerate()
        .flat_map(|(index, record)| rows_of(index, record))
}

/// Write every row of [`dump`], one per line.
pub fn write_dump<W: Write>(header: &Header, out: &mut W) -> Result<usize> {
    let mut rows = 0;
    for row in dump(header) {
        writeln!(out, "{row}")?;
        rows += 1;
    }
    out.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_sub_keys() {
        let record = HeaderRecord::new(HeaderCategory::Filter, "PASS", None, vec![]);
        let header = Header::from_records(vec![record], vec![]).unwrap();
        let rows: Vec<_> = dump(&header).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "PASS");
        assert_eq!(rows[0].sub_key, None);
        assert_eq!(rows[0].to_string(), "0\tPASS\tNaN\tFILTER\tNaN\tNaN");
    }

    #[test]
    fn test_one_row_per_sub_key() {
        let header = Header::parse(
            "##fileformat=VCFv4.2\n\
##INFO=<ID=SAS_AF,Number=A,Type=Float,Description=\"SAS\">\n\
##contig=<ID=chr1,length=10>\n",
        )
        .unwrap();
        let lines: Vec<String> = dump(&header).map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "0\tfileformat\tVCFv4.2\tGENERIC\tNaN\tNaN",
                "1\tINFO\tNaN\tINFO\tID\tSAS_AF",
                "1\tINFO\tNaN\tINFO\tNumber\tA",
                "1\tINFO\tNaN\tINFO\tType\tFloat",
                "1\tINFO\tNaN\tINFO\tDescription\t\"SAS\"",
                "2\tcontig\tNaN\tCONTIG\tID\tchr1",
                "2\tcontig\tNaN\tCONTIG\tlength\t10",
            ]
        );
    }

    #[test]
    fn test_write_dump_counts_rows() {
        let header = Header::parse("##fileformat=VCFv4.2\n##source=<A=1,B=2>\n").unwrap();
        let mut out = Vec::new();
        assert_eq!(write_dump(&header, &mut out).unwrap(), 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("1\tsource\tNaN\tSTRUCTURED\tB\t2\n"));
    }

    #[test]
    fn test_empty_header() {
        let header = Header::parse("").unwrap();
        assert_eq!(dump(&header).count(), 0);
    }
}
