//! BCF fixture writer shared by the integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "##fileformat=VCFv4.2\n\
##FILTER=<ID=PASS,Description=\"All filters passed\">\n\
##INFO=<ID=SAS_AF,Number=A,Type=Float,Description=\"South Asian allele frequency\">\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##contig=<ID=chr1,length=248956422>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

// String dictionary for HEADER: PASS=0 SAS_AF=1 DP=2 AF=3
pub const SAS_AF: u8 = 1;
pub const DP: u8 = 2;
pub const AF: u8 = 3;

const FLOAT_MISSING: u32 = 0x7F80_0001;

/// Shared block of one biallelic site on chr1.
pub struct Site {
    buf: Vec<u8>,
    n_info: u32,
}

impl Site {
    /// `pos` is 1-based, as printed.
    pub fn new(pos: i32, id: &str) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&(pos - 1).to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&FLOAT_MISSING.to_le_bytes());
        buf.extend_from_slice(&[0; 8]);
        for text in [id, "A", "G"] {
            buf.push(((text.len() as u8) << 4) | 7);
            buf.extend_from_slice(text.as_bytes());
        }
        // FILTER = PASS
        buf.extend_from_slice(&[0x11, 0x00]);
        Self { buf, n_info: 0 }
    }

    pub fn float(mut self, key: u8, value: f32) -> Self {
        self.buf.extend_from_slice(&[0x11, key, 0x15]);
        self.buf.extend_from_slice(&value.to_bits().to_le_bytes());
        self.n_info += 1;
        self
    }

    pub fn int(mut self, key: u8, value: i8) -> Self {
        self.buf.extend_from_slice(&[0x11, key, 0x11, value as u8]);
        self.n_info += 1;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let counts = (2u32 << 16) | self.n_info;
        self.buf[16..20].copy_from_slice(&counts.to_le_bytes());
        self.buf
    }
}

/// Uncompressed BCF 2.2 bytes for `header` and `records`.
pub fn encode(header: &str, records: Vec<Vec<u8>>) -> Vec<u8> {
    let mut data = b"BCF\x02\x02".to_vec();
    let text = format!("{header}\0");
    data.extend_from_slice(&(text.len() as u32).to_le_bytes());
    data.extend_from_slice(text.as_bytes());
    for shared in records {
        data.extend_from_slice(&(shared.len() as u32).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&shared);
    }
    data
}

/// Write `data` as BGZF-style gzip members of at most 64 bytes each.
pub fn write_bgzf(path: &Path, data: &[u8]) {
    let mut out = Vec::new();
    for chunk in data.chunks(64) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(chunk).unwrap();
        out.extend(encoder.finish().unwrap());
    }
    std::fs::write(path, out).unwrap();
}

/// A compressed fixture with the given records, written into `dir`.
pub fn fixture(dir: &Path, name: &str, records: Vec<Vec<u8>>) -> PathBuf {
    let path = dir.join(name);
    write_bgzf(&path, &encode(HEADER, records));
    path
}
