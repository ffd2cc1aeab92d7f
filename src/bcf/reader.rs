//! BCF streaming reader.
//!
//! # Design
//!
//! - BGZF (multi-member gzip) input is detected from the first two bytes and
//!   decompressed with `flate2`; uncompressed BCF is read as-is
//! - The header is read once, explicitly, before any record
//! - Records are read into a caller-owned [`Record`] whose buffers are
//!   reused, so memory stays flat across millions of records
//!
//! # Usage
//!
//! ```no_run
//! use bcf_inspect::bcf::{Reader, Record};
//!
//! # fn main() -> bcf_inspect::Result<()> {
//! let mut reader = Reader::from_path("calls.bcf")?;
//! let header = reader.read_header()?;
//!
//! let mut record = Record::new();
//! while reader.read_record(&mut record)? {
//!     let chrom = header.contig_name(record.chrom_id() as usize).unwrap_or("?");
//!     println!("{} {}", chrom, record.pos() + 1);
//! }
//! # Ok(())
//! # }
//! ```

use super::header::Header;
use super::record::{FIXED_LEN, Record};
use crate::error::{Error, Result};
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// BCF magic bytes (major version 2).
const BCF_MAGIC: &[u8; 3] = b"BCF";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Pull-based source of records, one per request.
pub trait RecordSource {
    /// Fill `record` with the next record.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn read_record(&mut self, record: &mut Record) -> Result<bool>;
}

enum Decoder<R> {
    Plain(BufReader<R>),
    Bgzf(BufReader<MultiGzDecoder<BufReader<R>>>),
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Plain(r) => r.read(buf),
            Decoder::Bgzf(r) => r.read(buf),
        }
    }
}

/// BCF file reader.
pub struct Reader<R> {
    inner: Decoder<R>,
    header_read: bool,
}

impl<R: Read> Reader<R> {
    /// Wrap a byte stream, detecting BGZF compression.
    pub fn new(inner: R) -> Result<Self> {
        let mut buffered = BufReader::new(inner);
        let compressed = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
        let inner = if compressed {
            Decoder::Bgzf(BufReader::new(MultiGzDecoder::new(buffered)))
        } else {
            Decoder::Plain(buffered)
        };
        Ok(Self {
            inner,
            header_read: false,
        })
    }

    /// True when the input was BGZF/gzip-compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self.inner, Decoder::Bgzf(_))
    }

    /// Read and validate the magic bytes and header text.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The magic is not `BCF\2\1` or `BCF\2\2`
    /// - The header text is truncated, not UTF-8, or malformed
    pub fn read_header(&mut self) -> Result<Header> {
        let mut magic = [0u8; 5];
        self.read_exact(&mut magic, "BCF magic")?;

        if &magic[..3] != BCF_MAGIC {
            return Err(Error::InvalidMagic {
                found: [magic[0], magic[1], magic[2]],
            });
        }
        let (major, minor) = (magic[3], magic[4]);
        if major != 2 || minor > 2 {
            return Err(Error::UnsupportedVersion { major, minor });
        }

        let mut len = [0u8; 4];
        self.read_exact(&mut len, "header length")?;
        let l_text = u32::from_le_bytes(len) as usize;

        let mut text = Vec::new();
        read_len(&mut self.inner, &mut text, l_text, "header text")?;
        let text = String::from_utf8(text).map_err(|_| Error::InvalidHeader {
            line: 0,
            msg: "header text is not UTF-8".to_string(),
        })?;

        let header = Header::parse(&text)?;
        self.header_read = true;
        log::debug!(
            "Read BCF {major}.{minor} header: {} records, {} samples",
            header.records().len(),
            header.samples().len()
        );
        Ok(header)
    }

    /// Read the next record into `record`, reusing its buffers.
    ///
    /// Returns `Ok(false)` when the stream ends cleanly between records.
    /// A stream that ends inside a record is [`Error::Truncated`].
    pub fn read_record(&mut self, record: &mut Record) -> Result<bool> {
        if !self.header_read {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read_header must be called before read_record",
            )));
        }

        let mut lengths = [0u8; 8];
        if !self.read_exact_or_eof(&mut lengths)? {
            return Ok(false);
        }
        let [a, b, c, d, e, f, g, h] = lengths;
        let l_shared = u32::from_le_bytes([a, b, c, d]) as usize;
        let l_indiv = u32::from_le_bytes([e, f, g, h]) as usize;

        if l_shared < FIXED_LEN {
            return Err(Error::decode(
                0,
                format!("shared block is {l_shared} bytes, need at least {FIXED_LEN}"),
            ));
        }

        let (shared, indiv) = record.buffers_mut();
        read_len(&mut self.inner, shared, l_shared, "record shared block")?;
        read_len(&mut self.inner, indiv, l_indiv, "record sample block")?;
        Ok(true)
    }

    /// Iterate over records, allocating one [`Record`] per item.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }

    fn read_exact(&mut self, buf: &mut [u8], context: &str) -> Result<()> {
        read_exact(&mut self.inner, buf, context)
    }

    /// Like `read_exact`, but `Ok(false)` if no byte at all was available.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(Error::Truncated {
                        context: "record lengths".to_string(),
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }
}

impl<R: Read> RecordSource for Reader<R> {
    fn read_record(&mut self, record: &mut Record) -> Result<bool> {
        Reader::read_record(self, record)
    }
}

impl Reader<File> {
    /// Open a BCF file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], context: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated {
                context: context.to_string(),
            }
        } else {
            Error::Io(e)
        }
    })
}

/// Replace `buf` with the next `len` bytes.
///
/// Memory grows with the bytes actually read, so a corrupt length field
/// cannot force a large allocation ahead of the data.
fn read_len<R: Read>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    len: usize,
    context: &str,
) -> Result<()> {
    buf.clear();
    reader.by_ref().take(len as u64).read_to_end(buf)?;
    if buf.len() < len {
        return Err(Error::Truncated {
            context: format!("{context}: expected {len} bytes, got {}", buf.len()),
        });
    }
    Ok(())
}

/// Iterator over BCF records.
///
/// Created by [`Reader::records()`].
pub struct Records<'a, R> {
    reader: &'a mut Reader<R>,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = Record::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcf::record::tests::{HEADER, SAS_AF, SharedBuilder};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    fn encode(header: &str, records: &[Vec<u8>]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"BCF\x02\x02");
        let text = format!("{header}\0");
        data.extend_from_slice(&(text.len() as u32).to_le_bytes());
        data.extend_from_slice(text.as_bytes());
        for shared in records {
            data.extend_from_slice(&(shared.len() as u32).to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(shared);
        }
        data
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn two_records() -> Vec<Vec<u8>> {
        vec![
            SharedBuilder::new(0, 10)
                .site("rs1", &["A", "G"], &[0])
                .info_floats(SAS_AF, &[0.0005])
                .build(),
            SharedBuilder::new(0, 20).site("rs2", &["C", "T"], &[0]).build(),
        ]
    }

    #[test]
    fn test_plain_stream() {
        let data = encode(HEADER, &two_records());
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        assert!(!reader.is_compressed());
        let header = reader.read_header().unwrap();
        assert!(header.info("SAS_AF").is_some());

        let mut record = Record::new();
        assert!(reader.read_record(&mut record).unwrap());
        assert_eq!(record.pos(), 10);
        assert_eq!(record.id().unwrap(), "rs1");
        assert!(reader.read_record(&mut record).unwrap());
        assert_eq!(record.pos(), 20);
        assert_eq!(record.id().unwrap(), "rs2");
        assert!(!reader.read_record(&mut record).unwrap());
    }

    #[test]
    fn test_multi_member_gzip() {
        let data = encode(HEADER, &two_records());
        let (head, tail) = data.split_at(data.len() / 2);
        let mut compressed = gzip(head);
        compressed.extend(gzip(tail));

        let mut reader = Reader::new(Cursor::new(compressed)).unwrap();
        assert!(reader.is_compressed());
        reader.read_header().unwrap();
        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id().unwrap(), "rs2");
    }

    #[test]
    fn test_header_only() {
        let data = gzip(&encode(HEADER, &[]));
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        reader.read_header().unwrap();
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn test_invalid_magic() {
        let mut reader = Reader::new(Cursor::new(b"VCF\x02\x02rest".to_vec())).unwrap();
        assert!(matches!(
            reader.read_header(),
            Err(Error::InvalidMagic { found }) if &found == b"VCF"
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut reader = Reader::new(Cursor::new(b"BCF\x01\x00".to_vec())).unwrap();
        assert!(matches!(
            reader.read_header(),
            Err(Error::UnsupportedVersion { major: 1, minor: 0 })
        ));
    }

    #[test]
    fn test_empty_input() {
        let mut reader = Reader::new(Cursor::new(Vec::new())).unwrap();
        assert!(matches!(reader.read_header(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_truncated_record() {
        let mut data = encode(HEADER, &two_records());
        data.truncate(data.len() - 3);
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        reader.read_header().unwrap();
        let mut record = Record::new();
        assert!(reader.read_record(&mut record).unwrap());
        assert!(matches!(
            reader.read_record(&mut record),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_oversized_record_length_is_truncated() {
        let mut data = encode(HEADER, &[]);
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0; 30]);
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        reader.read_header().unwrap();
        let mut record = Record::new();
        match reader.read_record(&mut record) {
            Err(Error::Truncated { context }) => assert!(context.contains("shared block")),
            other => panic!("Expected Truncated, got {other:?}"),
        }
        assert!(record.shared().len() <= 30);
    }

    #[test]
    fn test_oversized_header_length_is_truncated() {
        let mut data = b"BCF\x02\x02".to_vec();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(b"##fileformat=VCFv4.2\n");
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        assert!(matches!(reader.read_header(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_record_before_header() {
        let data = encode(HEADER, &two_records());
        let mut reader = Reader::new(Cursor::new(data)).unwrap();
        let mut record = Record::new();
        assert!(reader.read_record(&mut record).is_err());
    }
}
