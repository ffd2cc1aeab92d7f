//! Error types for bcf-inspect.
//!
//! Only fatal conditions live here: argument problems, unreadable input,
//! malformed headers and undecodable records. Per-record lookup outcomes
//! (tag not declared, type clash, tag absent) are ordinary values handled by
//! the filter pipeline and never become an [`Error`].

use thiserror::Error;

/// Result type alias for bcf-inspect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors surfaced to the top level.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading input or writing output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not start with the BCF magic bytes
    #[error("Not a BCF file: expected magic \"BCF\\2\", found {found:?}")]
    InvalidMagic {
        /// First bytes actually read
        found: [u8; 3],
    },

    /// BCF major/minor version this reader does not understand
    #[error("Unsupported BCF version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Malformed header text
    #[error("Invalid header at line {line}: {msg}")]
    InvalidHeader {
        /// 1-based line number within the header text
        line: usize,
        /// What was wrong
        msg: String,
    },

    /// The stream ended in the middle of a record
    #[error("Truncated BCF record: {context}")]
    Truncated {
        /// What was being read
        context: String,
    },

    /// A record's shared block could not be decoded
    #[error("Malformed BCF record at byte {offset}: {msg}")]
    Decode {
        /// Offset within the record's shared block
        offset: usize,
        /// What was wrong
        msg: String,
    },

    /// Query text could not be parsed
    #[error("Query error at column {column}: {msg}")]
    Query {
        /// 1-based column within the query text
        column: usize,
        /// What was wrong
        msg: String,
    },

    /// No input file was given on the command line
    #[error("No bcf file specified")]
    MissingInput,

    /// The `parse` mode was run without a query
    #[error("No query string specified")]
    MissingQuery,
}

impl Error {
    /// True for errors caused by how the program was invoked rather than by
    /// the data it was pointed at.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::MissingInput | Error::MissingQuery | Error::Query { .. })
    }

    pub(crate) fn decode(offset: usize, msg: impl Into<String>) -> Self {
        Error::Decode {
            offset,
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors() {
        assert!(Error::MissingInput.is_usage());
        assert!(Error::MissingQuery.is_usage());
        assert!(!Error::decode(4, "bad type").is_usage());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::MissingInput.to_string(), "No bcf file specified");
        let err = Error::InvalidHeader {
            line: 3,
            msg: "unterminated quote".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid header at line 3: unterminated quote");
    }
}
