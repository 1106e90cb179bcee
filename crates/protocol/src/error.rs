//! Protocol error types
//!
//! Errors that can occur when encoding, decoding, or buffering native
//! protocol data.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Input ended before a complete value could be read
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// Varint is longer than 10 bytes
    #[error("varint overflows u64")]
    VarintOverflow,

    /// String payload is not valid UTF-8
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// Column type name the codec does not understand
    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    /// Packet code not defined by the protocol
    #[error("unknown packet type: {0}")]
    UnknownPacket(u64),

    /// Packet code valid but not expected in this position
    #[error("unexpected packet: {0}")]
    UnexpectedPacket(&'static str),

    /// Value cannot be stored in a column of this type
    #[error("{}cannot append {} to column of type {}", column_prefix(.column), .actual, .expected)]
    TypeMismatch {
        /// Column name, empty when raised below block level
        column: String,
        /// Declared column type
        expected: String,
        /// Offending value
        actual: String,
    },

    /// Row arity does not match the block
    #[error("row has {actual} values, block has {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Columns of one block hold different numbers of rows
    #[error("column '{column}' has {rows} rows, block has {expected}")]
    ColumnLengthMismatch {
        column: String,
        rows: usize,
        expected: usize,
    },

    /// Column index outside the block
    #[error("column index {index} out of range ({columns} columns)")]
    InvalidColumnIndex { index: usize, columns: usize },

    /// Feature present on the wire that the codec does not implement
    #[error("unsupported: {0}")]
    Unsupported(String),
}

fn column_prefix(column: &str) -> String {
    if column.is_empty() {
        String::new()
    } else {
        format!("column '{column}': ")
    }
}

impl ProtocolError {
    /// Create an unexpected end error
    #[inline]
    pub fn unexpected_end(needed: usize, remaining: usize) -> Self {
        Self::UnexpectedEnd { needed, remaining }
    }

    /// Create a type mismatch error for a value
    pub fn type_mismatch(expected: impl ToString, actual: &crate::Value) -> Self {
        Self::TypeMismatch {
            column: String::new(),
            expected: expected.to_string(),
            actual: actual.describe(),
        }
    }

    /// Attach a column name to a type mismatch
    pub fn in_column(self, name: &str) -> Self {
        match self {
            Self::TypeMismatch {
                expected, actual, ..
            } => Self::TypeMismatch {
                column: name.to_string(),
                expected,
                actual,
            },
            other => other,
        }
    }

    /// True when more input would let decoding proceed
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::UnexpectedEnd { .. })
    }

    /// True for errors raised while buffering values (no I/O involved)
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::ColumnCountMismatch { .. }
                | Self::ColumnLengthMismatch { .. }
        )
    }
}
