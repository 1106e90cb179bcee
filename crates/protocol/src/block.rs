//! Blocks: the unit of row data exchanged with the server
//!
//! A block is an ordered list of named, typed columns of equal length. Data,
//! Totals, Extremes, Log and ProfileEvents packets all carry one. An insert
//! is framed as one block of rows followed by an empty block.
//!
//! # Wire Format
//!
//! ```text
//! [block info]     1 [u8 is_overflows] 2 [i32 bucket_num] 0
//! [uvarint]        column count
//! [uvarint]        row count
//! per column:
//!   [string]       name
//!   [string]       type name
//!   [u8]           custom serialization flag (revision >= 54454)
//!   [bytes]        column data
//! ```

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::column::{Column, new_column};
use crate::wire::{get_bool, get_i32, get_string, get_u8, get_uvarint, put_bool, put_string, put_uvarint};
use crate::{ColumnType, ProtocolError, Result, Value, revision};

/// Block-level metadata carried ahead of the columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub is_overflows: bool,
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    fn encode(&self, buf: &mut BytesMut) {
        put_uvarint(buf, 1);
        put_bool(buf, self.is_overflows);
        put_uvarint(buf, 2);
        buf.put_i32_le(self.bucket_num);
        put_uvarint(buf, 0);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let mut info = Self::default();
        loop {
            match get_uvarint(buf)? {
                0 => return Ok(info),
                1 => info.is_overflows = get_bool(buf)?,
                2 => info.bucket_num = get_i32(buf)?,
                field => {
                    return Err(ProtocolError::Unsupported(format!(
                        "block info field {field}"
                    )));
                }
            }
        }
    }
}

/// Ordered set of named columns
#[derive(Default)]
pub struct Block {
    pub info: BlockInfo,
    names: Vec<String>,
    columns: Vec<Box<dyn Column>>,
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("columns", &self.names)
            .field("rows", &self.rows())
            .finish()
    }
}

impl Block {
    /// Create an empty block without columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty column
    pub fn add_column(&mut self, name: impl Into<String>, ty: ColumnType) {
        self.names.push(name.into());
        self.columns.push(new_column(&ty));
    }

    /// Same columns, zero rows
    pub fn empty_like(&self) -> Self {
        Self {
            info: BlockInfo::default(),
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.clone_empty()).collect(),
        }
    }

    /// Number of columns
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (length of the first column)
    #[inline]
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.rows())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Column names in wire order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, index: usize) -> Option<&dyn Column> {
        self.columns.get(index).map(|c| c.as_ref())
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut dyn Column> {
        let column = self.columns.get_mut(index)?;
        Some(column.as_mut())
    }

    /// Column by name
    pub fn column_by_name(&self, name: &str) -> Option<&dyn Column> {
        let index = self.names.iter().position(|n| n == name)?;
        self.column(index)
    }

    /// Read back one row across all columns
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        self.columns.iter().map(|c| c.row(index)).collect()
    }

    /// Append one value per column
    ///
    /// # Errors
    ///
    /// - `ColumnCountMismatch` if `values` does not match the column count;
    ///   nothing is appended.
    /// - `TypeMismatch` if a value does not fit its column; columns already
    ///   appended in this call are truncated back, so every column keeps the
    ///   same length.
    pub fn append_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(ProtocolError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let rows = self.rows();
        for (i, value) in values.into_iter().enumerate() {
            if let Err(e) = self.columns[i].append(value) {
                for column in &mut self.columns[..i] {
                    column.truncate(rows);
                }
                return Err(e.in_column(&self.names[i]));
            }
        }
        Ok(())
    }

    /// Append a single value to one column
    ///
    /// Only the target column grows; keeping columns the same length is the
    /// caller's job.
    pub fn append_column(&mut self, index: usize, value: Value) -> Result<()> {
        let columns = self.columns.len();
        let column = self
            .columns
            .get_mut(index)
            .ok_or(ProtocolError::InvalidColumnIndex { index, columns })?;
        column
            .append(value)
            .map_err(|e| e.in_column(&self.names[index]))
    }

    /// Check that every column holds the same number of rows
    ///
    /// Direct column appends can leave a block ragged; such a block must not
    /// reach the wire.
    pub fn validate(&self) -> Result<()> {
        let expected = self.rows();
        for (name, column) in self.names.iter().zip(&self.columns) {
            if column.rows() != expected {
                return Err(ProtocolError::ColumnLengthMismatch {
                    column: name.clone(),
                    rows: column.rows(),
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Drop all rows, keeping the columns
    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.truncate(0);
        }
    }

    /// Serialize the block body (no packet code, no table name)
    pub fn encode(&self, buf: &mut BytesMut, revision: u64) {
        self.info.encode(buf);
        put_uvarint(buf, self.columns.len() as u64);
        put_uvarint(buf, self.rows() as u64);
        for (name, column) in self.names.iter().zip(&self.columns) {
            put_string(buf, name);
            put_string(buf, &column.column_type().to_string());
            if revision >= revision::CUSTOM_SERIALIZATION {
                buf.put_u8(0);
            }
            column.encode(buf);
        }
    }

    /// Deserialize a block body
    pub fn decode(buf: &mut &[u8], revision: u64) -> Result<Self> {
        let info = BlockInfo::decode(buf)?;
        let columns = get_uvarint(buf)? as usize;
        let rows = get_uvarint(buf)? as usize;

        let mut block = Self {
            info,
            names: Vec::with_capacity(columns.min(1024)),
            columns: Vec::with_capacity(columns.min(1024)),
        };
        for _ in 0..columns {
            let name = get_string(buf)?;
            let ty = ColumnType::parse(&get_string(buf)?)?;
            if revision >= revision::CUSTOM_SERIALIZATION && get_u8(buf)? != 0 {
                return Err(ProtocolError::Unsupported(format!(
                    "custom serialization for column '{name}'"
                )));
            }
            let mut column = new_column(&ty);
            if rows > 0 {
                column.decode(buf, rows)?;
            }
            block.names.push(name);
            block.columns.push(column);
        }
        Ok(block)
    }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
