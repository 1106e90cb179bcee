//! String and FixedString columns

use bytes::{BufMut, BytesMut};

use super::Column;
use crate::wire::{fixed_len, get_raw, get_uvarint, put_bytes};
use crate::{ColumnType, ProtocolError, Result, Value};

/// Variable-length `String` column
///
/// All rows share one contiguous buffer; `ends[i]` is the end offset of
/// row `i` within it.
///
/// ```text
/// buffer: [row0 bytes][row1 bytes][row2 bytes]...
/// ends:   [len0, len0+len1, ...]
/// ```
#[derive(Debug, Clone)]
pub struct StringColumn {
    ty: ColumnType,
    buffer: Vec<u8>,
    ends: Vec<usize>,
}

impl Default for StringColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl StringColumn {
    pub fn new() -> Self {
        Self {
            ty: ColumnType::String,
            buffer: Vec::new(),
            ends: Vec::new(),
        }
    }

    /// Raw bytes of one row
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(&self.buffer[start..end])
    }

    #[inline]
    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.ends.push(self.buffer.len());
    }
}

impl Column for StringColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.ends.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| ProtocolError::type_mismatch(&self.ty, &value))?;
        self.push(bytes);
        Ok(())
    }

    fn append_default(&mut self) {
        self.ends.push(self.buffer.len());
    }

    fn row(&self, index: usize) -> Option<Value> {
        let bytes = self.get(index)?;
        Some(match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        })
    }

    fn truncate(&mut self, rows: usize) {
        if rows >= self.ends.len() {
            return;
        }
        self.ends.truncate(rows);
        self.buffer.truncate(self.ends.last().copied().unwrap_or(0));
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.buffer.len() + self.ends.len());
        for i in 0..self.ends.len() {
            if let Some(bytes) = self.get(i) {
                put_bytes(buf, bytes);
            }
        }
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        // every row takes at least its length byte
        self.ends.reserve(rows.min(buf.len()));
        for _ in 0..rows {
            let len = get_uvarint(buf)? as usize;
            let bytes = get_raw(buf, len)?;
            self.push(bytes);
        }
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new())
    }
}

/// `FixedString(N)` column, values zero-padded to N bytes
#[derive(Debug, Clone)]
pub struct FixedStringColumn {
    ty: ColumnType,
    width: usize,
    data: Vec<u8>,
}

impl FixedStringColumn {
    pub fn new(width: usize) -> Self {
        Self {
            ty: ColumnType::FixedString(width),
            width,
            data: Vec::new(),
        }
    }
}

impl Column for FixedStringColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        if self.width == 0 {
            return 0;
        }
        self.data.len() / self.width
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let bytes = match value.as_bytes() {
            Some(bytes) if bytes.len() <= self.width => bytes,
            _ => return Err(ProtocolError::type_mismatch(&self.ty, &value)),
        };
        self.data.extend_from_slice(bytes);
        self.data.resize(self.data.len() + self.width - bytes.len(), 0);
        Ok(())
    }

    fn append_default(&mut self) {
        self.data.resize(self.data.len() + self.width, 0);
    }

    fn row(&self, index: usize) -> Option<Value> {
        let start = index.checked_mul(self.width)?;
        let bytes = self.data.get(start..start + self.width)?;
        Some(Value::Bytes(bytes.to_vec()))
    }

    fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows * self.width);
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.data);
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        let bytes = get_raw(buf, fixed_len(rows, self.width)?)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new(self.width))
    }
}
