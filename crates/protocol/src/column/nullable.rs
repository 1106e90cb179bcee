//! Nullable(T) wrapper

use bytes::{BufMut, BytesMut};

use super::Column;
use crate::wire::get_raw;
use crate::{ColumnType, Result, Value};

/// `Nullable(T)`: a null map followed by the inner column
///
/// Null rows still occupy a slot in the inner column, filled with the
/// inner type's default.
#[derive(Debug)]
pub struct NullableColumn {
    ty: ColumnType,
    nulls: Vec<u8>,
    inner: Box<dyn Column>,
}

impl NullableColumn {
    pub fn new(inner: Box<dyn Column>) -> Self {
        Self {
            ty: ColumnType::Nullable(Box::new(inner.column_type().clone())),
            nulls: Vec::new(),
            inner,
        }
    }

    /// Inner (non-null) column
    pub fn inner(&self) -> &dyn Column {
        self.inner.as_ref()
    }
}

impl Column for NullableColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.nulls.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            self.inner.append_default();
            self.nulls.push(1);
            return Ok(());
        }
        self.inner.append(value)?;
        self.nulls.push(0);
        Ok(())
    }

    fn append_default(&mut self) {
        self.inner.append_default();
        self.nulls.push(1);
    }

    fn row(&self, index: usize) -> Option<Value> {
        match *self.nulls.get(index)? {
            0 => self.inner.row(index),
            _ => Some(Value::Null),
        }
    }

    fn truncate(&mut self, rows: usize) {
        self.nulls.truncate(rows);
        self.inner.truncate(rows);
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.nulls);
        self.inner.encode(buf);
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        let nulls = get_raw(buf, rows)?;
        self.inner.decode(buf, rows)?;
        self.nulls.extend(nulls.iter().map(|&b| u8::from(b != 0)));
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new(self.inner.clone_empty()))
    }
}
