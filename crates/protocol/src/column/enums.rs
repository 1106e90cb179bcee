//! Enum8 / Enum16 columns

use bytes::BytesMut;

use super::{Column, Number};
use crate::wire::{ensure, fixed_len};
use crate::{ColumnType, ProtocolError, Result, Value};

/// Enum column storing the member value, accepting names or values
#[derive(Debug, Clone)]
pub struct EnumColumn<T: Number> {
    ty: ColumnType,
    members: Vec<(String, T)>,
    data: Vec<T>,
}

impl<T: Number + PartialEq> EnumColumn<T> {
    pub fn new(ty: ColumnType, members: Vec<(String, T)>) -> Self {
        Self {
            ty,
            members,
            data: Vec::new(),
        }
    }

    fn coerce(&self, value: &Value) -> Option<T> {
        if let Some(name) = value.as_str() {
            return self
                .members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, v)| *v);
        }
        let raw = T::coerce(value)?;
        self.members.iter().any(|(_, v)| *v == raw).then_some(raw)
    }

    fn name_of(&self, raw: T) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == raw)
            .map(|(name, _)| name.as_str())
    }
}

impl<T: Number + PartialEq> Column for EnumColumn<T> {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let raw = self
            .coerce(&value)
            .ok_or_else(|| ProtocolError::type_mismatch(&self.ty, &value))?;
        self.data.push(raw);
        Ok(())
    }

    fn append_default(&mut self) {
        let first = self.members.first().map_or_else(T::default, |(_, v)| *v);
        self.data.push(first);
    }

    fn row(&self, index: usize) -> Option<Value> {
        let raw = *self.data.get(index)?;
        Some(match self.name_of(raw) {
            Some(name) => Value::String(name.to_string()),
            None => raw.into_value(),
        })
    }

    fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows);
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.data.len() * T::WIDTH);
        for v in &self.data {
            v.put(buf);
        }
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        ensure(buf, fixed_len(rows, T::WIDTH)?)?;
        self.data.reserve(rows);
        for _ in 0..rows {
            self.data.push(T::get(buf));
        }
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new(self.ty.clone(), self.members.clone()))
    }
}
