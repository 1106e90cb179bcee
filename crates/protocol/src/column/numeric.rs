//! Fixed-width numeric columns

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use super::Column;
use crate::wire::{ensure, fixed_len};
use crate::{ColumnType, ProtocolError, Result, Value};

/// Scalar stored little-endian on the wire
pub trait Number: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Convert a value, `None` if it does not fit
    fn coerce(value: &Value) -> Option<Self>;

    /// Wrap back into a `Value`
    fn into_value(self) -> Value;

    fn put(self, buf: &mut BytesMut);

    /// Read one scalar; the caller has checked the width
    fn get(buf: &mut &[u8]) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty => $variant:ident, $put:ident, $get:ident;)*) => {
        $(
            impl Number for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn coerce(value: &Value) -> Option<Self> {
                    value.as_i128().and_then(|v| <$ty>::try_from(v).ok())
                }

                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                #[inline]
                fn put(self, buf: &mut BytesMut) {
                    buf.$put(self);
                }

                #[inline]
                fn get(buf: &mut &[u8]) -> Self {
                    buf.$get()
                }
            }
        )*
    };
}

impl_integer! {
    u8 => UInt8, put_u8, get_u8;
    u16 => UInt16, put_u16_le, get_u16_le;
    u32 => UInt32, put_u32_le, get_u32_le;
    u64 => UInt64, put_u64_le, get_u64_le;
    i8 => Int8, put_i8, get_i8;
    i16 => Int16, put_i16_le, get_i16_le;
    i32 => Int32, put_i32_le, get_i32_le;
    i64 => Int64, put_i64_le, get_i64_le;
}

impl Number for f32 {
    const WIDTH: usize = 4;

    #[inline]
    fn coerce(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Float32(self)
    }

    #[inline]
    fn put(self, buf: &mut BytesMut) {
        buf.put_f32_le(self);
    }

    #[inline]
    fn get(buf: &mut &[u8]) -> Self {
        buf.get_f32_le()
    }
}

impl Number for f64 {
    const WIDTH: usize = 8;

    #[inline]
    fn coerce(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Float64(self)
    }

    #[inline]
    fn put(self, buf: &mut BytesMut) {
        buf.put_f64_le(self);
    }

    #[inline]
    fn get(buf: &mut &[u8]) -> Self {
        buf.get_f64_le()
    }
}

/// Integer or float column
#[derive(Debug, Clone)]
pub struct NumberColumn<T: Number> {
    ty: ColumnType,
    data: Vec<T>,
}

impl<T: Number> NumberColumn<T> {
    pub fn new(ty: ColumnType) -> Self {
        Self {
            ty,
            data: Vec::new(),
        }
    }

    /// Buffered values
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.data
    }
}

impl<T: Number> Column for NumberColumn<T> {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let v = T::coerce(&value).ok_or_else(|| ProtocolError::type_mismatch(&self.ty, &value))?;
        self.data.push(v);
        Ok(())
    }

    fn append_default(&mut self) {
        self.data.push(T::default());
    }

    fn row(&self, index: usize) -> Option<Value> {
        self.data.get(index).map(|v| v.into_value())
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
        Box::new(Self::new(self.ty.clone()))
    }
}

/// `Bool` column, one byte per row
#[derive(Debug, Clone)]
pub struct BoolColumn {
    ty: ColumnType,
    data: Vec<bool>,
}

impl Default for BoolColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl BoolColumn {
    pub fn new() -> Self {
        Self {
            ty: ColumnType::Bool,
            data: Vec::new(),
        }
    }
}

impl Column for BoolColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let v = match value {
            Value::Bool(b) => b,
            ref other => match other.as_i128() {
                Some(0) => false,
                Some(1) => true,
                _ => return Err(ProtocolError::type_mismatch(&self.ty, other)),
            },
        };
        self.data.push(v);
        Ok(())
    }

    fn append_default(&mut self) {
        self.data.push(false);
    }

    fn row(&self, index: usize) -> Option<Value> {
        self.data.get(index).map(|&b| Value::Bool(b))
    }

    fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows);
    }

    fn encode(&self, buf: &mut BytesMut) {
        for &b in &self.data {
            buf.put_u8(u8::from(b));
        }
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        ensure(buf, rows)?;
        self.data.extend(buf[..rows].iter().map(|&b| b != 0));
        buf.advance(rows);
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new())
    }
}
