//! Typed, append-only column buffers
//!
//! Every column of a [`Block`](crate::Block) is a `Box<dyn Column>` built by
//! [`new_column`] from the server-declared [`ColumnType`]. Appends are the
//! only place values get type-checked: an append either grows the buffer by
//! exactly one row or fails with [`ProtocolError::TypeMismatch`] and leaves
//! the buffer untouched.
//!
//! # Wire Format
//!
//! Column data is written without per-column framing; the row count comes
//! from the enclosing block header.
//!
//! ```text
//! fixed width   [rows * width bytes, little-endian]
//! String        [uvarint len][bytes] per row
//! Nullable(T)   [rows bytes null map, 1 = null][T data with defaults for nulls]
//! ```

mod date;
mod enums;
mod nullable;
mod numeric;
mod string;

use std::fmt;

use bytes::BytesMut;

use crate::{ColumnType, Result, Value};

pub use date::{DateColumn, DateTimeColumn};
pub use enums::EnumColumn;
pub use nullable::NullableColumn;
pub use numeric::{BoolColumn, Number, NumberColumn};
pub use string::{FixedStringColumn, StringColumn};

/// A typed column buffer
pub trait Column: fmt::Debug + Send + Sync {
    /// Declared type of this column
    fn column_type(&self) -> &ColumnType;

    /// Number of rows buffered
    fn rows(&self) -> usize;

    /// Append one value, coercing it to the column type
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the value cannot be stored; the column is
    /// unchanged in that case.
    fn append(&mut self, value: Value) -> Result<()>;

    /// Append the type's default value (zero, empty string, ...)
    fn append_default(&mut self);

    /// Read back one row
    fn row(&self, index: usize) -> Option<Value>;

    /// Drop rows beyond `rows`
    fn truncate(&mut self, rows: usize);

    /// Serialize all buffered rows
    fn encode(&self, buf: &mut BytesMut);

    /// Deserialize `rows` rows, appending to the buffer
    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()>;

    /// New empty column of the same type
    fn clone_empty(&self) -> Box<dyn Column>;
}

/// Build an empty column for a type
pub fn new_column(ty: &ColumnType) -> Box<dyn Column> {
    match ty {
        ColumnType::UInt8 => Box::new(NumberColumn::<u8>::new(ty.clone())),
        ColumnType::UInt16 => Box::new(NumberColumn::<u16>::new(ty.clone())),
        ColumnType::UInt32 => Box::new(NumberColumn::<u32>::new(ty.clone())),
        ColumnType::UInt64 => Box::new(NumberColumn::<u64>::new(ty.clone())),
        ColumnType::Int8 => Box::new(NumberColumn::<i8>::new(ty.clone())),
        ColumnType::Int16 => Box::new(NumberColumn::<i16>::new(ty.clone())),
        ColumnType::Int32 => Box::new(NumberColumn::<i32>::new(ty.clone())),
        ColumnType::Int64 => Box::new(NumberColumn::<i64>::new(ty.clone())),
        ColumnType::Float32 => Box::new(NumberColumn::<f32>::new(ty.clone())),
        ColumnType::Float64 => Box::new(NumberColumn::<f64>::new(ty.clone())),
        ColumnType::Bool => Box::new(BoolColumn::new()),
        ColumnType::String => Box::new(StringColumn::new()),
        ColumnType::FixedString(width) => Box::new(FixedStringColumn::new(*width)),
        ColumnType::Date => Box::new(DateColumn::new()),
        ColumnType::DateTime(tz) => Box::new(DateTimeColumn::new(tz.clone())),
        ColumnType::Enum8(members) => Box::new(EnumColumn::<i8>::new(ty.clone(), members.clone())),
        ColumnType::Enum16(members) => {
            Box::new(EnumColumn::<i16>::new(ty.clone(), members.clone()))
        }
        ColumnType::Nullable(inner) => Box::new(NullableColumn::new(new_column(inner))),
    }
}

#[cfg(test)]
#[path = "column_test.rs"]
mod column_test;
