//! Dynamically typed cell values
//!
//! `Value` is what callers hand to column appends. Columns decide whether a
//! value can be stored; this module only carries the data and the
//! conversions from Rust types.

use chrono::{DateTime, NaiveDate, Utc};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Variant name, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::UInt8(_) => "UInt8",
            Self::UInt16(_) => "UInt16",
            Self::UInt32(_) => "UInt32",
            Self::UInt64(_) => "UInt64",
            Self::Int8(_) => "Int8",
            Self::Int16(_) => "Int16",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
        }
    }

    /// Short description for error messages (kind plus a bounded rendering)
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "Null".to_string(),
            Self::String(s) if s.len() > 32 => format!("String({} bytes)", s.len()),
            Self::Bytes(b) => format!("Bytes({} bytes)", b.len()),
            Self::String(s) => format!("String({s:?})"),
            Self::Date(d) => format!("Date({d})"),
            Self::DateTime(dt) => format!("DateTime({})", dt.to_rfc3339()),
            other => format!("{other:?}"),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer payload widened to i128, `None` for non-integers
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::UInt8(v) => Some(v.into()),
            Self::UInt16(v) => Some(v.into()),
            Self::UInt32(v) => Some(v.into()),
            Self::UInt64(v) => Some(v.into()),
            Self::Int8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::Int64(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Float payload, integers included
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float32(v) => Some(v.into()),
            Self::Float64(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    /// Byte payload of string-like values
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// String payload, `None` for non-strings
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
