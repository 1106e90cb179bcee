//! Column type names
//!
//! The server describes every column of a block by its type name, e.g.
//! `UInt64`, `Nullable(String)` or `Enum8('a' = 1, 'b' = 2)`. `ColumnType`
//! is the parsed form; `Display` renders the canonical wire name back.

use std::fmt;
use std::str::FromStr;

use crate::{ProtocolError, Result};

/// Parsed column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    String,
    FixedString(usize),
    Date,
    /// Optional timezone name
    DateTime(Option<String>),
    /// Member (name, value) pairs in declaration order
    Enum8(Vec<(String, i8)>),
    Enum16(Vec<(String, i16)>),
    Nullable(Box<ColumnType>),
}

impl ColumnType {
    /// Parse a server type name
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let simple = match name {
            "UInt8" => Some(Self::UInt8),
            "UInt16" => Some(Self::UInt16),
            "UInt32" => Some(Self::UInt32),
            "UInt64" => Some(Self::UInt64),
            "Int8" => Some(Self::Int8),
            "Int16" => Some(Self::Int16),
            "Int32" => Some(Self::Int32),
            "Int64" => Some(Self::Int64),
            "Float32" => Some(Self::Float32),
            "Float64" => Some(Self::Float64),
            "Bool" => Some(Self::Bool),
            "String" => Some(Self::String),
            "Date" => Some(Self::Date),
            "DateTime" => Some(Self::DateTime(None)),
            _ => None,
        };
        if let Some(ty) = simple {
            return Ok(ty);
        }

        let unsupported = || ProtocolError::UnsupportedType(name.to_string());
        let (outer, args) = split_args(name).ok_or_else(unsupported)?;
        match outer {
            "Nullable" => Ok(Self::Nullable(Box::new(Self::parse(args)?))),
            "FixedString" => args
                .trim()
                .parse()
                .map(Self::FixedString)
                .map_err(|_| unsupported()),
            "DateTime" => Ok(Self::DateTime(Some(unquote(args.trim()).ok_or_else(unsupported)?))),
            "Enum8" => parse_enum(args)
                .ok_or_else(unsupported)
                .map(Self::Enum8),
            "Enum16" => parse_enum(args)
                .ok_or_else(unsupported)
                .map(Self::Enum16),
            _ => Err(unsupported()),
        }
    }

    /// Width in bytes of one fixed-size value, `None` for variable width
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::UInt8 | Self::Int8 | Self::Bool | Self::Enum8(_) => Some(1),
            Self::UInt16 | Self::Int16 | Self::Date | Self::Enum16(_) => Some(2),
            Self::UInt32 | Self::Int32 | Self::Float32 | Self::DateTime(_) => Some(4),
            Self::UInt64 | Self::Int64 | Self::Float64 => Some(8),
            Self::FixedString(n) => Some(*n),
            Self::String | Self::Nullable(_) => None,
        }
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }
}

impl FromStr for ColumnType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt8 => f.write_str("UInt8"),
            Self::UInt16 => f.write_str("UInt16"),
            Self::UInt32 => f.write_str("UInt32"),
            Self::UInt64 => f.write_str("UInt64"),
            Self::Int8 => f.write_str("Int8"),
            Self::Int16 => f.write_str("Int16"),
            Self::Int32 => f.write_str("Int32"),
            Self::Int64 => f.write_str("Int64"),
            Self::Float32 => f.write_str("Float32"),
            Self::Float64 => f.write_str("Float64"),
            Self::Bool => f.write_str("Bool"),
            Self::String => f.write_str("String"),
            Self::FixedString(n) => write!(f, "FixedString({n})"),
            Self::Date => f.write_str("Date"),
            Self::DateTime(None) => f.write_str("DateTime"),
            Self::DateTime(Some(tz)) => write!(f, "DateTime('{tz}')"),
            Self::Enum8(members) => write_enum(f, "Enum8", members),
            Self::Enum16(members) => write_enum(f, "Enum16", members),
            Self::Nullable(inner) => write!(f, "Nullable({inner})"),
        }
    }
}

fn write_enum<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    outer: &str,
    members: &[(String, T)],
) -> fmt::Result {
    write!(f, "{outer}(")?;
    for (i, (name, value)) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "'{}' = {value}", name.replace('\'', "\\'"))?;
    }
    f.write_str(")")
}

/// Split `Outer(args)` into its parts
fn split_args(name: &str) -> Option<(&str, &str)> {
    let open = name.find('(')?;
    let inner = name.strip_suffix(')')?;
    Some((&name[..open], &inner[open + 1..]))
}

/// Strip single quotes, undoing `\'` escapes
fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("\\'", "'"))
}

/// Parse `'a' = 1, 'b' = 2` member lists
fn parse_enum<T: FromStr>(args: &str) -> Option<Vec<(String, T)>> {
    let mut members = Vec::new();
    let mut rest = args.trim();
    while !rest.is_empty() {
        let body = rest.strip_prefix('\'')?;
        // find the closing quote, skipping escaped ones
        let bytes = body.as_bytes();
        let mut end = None;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\'' => {
                    end = Some(i);
                    break;
                }
                _ => i += 1,
            }
        }
        let end = end?;
        let name = body[..end].replace("\\'", "'");
        let after = body[end + 1..].trim_start().strip_prefix('=')?;
        let (value, tail) = match after.find(',') {
            Some(comma) => (&after[..comma], &after[comma + 1..]),
            None => (after, ""),
        };
        members.push((name, value.trim().parse().ok()?));
        rest = tail.trim();
    }
    if members.is_empty() {
        return None;
    }
    Some(members)
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
