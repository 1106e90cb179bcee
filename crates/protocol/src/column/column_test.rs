//! Tests for column buffers

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, Utc};

use super::*;
use crate::ProtocolError;

fn column(name: &str) -> Box<dyn Column> {
    new_column(&ColumnType::parse(name).unwrap())
}

/// Encode a column and decode it into a fresh one of the same type
fn reencode(col: &dyn Column) -> Box<dyn Column> {
    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    let mut decoded = col.clone_empty();
    let mut cursor = &buf[..];
    decoded.decode(&mut cursor, col.rows()).unwrap();
    assert!(cursor.is_empty());
    decoded
}

// =============================================================================
// Numeric
// =============================================================================

#[test]
fn test_integer_accepts_any_integer_in_range() {
    let mut col = column("UInt8");
    col.append(Value::Int64(200)).unwrap();
    col.append(Value::UInt32(7)).unwrap();
    assert_eq!(col.rows(), 2);
    assert_eq!(col.row(0), Some(Value::UInt8(200)));
    assert_eq!(col.row(1), Some(Value::UInt8(7)));
}

#[test]
fn test_integer_out_of_range_leaves_column_unchanged() {
    let mut col = column("Int8");
    col.append(Value::Int8(1)).unwrap();
    let err = col.append(Value::Int64(128)).unwrap_err();
    assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    assert_eq!(col.rows(), 1);
}

#[test]
fn test_integer_rejects_string_and_null() {
    let mut col = column("UInt64");
    assert!(col.append(Value::from("1")).is_err());
    assert!(col.append(Value::Null).is_err());
    assert_eq!(col.rows(), 0);
}

#[test]
fn test_float_accepts_integers() {
    let mut col = column("Float64");
    col.append(Value::Float64(1.5)).unwrap();
    col.append(Value::Int32(-2)).unwrap();
    assert_eq!(col.row(1), Some(Value::Float64(-2.0)));
}

#[test]
fn test_numeric_wire_layout_little_endian() {
    let mut col = column("UInt32");
    col.append(Value::UInt32(1)).unwrap();
    col.append(Value::UInt32(0x0102_0304)).unwrap();
    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..], &[1, 0, 0, 0, 4, 3, 2, 1]);
}

#[test]
fn test_numeric_decode_short_input() {
    let mut col = column("Int64");
    let bytes = [0u8; 12];
    let err = col.decode(&mut &bytes[..], 2).unwrap_err();
    assert!(err.is_incomplete());
    assert_eq!(col.rows(), 0);
}

#[test]
fn test_bool_accepts_bool_and_zero_one() {
    let mut col = column("Bool");
    col.append(Value::Bool(true)).unwrap();
    col.append(Value::UInt8(0)).unwrap();
    assert!(col.append(Value::UInt8(2)).is_err());
    assert_eq!(col.rows(), 2);

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::Bool(true)));
    assert_eq!(decoded.row(1), Some(Value::Bool(false)));
}

// =============================================================================
// Strings
// =============================================================================

#[test]
fn test_string_column() {
    let mut col = column("String");
    col.append(Value::from("a")).unwrap();
    col.append(Value::from(vec![0xffu8])).unwrap();
    col.append_default();

    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..], &[1, b'a', 1, 0xff, 0]);

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::String("a".into())));
    assert_eq!(decoded.row(1), Some(Value::Bytes(vec![0xff])));
    assert_eq!(decoded.row(2), Some(Value::String(String::new())));
}

#[test]
fn test_string_truncate() {
    let mut col = StringColumn::new();
    for s in ["one", "two", "three"] {
        col.append(Value::from(s)).unwrap();
    }
    col.truncate(1);
    assert_eq!(col.rows(), 1);
    col.append(Value::from("four")).unwrap();
    assert_eq!(col.get(1), Some(&b"four"[..]));
}

#[test]
fn test_fixed_string_pads_and_rejects_long_values() {
    let mut col = column("FixedString(3)");
    col.append(Value::from("ab")).unwrap();
    assert!(col.append(Value::from("abcd")).is_err());
    assert_eq!(col.rows(), 1);

    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..], b"ab\0");
    assert_eq!(col.row(0), Some(Value::Bytes(b"ab\0".to_vec())));
}

// =============================================================================
// Dates and enums
// =============================================================================

#[test]
fn test_date_column() {
    let mut col = column("Date");
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    col.append(Value::Date(date)).unwrap();
    col.append(Value::UInt16(1)).unwrap();
    let before_epoch = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
    assert!(col.append(Value::Date(before_epoch)).is_err());

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::Date(date)));
    assert_eq!(
        decoded.row(1),
        Some(Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()))
    );
}

#[test]
fn test_datetime_column() {
    let mut col = column("DateTime('UTC')");
    let ts = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    col.append(Value::DateTime(ts)).unwrap();
    col.append(Value::Int64(60)).unwrap();
    assert!(col.append(Value::Int64(-1)).is_err());

    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..4], &1_700_000_000u32.to_le_bytes());

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::DateTime(ts)));
    assert_eq!(
        decoded.column_type(),
        &ColumnType::DateTime(Some("UTC".into()))
    );
}

#[test]
fn test_enum_accepts_names_and_values() {
    let mut col = column("Enum8('increment' = 1, 'gauge' = 2)");
    col.append(Value::from("gauge")).unwrap();
    col.append(Value::Int8(1)).unwrap();
    assert!(col.append(Value::from("missing")).is_err());
    assert!(col.append(Value::Int8(3)).is_err());
    assert_eq!(col.rows(), 2);

    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..], &[2, 1]);

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::String("gauge".into())));
    assert_eq!(decoded.row(1), Some(Value::String("increment".into())));
}

// =============================================================================
// Nullable
// =============================================================================

#[test]
fn test_nullable_layout() {
    let mut col = column("Nullable(UInt8)");
    col.append(Value::UInt8(5)).unwrap();
    col.append(Value::Null).unwrap();
    col.append(Value::from(Some(7u8))).unwrap();

    let mut buf = BytesMut::new();
    col.encode(&mut buf);
    assert_eq!(&buf[..], &[0, 1, 0, 5, 0, 7]);

    let decoded = reencode(col.as_ref());
    assert_eq!(decoded.row(0), Some(Value::UInt8(5)));
    assert_eq!(decoded.row(1), Some(Value::Null));
    assert_eq!(decoded.row(2), Some(Value::UInt8(7)));
}

#[test]
fn test_nullable_inner_mismatch_leaves_both_buffers() {
    let mut col = NullableColumn::new(column("UInt8"));
    col.append(Value::UInt8(1)).unwrap();
    assert!(col.append(Value::from("x")).is_err());
    assert_eq!(col.rows(), 1);
    assert_eq!(col.inner().rows(), 1);
    assert_eq!(
        col.column_type(),
        &ColumnType::Nullable(Box::new(ColumnType::UInt8))
    );
}

#[test]
fn test_clone_empty_keeps_type() {
    for name in ["UInt16", "String", "Nullable(String)", "Enum16('a' = 1)"] {
        let mut col = column(name);
        col.append_default();
        let empty = col.clone_empty();
        assert_eq!(empty.rows(), 0);
        assert_eq!(empty.column_type().to_string(), name);
    }
}
