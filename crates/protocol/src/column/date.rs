//! Date and DateTime columns
//!
//! `Date` is stored as days since 1970-01-01 (u16), `DateTime` as seconds
//! since the Unix epoch (u32). The timezone of `DateTime('tz')` only affects
//! how the server renders values; the stored instant is always UTC.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, Utc};

use super::Column;
use crate::wire::{ensure, fixed_len};
use crate::{ColumnType, ProtocolError, Result, Value};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// `Date` column
#[derive(Debug, Clone)]
pub struct DateColumn {
    ty: ColumnType,
    data: Vec<u16>,
}

impl Default for DateColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl DateColumn {
    pub fn new() -> Self {
        Self {
            ty: ColumnType::Date,
            data: Vec::new(),
        }
    }

    fn coerce(value: &Value) -> Option<u16> {
        match value {
            Value::Date(date) => {
                let days = date.signed_duration_since(epoch()).num_days();
                u16::try_from(days).ok()
            }
            other => other.as_i128().and_then(|v| u16::try_from(v).ok()),
        }
    }
}

impl Column for DateColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let days = Self::coerce(&value).ok_or_else(|| ProtocolError::type_mismatch(&self.ty, &value))?;
        self.data.push(days);
        Ok(())
    }

    fn append_default(&mut self) {
        self.data.push(0);
    }

    fn row(&self, index: usize) -> Option<Value> {
        let days = *self.data.get(index)?;
        epoch()
            .checked_add_days(chrono::Days::new(u64::from(days)))
            .map(Value::Date)
    }

    fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows);
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.data.len() * 2);
        for &days in &self.data {
            buf.put_u16_le(days);
        }
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        ensure(buf, fixed_len(rows, 2)?)?;
        self.data.reserve(rows);
        for _ in 0..rows {
            self.data.push(buf.get_u16_le());
        }
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self::new())
    }
}

/// `DateTime` / `DateTime('tz')` column
#[derive(Debug, Clone)]
pub struct DateTimeColumn {
    ty: ColumnType,
    data: Vec<u32>,
}

impl DateTimeColumn {
    pub fn new(timezone: Option<String>) -> Self {
        Self {
            ty: ColumnType::DateTime(timezone),
            data: Vec::new(),
        }
    }

    fn coerce(value: &Value) -> Option<u32> {
        match value {
            Value::DateTime(dt) => u32::try_from(dt.timestamp()).ok(),
            other => other.as_i128().and_then(|v| u32::try_from(v).ok()),
        }
    }
}

impl Column for DateTimeColumn {
    fn column_type(&self) -> &ColumnType {
        &self.ty
    }

    fn rows(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, value: Value) -> Result<()> {
        let secs = Self::coerce(&value).ok_or_else(|| ProtocolError::type_mismatch(&self.ty, &value))?;
        self.data.push(secs);
        Ok(())
    }

    fn append_default(&mut self) {
        self.data.push(0);
    }

    fn row(&self, index: usize) -> Option<Value> {
        let secs = *self.data.get(index)?;
        DateTime::<Utc>::from_timestamp(i64::from(secs), 0).map(Value::DateTime)
    }

    fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows);
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.data.len() * 4);
        for &secs in &self.data {
            buf.put_u32_le(secs);
        }
    }

    fn decode(&mut self, buf: &mut &[u8], rows: usize) -> Result<()> {
        ensure(buf, fixed_len(rows, 4)?)?;
        self.data.reserve(rows);
        for _ in 0..rows {
            self.data.push(buf.get_u32_le());
        }
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(Self {
            ty: self.ty.clone(),
            data: Vec::new(),
        })
    }
}
