use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value - can be any type
    Null,
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    /// String value, stored as VarChar
    String(String),
}

impl Value {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value can be stored in a column of the given type.
    /// Null is compatible with every type; nullability is checked by the tuple.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Null, _) => true,
            (Value::Boolean(_), DataType::Boolean) => true,
            (Value::Integer(_), DataType::Integer) => true,
            (Value::Integer(_) | Value::BigInt(_), DataType::BigInt) => true,
            (Value::Double(_), DataType::Double) => true,
            (Value::String(s), DataType::VarChar(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    /// Appends the encoding of this value for the given type.
    /// Returns false, writing nothing, if the value does not fit the type.
    pub fn encode<B: BufMut>(&self, data_type: &DataType, buf: &mut B) -> bool {
        if !self.fits(data_type) {
            return false;
        }
        match (self, data_type) {
            // Nulls keep their column width so fixed offsets stay stable
            (Value::Null, DataType::VarChar(_)) => buf.put_u16_le(0),
            (Value::Null, fixed) => buf.put_bytes(0, fixed.max_size()),
            (Value::Boolean(b), _) => buf.put_u8(u8::from(*b)),
            (Value::Integer(v), DataType::BigInt) => buf.put_i64_le(*v as i64),
            (Value::Integer(v), _) => buf.put_i32_le(*v),
            (Value::BigInt(v), _) => buf.put_i64_le(*v),
            (Value::Double(v), _) => buf.put_f64_le(*v),
            (Value::String(s), _) => {
                buf.put_u16_le(s.len() as u16);
                buf.put_slice(s.as_bytes());
            }
        }
        true
    }

    /// Reads a value of the given type from the front of `buf`.
    /// Returns None if the buffer is too short.
    pub fn decode<B: Buf>(data_type: &DataType, buf: &mut B) -> Option<Self> {
        if let Some(size) = data_type.fixed_size() {
            if buf.remaining() < size {
                return None;
            }
        }
        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Double => Value::Double(buf.get_f64_le()),
            DataType::VarChar(_) => {
                if buf.remaining() < 2 {
                    return None;
                }
                let len = buf.get_u16_le() as usize;
                if buf.remaining() < len {
                    return None;
                }
                let mut raw = vec![0u8; len];
                buf.copy_to_slice(&mut raw);
                Value::String(String::from_utf8_lossy(&raw).into_owned())
            }
        };
        Some(value)
    }

    /// Compares two values for ordering.
    /// Returns None if the values are not comparable (different types or null).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::BigInt(b)) => Some((*a as i64).cmp(b)),
            (Value::BigInt(a), Value::Integer(b)) => Some(a.cmp(&(*b as i64))),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
