use std::fmt;

/// Represents the data types supported by the database.
/// Each type has a fixed or variable size and specific serialization rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type: 1 byte (0 = false, 1 = true)
    Boolean,

    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// 64-bit signed integer: 8 bytes, little-endian
    BigInt,

    /// 64-bit floating point: 8 bytes, IEEE 754
    Double,

    /// Variable-length character string: up to n bytes
    /// Stored as: length (2 bytes) + data (variable)
    VarChar(u16),
}

impl DataType {
    /// Returns true if this type has a fixed size in bytes.
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Returns the fixed size in bytes, or None for variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataType::Boolean => Some(1),
            DataType::Integer => Some(4),
            DataType::BigInt | DataType::Double => Some(8),
            DataType::VarChar(_) => None,
        }
    }

    /// Returns the maximum size in bytes this type can occupy,
    /// including the length prefix of variable-length types.
    pub fn max_size(&self) -> usize {
        match self {
            DataType::VarChar(n) => 2 + *n as usize,
            fixed => fixed.fixed_size().unwrap_or_default(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::VarChar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}
