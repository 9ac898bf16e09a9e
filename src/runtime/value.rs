//! Runtime value representation

use crate::parser::module::ValueType;
use fhex::ToHex;
use std::fmt;
use std::str::FromStr;

/// A single runtime value, always exactly one of the four MVP numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Zero value of the given type, used to default-initialise locals and globals.
    pub fn default_for(typ: ValueType) -> Value {
        match typ {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Bitwise equality, so NaN payloads and signed zeros compare exactly.
    pub fn bit_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{v} ({})", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{v} ({})", v.to_hex()),
        }
    }
}

/// Parses the `type:value` form used on the command line, e.g. `i32:-7` or `f64:2.5`.
impl FromStr for Value {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (typ, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <type>:<value>, got '{s}'"))?;
        match typ {
            "i32" => value
                .parse::<i32>()
                .or_else(|_| value.parse::<u32>().map(|v| v as i32))
                .map(Value::I32)
                .map_err(|e| format!("Failed to parse i32: {e}")),
            "i64" => value
                .parse::<i64>()
                .or_else(|_| value.parse::<u64>().map(|v| v as i64))
                .map(Value::I64)
                .map_err(|e| format!("Failed to parse i64: {e}")),
            "f32" => value
                .parse::<f32>()
                .map(Value::F32)
                .map_err(|e| format!("Failed to parse f32: {e}")),
            "f64" => value
                .parse::<f64>()
                .map(Value::F64)
                .map_err(|e| format!("Failed to parse f64: {e}")),
            t => Err(format!("Unknown value type: {t}")),
        }
    }
}
