use std::fmt;
use std::time::Duration;

use crate::{BindingError, Result};

/// Statically declared type of a bound field or setter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Bool,
    I32,
    I64,
    U16,
    U32,
    U64,
    Usize,
    F64,
    /// `250ms`, `30s`, `5m`, `2h`, or a bare number of milliseconds
    Duration,
    /// Comma separated, entries trimmed, empty entries dropped
    StringList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::Usize => "usize",
            ValueKind::F64 => "f64",
            ValueKind::Duration => "duration",
            ValueKind::StringList => "string list",
        };
        f.write_str(name)
    }
}

/// A converted configuration value ready to be written to a target.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Bool(bool),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F64(f64),
    Duration(Duration),
    StringList(Vec<String>),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::String(_) => ValueKind::String,
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::I32(_) => ValueKind::I32,
            TypedValue::I64(_) => ValueKind::I64,
            TypedValue::U16(_) => ValueKind::U16,
            TypedValue::U32(_) => ValueKind::U32,
            TypedValue::U64(_) => ValueKind::U64,
            TypedValue::Usize(_) => ValueKind::Usize,
            TypedValue::F64(_) => ValueKind::F64,
            TypedValue::Duration(_) => ValueKind::Duration,
            TypedValue::StringList(_) => ValueKind::StringList,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(v) => write!(f, "{v}"),
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::I32(v) => write!(f, "{v}"),
            TypedValue::I64(v) => write!(f, "{v}"),
            TypedValue::U16(v) => write!(f, "{v}"),
            TypedValue::U32(v) => write!(f, "{v}"),
            TypedValue::U64(v) => write!(f, "{v}"),
            TypedValue::Usize(v) => write!(f, "{v}"),
            TypedValue::F64(v) => write!(f, "{v}"),
            TypedValue::Duration(v) => write!(f, "{}ms", v.as_millis()),
            TypedValue::StringList(v) => write!(f, "{}", v.join(",")),
        }
    }
}

macro_rules! typed_value_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TypedValue {
                fn from(value: $ty) -> Self {
                    TypedValue::$variant(value)
                }
            }

            impl TryFrom<TypedValue> for $ty {
                type Error = BindingError;

                fn try_from(value: TypedValue) -> Result<Self> {
                    match value {
                        TypedValue::$variant(v) => Ok(v),
                        other => Err(BindingError::TypeMismatch {
                            expected: ValueKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

typed_value_conversions! {
    String => String,
    Bool => bool,
    I32 => i32,
    I64 => i64,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    Usize => usize,
    F64 => f64,
    Duration => Duration,
    StringList => Vec<String>,
}

fn conversion_error(value: &str, kind: ValueKind, reason: impl fmt::Display) -> BindingError {
    BindingError::Conversion {
        value: value.to_string(),
        kind,
        reason: reason.to_string(),
    }
}

/// Convert resolved text to `kind`.
///
/// Numbers and booleans are trimmed first; strings are passed through untouched.
pub fn convert(text: &str, kind: ValueKind) -> Result<TypedValue> {
    let trimmed = text.trim();
    let value = match kind {
        ValueKind::String => TypedValue::String(text.to_string()),
        ValueKind::Bool => TypedValue::Bool(parse_bool(trimmed).ok_or_else(|| {
            conversion_error(text, kind, "expected true/false, yes/no, on/off or 1/0")
        })?),
        ValueKind::I32 => TypedValue::I32(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::I64 => TypedValue::I64(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::U16 => TypedValue::U16(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::U32 => TypedValue::U32(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::U64 => TypedValue::U64(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::Usize => TypedValue::Usize(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::F64 => TypedValue::F64(trimmed.parse().map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::Duration => TypedValue::Duration(parse_duration(trimmed).map_err(|e| conversion_error(text, kind, e))?),
        ValueKind::StringList => TypedValue::StringList(
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    };
    Ok(value)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_duration(text: &str) -> std::result::Result<Duration, String> {
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("missing amount in '{text}'"))?;
    let duration = match unit.trim() {
        "" | "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        "h" => Duration::from_secs(amount.saturating_mul(3600)),
        other => return Err(format!("unknown unit '{other}'")),
    };
    Ok(duration)
}
