//! Scalar kinds and their textual value contract.
//!
//! Every field exposed on the command line has one of a fixed set of
//! [`TypeKind`]s. The kind decides how a token is turned into a [`Value`];
//! the generated parser and the in-process simulator both follow the rules
//! implemented here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported scalar kinds.
///
/// # Examples
///
/// ```
/// use clapdoc_core::{TypeCategory, TypeKind};
///
/// assert_eq!(TypeKind::classify("uint16"), Some(TypeKind::U16));
/// assert_eq!(TypeKind::classify("u16"), Some(TypeKind::U16));
/// assert_eq!(TypeKind::classify("byte"), Some(TypeKind::U8));
/// assert_eq!(TypeKind::classify("HashMap"), None);
///
/// assert_eq!(TypeKind::I32.bits(), Some(32));
/// assert_eq!(TypeKind::U8.category(), TypeCategory::UnsignedInt);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Bool,
    String,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

/// Coarse grouping of kinds that share parsing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCategory {
    Bool,
    String,
    SignedInt,
    UnsignedInt,
    Float,
}

impl TypeKind {
    /// Maps a declared type name onto a kind.
    ///
    /// Both Go-style (`int32`, `float64`) and Rust-style (`i32`, `f64`)
    /// spellings are accepted. `byte` maps to `u8`, `rune`/`char` to `i32`,
    /// and the platform-width `int`/`uint`/`isize`/`usize` to 64 bits.
    pub fn classify(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => Self::Bool,
            "string" | "String" | "str" => Self::String,
            "int8" | "i8" => Self::I8,
            "int16" | "i16" => Self::I16,
            "int32" | "i32" | "rune" | "char" => Self::I32,
            "int64" | "i64" | "int" | "isize" => Self::I64,
            "uint8" | "u8" | "byte" => Self::U8,
            "uint16" | "u16" => Self::U16,
            "uint32" | "u32" => Self::U32,
            "uint64" | "u64" | "uint" | "usize" => Self::U64,
            "float32" | "f32" => Self::F32,
            "float64" | "f64" => Self::F64,
            _ => return None,
        };
        Some(kind)
    }

    /// Bit width of numeric kinds.
    pub fn bits(self) -> Option<u32> {
        match self {
            Self::Bool | Self::String => None,
            Self::I8 | Self::U8 => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 | Self::F32 => Some(32),
            Self::I64 | Self::U64 | Self::F64 => Some(64),
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    pub fn category(self) -> TypeCategory {
        match self {
            Self::Bool => TypeCategory::Bool,
            Self::String => TypeCategory::String,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => TypeCategory::SignedInt,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => TypeCategory::UnsignedInt,
            Self::F32 | Self::F64 => TypeCategory::Float,
        }
    }

    pub fn is_bool(self) -> bool {
        self == Self::Bool
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self.category(),
            TypeCategory::SignedInt | TypeCategory::UnsignedInt
        )
    }

    /// Rust type used for fields of this kind in generated code.
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "String",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Short name used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            other => other.rust_type(),
        }
    }

    /// Inclusive value range of integer kinds.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let bits = self.bits()?;
        match self.category() {
            TypeCategory::SignedInt => {
                let max = (1i128 << (bits - 1)) - 1;
                Some((-max - 1, max))
            }
            TypeCategory::UnsignedInt => Some((0, (1i128 << bits) - 1)),
            _ => None,
        }
    }

    /// Parses a command-line token into a value of this kind.
    ///
    /// Booleans accept `true`/`1`, `false`/`0`, and the empty string (a
    /// flag given without `=value`) as `true`. Integers accept an optional
    /// sign and a `0x`, `0o` or `0b` radix prefix and are range checked.
    ///
    /// # Examples
    ///
    /// ```
    /// use clapdoc_core::{TypeKind, Value};
    ///
    /// assert_eq!(TypeKind::Bool.parse_value(""), Ok(Value::Bool(true)));
    /// assert_eq!(TypeKind::U8.parse_value("0xff"), Ok(Value::Int(255)));
    /// assert!(TypeKind::U8.parse_value("256").is_err());
    /// assert!(TypeKind::U32.parse_value("-1").is_err());
    /// assert_eq!(TypeKind::F64.parse_value("2.5"), Ok(Value::Float(2.5)));
    /// ```
    pub fn parse_value(self, text: &str) -> Result<Value, ValueError> {
        let invalid = || ValueError {
            kind: self,
            text: text.to_string(),
        };
        match self.category() {
            TypeCategory::Bool => match text {
                "" | "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            TypeCategory::String => Ok(Value::Str(text.to_string())),
            TypeCategory::SignedInt | TypeCategory::UnsignedInt => {
                let value = parse_integer(text).ok_or_else(invalid)?;
                let (min, max) = self.int_range().ok_or_else(invalid)?;
                if (min..=max).contains(&value) {
                    Ok(Value::Int(value))
                } else {
                    Err(invalid())
                }
            }
            TypeCategory::Float => {
                let value = if self == Self::F32 {
                    text.parse::<f32>().map(f64::from)
                } else {
                    text.parse::<f64>()
                };
                value.map(Value::Float).map_err(|_| invalid())
            }
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Splits off an optional sign and radix prefix, then parses the digits.
fn parse_integer(text: &str) -> Option<i128> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x").or(body.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = body.strip_prefix("0o").or(body.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = body.strip_prefix("0b").or(body.strip_prefix("0B")) {
        (2, d)
    } else {
        (10, body)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// A parsed command-line value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// A token that does not parse as the expected kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value \"{text}\"")]
pub struct ValueError {
    pub kind: TypeKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_aliases() {
        assert_eq!(TypeKind::classify("rune"), Some(TypeKind::I32));
        assert_eq!(TypeKind::classify("int"), Some(TypeKind::I64));
        assert_eq!(TypeKind::classify("usize"), Some(TypeKind::U64));
        assert_eq!(TypeKind::classify("String"), Some(TypeKind::String));
        assert_eq!(TypeKind::classify("complex64"), None);
    }

    #[test]
    fn test_int_ranges() {
        assert_eq!(TypeKind::I8.int_range(), Some((-128, 127)));
        assert_eq!(TypeKind::U16.int_range(), Some((0, 65535)));
        assert_eq!(TypeKind::U64.int_range(), Some((0, u64::MAX as i128)));
        assert_eq!(TypeKind::F32.int_range(), None);
    }

    #[test]
    fn test_parse_signed_bounds() {
        assert_eq!(TypeKind::I8.parse_value("-128"), Ok(Value::Int(-128)));
        assert!(TypeKind::I8.parse_value("128").is_err());
        assert_eq!(TypeKind::I16.parse_value("-0x10"), Ok(Value::Int(-16)));
        assert_eq!(TypeKind::I64.parse_value("+7"), Ok(Value::Int(7)));
    }

    #[test]
    fn test_parse_rejects_malformed_integers() {
        for bad in ["", "-", "0x", "--1", "1.5", "abc", "0b102"] {
            assert!(TypeKind::I32.parse_value(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(TypeKind::Bool.parse_value("1"), Ok(Value::Bool(true)));
        assert_eq!(TypeKind::Bool.parse_value("false"), Ok(Value::Bool(false)));
        let err = TypeKind::Bool.parse_value("yes").unwrap_err();
        assert_eq!(err.to_string(), "invalid bool value \"yes\"");
    }

    #[test]
    fn test_value_display_round_trips() {
        for (kind, text) in [
            (TypeKind::I32, "-42"),
            (TypeKind::U64, "18446744073709551615"),
            (TypeKind::F64, "0.1"),
            (TypeKind::Bool, "false"),
            (TypeKind::String, "hello world"),
        ] {
            let value = kind.parse_value(text).unwrap();
            assert_eq!(value.to_string(), text);
            assert_eq!(kind.parse_value(&value.to_string()), Ok(value));
        }
    }
}
