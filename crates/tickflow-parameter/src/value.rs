//! Value representations and the conversion matrix between them.
//!
//! A [`Parameter`](crate::Parameter) stores its value in the representation
//! implied by its [`DataType`]. Reads and writes go through the
//! [`ParameterValue`] trait, which converts between the caller's Rust type and
//! that representation:
//!
//! | Stored as | Data types |
//! |-----------|------------|
//! | `u64` | `Unsigned`, `Boolean` |
//! | `i64` | `Signed`, `Enum` |
//! | `f64` | `Float` |
//! | `String` | `String` |
//! | `Vec<u8>` | `ByteArray` |
//!
//! Numeric cross conversions are plain `as` casts. Malformed text never
//! raises: the target keeps whatever value it had before the call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Byte sequence value.
pub type ByteArray = Vec<u8>;

/// Mapping of enumerate key to display text.
pub type EnumList = BTreeMap<i64, String>;

/// The representation a parameter value is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// 64-bit floating point.
    #[default]
    Float,
    /// Signed 64-bit integer.
    Signed,
    /// Unsigned 64-bit integer.
    Unsigned,
    /// Boolean, stored as an unsigned integer.
    Boolean,
    /// Free text.
    String,
    /// Enumerate, stored as a signed key into the parameter's enum list.
    Enum,
    /// Raw bytes.
    ByteArray,
}

impl DataType {
    /// All data types in declaration order.
    pub const ALL: [DataType; 7] = [
        DataType::Float,
        DataType::Signed,
        DataType::Unsigned,
        DataType::Boolean,
        DataType::String,
        DataType::Enum,
        DataType::ByteArray,
    ];

    /// Display label, also used in persisted documents.
    pub fn label(self) -> &'static str {
        match self {
            DataType::Float => "Float",
            DataType::Signed => "Signed",
            DataType::Unsigned => "Unsigned",
            DataType::Boolean => "Boolean",
            DataType::String => "String",
            DataType::Enum => "Enumerate",
            DataType::ByteArray => "Byte Array",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Some(found) = Self::ALL
            .iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
        {
            return Ok(*found);
        }
        match wanted.to_ascii_lowercase().as_str() {
            "enum" => Ok(DataType::Enum),
            "bytearray" | "bytes" => Ok(DataType::ByteArray),
            "bool" => Ok(DataType::Boolean),
            _ => Err(format!("unknown data type '{wanted}'")),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DataType {
    /// Unknown labels fall back to the default type rather than failing the
    /// whole document.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "using default data type");
            DataType::default()
        }))
    }
}

/// Interpret text as a boolean.
///
/// True when the text starts with `T`, `Y`, `1` or `E` (any case), or starts
/// with `ON` (any case). Everything else, including the empty string, is false.
pub fn text_to_bool(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some('T' | 't' | 'Y' | 'y' | '1' | 'E' | 'e') => true,
        Some('O' | 'o') => matches!(chars.next(), Some('N' | 'n')),
        _ => false,
    }
}

/// The lock-protected storage behind a parameter.
///
/// Only the field matching the parameter's data type is meaningful.
#[derive(Debug, Clone, Default)]
pub struct ValueCell {
    pub(crate) valid: bool,
    pub(crate) float: f64,
    pub(crate) signed: i64,
    pub(crate) unsigned: u64,
    pub(crate) text: String,
    pub(crate) bytes: ByteArray,
}

/// A Rust type that can be written to and read from a parameter.
///
/// Implemented for the primitive numeric types, `bool`, `String` and
/// [`ByteArray`].
pub trait ParameterValue: Sized {
    /// Store `self` in `cell` using the representation of `data_type`.
    fn store(&self, cell: &mut ValueCell, data_type: DataType, enums: &EnumList);

    /// Convert the representation in `cell` into `out`.
    ///
    /// When no conversion applies (malformed text, unknown enumerate key),
    /// `out` is left untouched.
    fn load(out: &mut Self, cell: &ValueCell, data_type: DataType, enums: &EnumList);
}

fn parse_trimmed<T: FromStr>(text: &str) -> Option<T> {
    text.trim().parse().ok()
}

macro_rules! numeric_value {
    ($($t:ty),* $(,)?) => {$(
        impl ParameterValue for $t {
            fn store(&self, cell: &mut ValueCell, data_type: DataType, _enums: &EnumList) {
                let value = *self;
                match data_type {
                    DataType::Boolean | DataType::Unsigned => cell.unsigned = value as u64,
                    DataType::Signed | DataType::Enum => cell.signed = value as i64,
                    DataType::Float => cell.float = value as f64,
                    DataType::String => cell.text = value.to_string(),
                    DataType::ByteArray => cell.bytes = value.to_ne_bytes().to_vec(),
                }
            }

            fn load(out: &mut Self, cell: &ValueCell, data_type: DataType, _enums: &EnumList) {
                match data_type {
                    DataType::Boolean | DataType::Unsigned => *out = cell.unsigned as $t,
                    DataType::Signed | DataType::Enum => *out = cell.signed as $t,
                    DataType::Float => *out = cell.float as $t,
                    DataType::String => {
                        if let Some(value) = parse_trimmed::<$t>(&cell.text) {
                            *out = value;
                        }
                    }
                    DataType::ByteArray => {
                        if let Some(first) = cell.bytes.first() {
                            *out = *first as $t;
                        }
                    }
                }
            }
        }
    )*};
}

numeric_value!(f64, f32, i64, i32, i16, i8, isize, u64, u32, u16, u8, usize);

impl ParameterValue for bool {
    fn store(&self, cell: &mut ValueCell, data_type: DataType, _enums: &EnumList) {
        let value = *self;
        match data_type {
            DataType::Boolean | DataType::Unsigned => cell.unsigned = u64::from(value),
            DataType::Signed | DataType::Enum => cell.signed = i64::from(value),
            DataType::Float => cell.float = if value { 1.0 } else { 0.0 },
            DataType::String => cell.text = if value { "1" } else { "0" }.to_string(),
            DataType::ByteArray => cell.bytes = vec![u8::from(value)],
        }
    }

    fn load(out: &mut Self, cell: &ValueCell, data_type: DataType, enums: &EnumList) {
        match data_type {
            DataType::Boolean | DataType::Unsigned => *out = cell.unsigned > 0,
            DataType::Signed => *out = cell.signed > 0,
            DataType::Float => *out = cell.float > 0.5,
            DataType::String => *out = text_to_bool(&cell.text),
            DataType::Enum => {
                if let Some(text) = enums.get(&cell.signed) {
                    *out = text_to_bool(text);
                }
            }
            DataType::ByteArray => {
                if let Some(first) = cell.bytes.first() {
                    *out = *first != 0;
                }
            }
        }
    }
}

/// Store text in the representation of `data_type`.
pub(crate) fn store_text(text: &str, cell: &mut ValueCell, data_type: DataType, enums: &EnumList) {
    match data_type {
        DataType::Boolean => cell.unsigned = u64::from(text_to_bool(text)),
        DataType::Unsigned => {
            if let Some(value) = parse_trimmed(text) {
                cell.unsigned = value;
            }
        }
        DataType::Enum => {
            if let Some((key, _)) = enums.iter().find(|(_, display)| display.as_str() == text) {
                cell.signed = *key;
            } else if let Some(value) = parse_trimmed(text) {
                cell.signed = value;
            }
        }
        DataType::Signed => {
            if let Some(value) = parse_trimmed(text) {
                cell.signed = value;
            }
        }
        DataType::Float => {
            if let Some(value) = parse_trimmed(text) {
                cell.float = value;
            }
        }
        DataType::String => cell.text = text.to_string(),
        DataType::ByteArray => cell.bytes = text.as_bytes().to_vec(),
    }
}

impl ParameterValue for String {
    fn store(&self, cell: &mut ValueCell, data_type: DataType, enums: &EnumList) {
        store_text(self, cell, data_type, enums);
    }

    fn load(out: &mut Self, cell: &ValueCell, data_type: DataType, enums: &EnumList) {
        match data_type {
            DataType::Boolean => *out = if cell.unsigned > 0 { "1" } else { "0" }.to_string(),
            DataType::Signed => *out = cell.signed.to_string(),
            DataType::Unsigned => *out = cell.unsigned.to_string(),
            DataType::Float => *out = cell.float.to_string(),
            DataType::String => out.clone_from(&cell.text),
            DataType::Enum => *out = enums.get(&cell.signed).cloned().unwrap_or_default(),
            DataType::ByteArray => *out = String::from_utf8_lossy(&cell.bytes).into_owned(),
        }
    }
}

impl ParameterValue for ByteArray {
    fn store(&self, cell: &mut ValueCell, data_type: DataType, _enums: &EnumList) {
        let first = self.first().copied().unwrap_or(0);
        match data_type {
            DataType::Unsigned | DataType::Boolean => cell.unsigned = u64::from(first),
            DataType::Signed | DataType::Enum => cell.signed = i64::from(first),
            DataType::Float => cell.float = f64::from(first),
            DataType::String => cell.text = String::from_utf8_lossy(self).into_owned(),
            DataType::ByteArray => cell.bytes.clone_from(self),
        }
    }

    fn load(out: &mut Self, cell: &ValueCell, data_type: DataType, enums: &EnumList) {
        match data_type {
            DataType::Boolean => *out = vec![u8::from(cell.unsigned > 0)],
            DataType::Signed => *out = cell.signed.to_ne_bytes().to_vec(),
            DataType::Unsigned => *out = cell.unsigned.to_ne_bytes().to_vec(),
            DataType::Float => *out = cell.float.to_ne_bytes().to_vec(),
            DataType::String => *out = cell.text.as_bytes().to_vec(),
            DataType::Enum => {
                *out = enums
                    .get(&cell.signed)
                    .map(|text| text.as_bytes().to_vec())
                    .unwrap_or_default();
            }
            DataType::ByteArray => out.clone_from(&cell.bytes),
        }
    }
}

/// Persist an [`EnumList`] as a list of `{ key, text }` items, since TOML
/// tables only accept string keys.
pub(crate) mod enum_list_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::EnumList;

    #[derive(Serialize, Deserialize)]
    struct EnumItem {
        key: i64,
        #[serde(default)]
        text: String,
    }

    pub fn serialize<S: Serializer>(list: &EnumList, serializer: S) -> Result<S::Ok, S::Error> {
        let items: Vec<EnumItem> = list
            .iter()
            .map(|(key, text)| EnumItem {
                key: *key,
                text: text.clone(),
            })
            .collect();
        items.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EnumList, D::Error> {
        let items = Vec::<EnumItem>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|item| (item.key, item.text)).collect())
    }
}
