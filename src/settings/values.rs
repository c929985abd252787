//! Lenient value types for the options record.
//!
//! The record is written by the admin form (everything arrives as text), by
//! older installs (numbers and strings mixed freely) and by this crate. These
//! wrappers accept all of those shapes and write back one canonical form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// On/off toggle, persisted as `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag(pub bool);

impl Flag {
    pub const ON: Flag = Flag(true);
    pub const OFF: Flag = Flag(false);

    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn from_value(value: &Value) -> Self {
        let on = match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            ),
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        };
        Flag(on)
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        Flag(b)
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Flag::from_value(&value))
    }
}

/// Integer setting that keeps unparsable input verbatim instead of rejecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LooseInt {
    Int(i64),
    Raw(String),
}

impl LooseInt {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LooseInt::Int(n) => Some(*n),
            LooseInt::Raw(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, LooseInt::Raw(s) if s.trim().is_empty())
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => LooseInt::Int(i),
                None => LooseInt::Raw(n.to_string()),
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => LooseInt::Int(i),
                Err(_) => LooseInt::Raw(s),
            },
            Value::Bool(b) => LooseInt::Int(i64::from(b)),
            Value::Null => LooseInt::Raw(String::new()),
            other => LooseInt::Raw(other.to_string()),
        }
    }
}

impl Default for LooseInt {
    fn default() -> Self {
        LooseInt::Raw(String::new())
    }
}

impl From<i64> for LooseInt {
    fn from(n: i64) -> Self {
        LooseInt::Int(n)
    }
}

impl fmt::Display for LooseInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LooseInt::Int(n) => write!(f, "{}", n),
            LooseInt::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for LooseInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LooseInt::Int(n) => serializer.serialize_i64(*n),
            LooseInt::Raw(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for LooseInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(LooseInt::from_value)
    }
}

/// Comma separated list (post ids, custom field names), persisted as `"a,b,c"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommaList(pub Vec<String>);

impl CommaList {
    pub fn parse(raw: &str) -> Self {
        CommaList(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.iter().any(|s| s == item)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CommaList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl Serialize for CommaList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CommaList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let list = match Value::deserialize(deserializer)? {
            Value::String(s) => CommaList::parse(&s),
            Value::Array(items) => CommaList(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::Number(n) => CommaList(vec![n.to_string()]),
            _ => CommaList::default(),
        };
        Ok(list)
    }
}
