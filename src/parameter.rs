use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::numeric_field::format_number;
use crate::transform::Vec3Data;

/// Typed payload of a single object parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    UInt(u32),
    Float(f32),
    String(String),
    Vector3(Vec3Data),
}

impl ParamValue {
    /// False for float components that cannot be written back to a set file.
    pub fn is_finite(&self) -> bool {
        match self {
            ParamValue::Float(v) => v.is_finite(),
            ParamValue::Vector3(v) => v.x.is_finite() && v.y.is_finite() && v.z.is_finite(),
            _ => true,
        }
    }

    /// Parses `text` into a value of the same variant as `self`.
    pub fn parse_like(&self, text: &str) -> Result<ParamValue> {
        let trimmed = text.trim();
        let value = match self {
            ParamValue::Bool(_) => ParamValue::Bool(
                parse_bool(trimmed).ok_or_else(|| anyhow!("Invalid boolean '{trimmed}'. Use true/false."))?,
            ),
            ParamValue::Byte(_) => {
                ParamValue::Byte(trimmed.parse().with_context(|| format!("Invalid byte '{trimmed}'"))?)
            }
            ParamValue::Int(_) => {
                ParamValue::Int(trimmed.parse().with_context(|| format!("Invalid integer '{trimmed}'"))?)
            }
            ParamValue::UInt(_) => ParamValue::UInt(
                trimmed.parse().with_context(|| format!("Invalid unsigned integer '{trimmed}'"))?,
            ),
            ParamValue::Float(_) => ParamValue::Float(parse_finite(trimmed)?),
            ParamValue::String(_) => ParamValue::String(text.to_string()),
            ParamValue::Vector3(_) => ParamValue::Vector3(parse_vector3(trimmed)?.into()),
        };
        Ok(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Byte(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::UInt(v) => write!(f, "{v}"),
            ParamValue::Float(v) => f.write_str(&format_number(*v)),
            ParamValue::String(v) => f.write_str(v),
            ParamValue::Vector3(v) => {
                write!(f, "{}, {}, {}", format_number(v.x), format_number(v.y), format_number(v.z))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameter {
    pub data: ParamValue,
}

impl Parameter {
    pub fn new(data: ParamValue) -> Self {
        Self { data }
    }

    pub fn display_text(&self) -> String {
        self.data.to_string()
    }
}

impl From<ParamValue> for Parameter {
    fn from(data: ParamValue) -> Self {
        Self { data }
    }
}

/// Accepts `1/0`, `true/false`, `on/off` and `yes/no`, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_finite(value: &str) -> Result<f32> {
    let parsed = value.parse::<f32>().with_context(|| format!("Invalid number '{value}'"))?;
    if !parsed.is_finite() {
        bail!("Number '{value}' is not finite");
    }
    Ok(parsed)
}

fn parse_vector3(value: &str) -> Result<Vec3> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("Expected three comma-separated components, got '{value}'");
    }
    Ok(Vec3::new(parse_finite(parts[0])?, parse_finite(parts[1])?, parse_finite(parts[2])?))
}
