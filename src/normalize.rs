use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A normalized reading as exposed on an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(val) => write!(f, "{val}"),
            SensorValue::Float(val) => write!(f, "{val}"),
            SensorValue::Text(val) => write!(f, "{val}"),
        }
    }
}

impl From<i64> for SensorValue {
    fn from(val: i64) -> Self {
        SensorValue::Integer(val)
    }
}

impl From<f64> for SensorValue {
    fn from(val: f64) -> Self {
        SensorValue::Float(val)
    }
}

impl From<&str> for SensorValue {
    fn from(val: &str) -> Self {
        SensorValue::Text(val.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Tenths of a degree celsius
    Temperature,
    /// Tenths of a Pascal
    Pressure,
    /// Bypass opening, the raw value is a 0-100 percentage
    BypassPosition,
    PassThrough,
}

impl Normalizer {
    /// Absent input stays absent, it never defaults to zero.
    pub fn normalize(&self, raw: Option<&Value>) -> Option<SensorValue> {
        let raw = raw?;
        match self {
            Normalizer::Temperature => as_f64(raw).map(|val| SensorValue::Float(val / 10.0)),
            Normalizer::Pressure => as_f64(raw).map(|val| SensorValue::Float(val / 10.0)),
            Normalizer::BypassPosition => as_f64(raw).map(|val| SensorValue::Integer(val.round() as i64)),
            Normalizer::PassThrough => pass_through(raw),
        }
    }
}

fn as_f64(raw: &Value) -> Option<f64> {
    let val = raw.as_f64();
    if val.is_none() {
        log::debug!("Expected a numeric value, got '{raw}'");
    }

    val
}

fn pass_through(raw: &Value) -> Option<SensorValue> {
    match raw {
        Value::Number(nr) => match nr.as_i64() {
            Some(val) => Some(SensorValue::Integer(val)),
            None => nr.as_f64().map(SensorValue::Float),
        },
        Value::String(val) => Some(SensorValue::Text(val.clone())),
        Value::Bool(val) => Some(SensorValue::Text(val.to_string())),
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => {
            log::debug!("Unsupported value for pass through: '{raw}'");
            None
        }
    }
}
