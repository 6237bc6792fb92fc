//! 指标类型与字段值转换。

use crate::error::DomainError;
use crate::labels::parse_bool;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 字段值的指标类型，决定存储格式与指标写入策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    #[default]
    None,
    String,
    Counter,
    Gauge,
    GaugeFloat,
    Binary,
    Geo,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::None => "none",
            MetricType::String => "string",
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::GaugeFloat => "gauge_float",
            MetricType::Binary => "binary",
            MetricType::Geo => "geo",
        }
    }

    /// 将原始值强制转换为本类型。
    ///
    /// - binary → bool
    /// - gauge / counter → i64
    /// - gauge_float → f64
    /// - string → 字符串
    /// - geo → `"lat;lon[;alt]"`
    /// - none → 原样透传
    pub fn convert(&self, value: &serde_json::Value) -> Result<FieldValue, DomainError> {
        match self {
            MetricType::None => Ok(passthrough(value)),
            MetricType::String => Ok(FieldValue::String(value_to_string(value))),
            MetricType::Binary => to_bool(value)
                .map(FieldValue::Bool)
                .ok_or_else(|| self.invalid(value)),
            MetricType::Counter | MetricType::Gauge => to_i64(value)
                .map(FieldValue::I64)
                .ok_or_else(|| self.invalid(value)),
            MetricType::GaugeFloat => to_f64(value)
                .map(FieldValue::F64)
                .ok_or_else(|| self.invalid(value)),
            MetricType::Geo => match value {
                serde_json::Value::Object(_) => serde_json::from_value::<GeoValue>(value.clone())
                    .map(FieldValue::Geo)
                    .map_err(|_| DomainError::InvalidGeo(value.to_string())),
                other => GeoValue::parse(&value_to_string(other)).map(FieldValue::Geo),
            },
        }
    }

    fn invalid(&self, value: &serde_json::Value) -> DomainError {
        DomainError::InvalidValue {
            metric_type: self.as_str().to_string(),
            value: value_to_string(value),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 地理位置值。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoValue {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoValue {
    /// 解析 `"lat;lon[;alt]"`。
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidGeo(input.to_string());
        let parts: Vec<&str> = input.split(';').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }
        let latitude = parts[0].parse::<f64>().map_err(|_| invalid())?;
        let longitude = parts[1].parse::<f64>().map_err(|_| invalid())?;
        let altitude = match parts.get(2) {
            Some(raw) if !raw.is_empty() => raw.parse::<f64>().map_err(|_| invalid())?,
            _ => 0.0,
        };
        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }
}

impl fmt::Display for GeoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.latitude, self.longitude, self.altitude)
    }
}

/// 字段值（已按指标类型转换）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Geo(GeoValue),
}

impl FieldValue {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::I64(v) => write!(f, "{v}"),
            FieldValue::F64(v) => write!(f, "{v}"),
            FieldValue::String(v) => f.write_str(v),
            FieldValue::Geo(v) => write!(f, "{v}"),
        }
    }
}

/// JSON 值转字符串；字符串不带引号。
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(v) => v.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn passthrough(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Bool(v) => FieldValue::Bool(*v),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(v) => FieldValue::I64(v),
            None => FieldValue::F64(n.as_f64().unwrap_or_default()),
        },
        other => FieldValue::String(value_to_string(other)),
    }
}

fn to_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(v) => Some(*v),
        serde_json::Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        serde_json::Value::String(s) => {
            let normalized = s.trim().to_ascii_lowercase();
            if parse_bool(&normalized) {
                return Some(true);
            }
            match normalized.as_str() {
                "false" | "0" | "no" | "off" | "n" | "" => Some(false),
                other => other.parse::<f64>().ok().map(|v| v != 0.0),
            }
        }
        _ => None,
    }
}

fn to_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Bool(v) => Some(i64::from(*v)),
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|v| v as i64))
        }
        _ => None,
    }
}

fn to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn binary_accepts_common_spellings() {
        assert_eq!(
            MetricType::Binary.convert(&json!("on")).expect("on"),
            FieldValue::Bool(true)
        );
        assert_eq!(
            MetricType::Binary.convert(&json!("0")).expect("0"),
            FieldValue::Bool(false)
        );
        assert!(MetricType::Binary.convert(&json!("maybe")).is_err());
    }

    #[test]
    fn gauge_truncates_float_strings() {
        assert_eq!(
            MetricType::Gauge.convert(&json!("42.7")).expect("gauge"),
            FieldValue::I64(42)
        );
        assert_eq!(
            MetricType::GaugeFloat.convert(&json!("22.5")).expect("float"),
            FieldValue::F64(22.5)
        );
    }

    #[test]
    fn geo_parses_three_parts() {
        let value = MetricType::Geo.convert(&json!("55.7;13.0;18")).expect("geo");
        assert_eq!(
            value,
            FieldValue::Geo(GeoValue {
                latitude: 55.7,
                longitude: 13.0,
                altitude: 18.0,
            })
        );
        assert!(GeoValue::parse("55.7").is_err());
    }

    #[test]
    fn none_passes_value_through() {
        assert_eq!(
            MetricType::None.convert(&json!("abc")).expect("none"),
            FieldValue::String("abc".to_string())
        );
        assert_eq!(
            MetricType::None.convert(&json!(3)).expect("none"),
            FieldValue::I64(3)
        );
    }

    #[test]
    fn float_display_drops_trailing_zero() {
        assert_eq!(FieldValue::F64(1.0).to_string(), "1");
        assert_eq!(FieldValue::F64(22.5).to_string(), "22.5");
    }
}
