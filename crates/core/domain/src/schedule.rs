//! 用户调度配置。

use crate::error::DomainError;
use crate::labels::Labels;
use crate::resource::Resource;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    #[default]
    Repeat,
    Cron,
    Simple,
    Sunrise,
    Sunset,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Repeat => "repeat",
            ScheduleType::Cron => "cron",
            ScheduleType::Simple => "simple",
            ScheduleType::Sunrise => "sunrise",
            ScheduleType::Sunset => "sunset",
        }
    }

    /// simple / sunrise / sunset 按频率表生成 cron。
    pub fn uses_frequency(&self) -> bool {
        matches!(
            self,
            ScheduleType::Simple | ScheduleType::Sunrise | ScheduleType::Sunset
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    OnDate,
}

/// 调度规格，各类型使用其中的一部分字段。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSpec {
    pub frequency: Frequency,
    /// `HH:MM:SS`
    pub time: String,
    pub day_of_week: String,
    pub date_of_month: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub cron_expression: String,
    pub repeat_interval: String,
    pub repeat_count: u64,
    /// 日出/日落偏移，如 `-30m`。
    pub offset: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.from.trim().is_empty() && self.to.trim().is_empty()
    }
}

/// 有效期窗口。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Validity {
    pub enabled: bool,
    pub date: DateRange,
    pub time: DateRange,
    pub validate_time_everyday: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// 默认 10s。
    pub timeout: String,
}

/// 自定义变量加载器。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum CustomVariable {
    #[default]
    None,
    Javascript(String),
    Webhook(WebhookConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleState {
    pub last_run: Option<DateTime<Utc>>,
    pub executed_count: u64,
    pub last_status: bool,
    pub message: String,
}

/// 调度配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub labels: Labels,
    #[serde(rename = "type", default)]
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub spec: ScheduleSpec,
    #[serde(default)]
    pub validity: Validity,
    /// 变量定义：名称 → 引用（`field:…`、`node:…`）或字面量。
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub custom_variable: CustomVariable,
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default)]
    pub handler_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub state: ScheduleState,
}

impl ScheduleConfig {
    /// 一次性（指定日期）调度。
    pub fn is_on_date(&self) -> bool {
        self.schedule_type.uses_frequency() && self.spec.frequency == Frequency::OnDate
    }
}

impl Resource for ScheduleConfig {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn resource_kind(&self) -> &str {
        self.schedule_type.as_str()
    }

    fn resource_labels(&self) -> &Labels {
        &self.labels
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// 地理位置（日出/日落计算）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// 解析 `YYYY-MM-DD`。
pub fn parse_date(input: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDateTime(input.to_string()))
}

/// 解析 `HH:MM:SS` 或 `HH:MM`。
pub fn parse_time(input: &str) -> Result<NaiveTime, DomainError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| DomainError::InvalidDateTime(input.to_string()))
}
