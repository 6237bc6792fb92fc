use crate::error::SchedulerError;
use chrono::{DateTime, Local, TimeDelta};
use std::str::FromStr;
use std::time::Duration;

/// 已解析的任务规格。
#[derive(Debug, Clone)]
pub enum JobSpec {
    /// 6 字段 cron：秒 分 时 日 月 周。
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

impl JobSpec {
    /// 支持 6 字段 cron、`@every <duration>` 及 `@daily` 等简写。
    pub fn parse(spec: &str) -> Result<Self, SchedulerError> {
        let trimmed = spec.trim();
        let invalid = |reason: String| SchedulerError::InvalidSpec {
            spec: spec.to_string(),
            reason,
        };

        if let Some(raw) = trimmed.strip_prefix("@every") {
            let interval = domain::parse_duration(raw.trim()).map_err(|err| invalid(err.to_string()))?;
            if interval.is_zero() {
                return Err(invalid("interval must be positive".to_string()));
            }
            return Ok(JobSpec::Every(interval));
        }

        let expression = match trimmed {
            "@yearly" | "@annually" => "0 0 0 1 1 *",
            "@monthly" => "0 0 0 1 * *",
            "@weekly" => "0 0 0 * * Sun",
            "@daily" | "@midnight" => "0 0 0 * * *",
            "@hourly" => "0 0 * * * *",
            other => other,
        };
        let fields = expression.split_whitespace().count();
        if fields != 6 {
            return Err(invalid(format!("expected 6 fields, got {fields}")));
        }
        cron::Schedule::from_str(expression)
            .map(|schedule| JobSpec::Cron(Box::new(schedule)))
            .map_err(|err| invalid(err.to_string()))
    }

    /// `after` 之后的下一次触发时间。
    pub fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            JobSpec::Cron(schedule) => schedule.after(&after).next(),
            JobSpec::Every(interval) => {
                TimeDelta::from_std(*interval)
                    .ok()
                    .and_then(|delta| after.checked_add_signed(delta))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn parses_every_interval() {
        match JobSpec::parse("@every 1m30s").expect("every") {
            JobSpec::Every(interval) => assert_eq!(interval, Duration::from_secs(90)),
            other => panic!("unexpected spec: {other:?}"),
        }
        assert!(JobSpec::parse("@every 0s").is_err());
        assert!(JobSpec::parse("@every soon").is_err());
    }

    #[test]
    fn rejects_five_field_cron() {
        assert!(JobSpec::parse("*/5 * * * *").is_err());
        assert!(JobSpec::parse("0 */5 * * * *").is_ok());
    }

    #[test]
    fn daily_shortcut_fires_at_midnight() {
        let spec = JobSpec::parse("@daily").expect("daily");
        let now = Local
            .with_ymd_and_hms(2030, 3, 10, 13, 45, 0)
            .single()
            .expect("local time");
        let next = spec.next_after(now).expect("next");
        assert_eq!((next.hour(), next.minute(), next.second()), (0, 0, 0));
        assert!(next > now);
    }
}
