use crate::error::ScheduleError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use domain::ScheduleConfig;
use domain::schedule::{parse_date, parse_time};

/// 一次性调度：开启有效期并把日期窗口固定在指定日期。
pub fn pin_on_date(config: &mut ScheduleConfig) -> Result<(), ScheduleError> {
    if !config.is_on_date() {
        return Ok(());
    }
    let date = parse_date(&config.spec.date)?;
    let date = date.format("%Y-%m-%d").to_string();
    config.validity.enabled = true;
    config.validity.date.from = date.clone();
    config.validity.date.to = date;
    Ok(())
}

/// 有效期判定：日期窗口（含时间）以及可选的每日时间窗口。
pub fn is_valid_schedule(config: &ScheduleConfig, now: DateTime<Local>) -> Result<bool, ScheduleError> {
    let validity = &config.validity;
    if !validity.enabled {
        return Ok(true);
    }

    if !validity.date.from.trim().is_empty() {
        let time = time_or(&validity.time.from, NaiveTime::MIN)?;
        let from = local(parse_date(&validity.date.from)?, time)?;
        if now < from {
            return Ok(false);
        }
    }
    if !validity.date.to.trim().is_empty() {
        let time = time_or(&validity.time.to, end_of_day())?;
        let to = local(parse_date(&validity.date.to)?, time)?;
        if now > to {
            return Ok(false);
        }
    }

    if validity.validate_time_everyday && !validity.time.is_empty() {
        let current = hhmmss(now.time());
        let from = hhmmss(time_or(&validity.time.from, NaiveTime::MIN)?);
        let to = hhmmss(time_or(&validity.time.to, end_of_day())?);
        if current < from || current > to {
            return Ok(false);
        }
    }
    Ok(true)
}

fn time_or(input: &str, default: NaiveTime) -> Result<NaiveTime, ScheduleError> {
    if input.trim().is_empty() {
        Ok(default)
    } else {
        Ok(parse_time(input)?)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

fn local(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>, ScheduleError> {
    let naive = NaiveDateTime::new(date, time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ScheduleError::Config(format!("nonexistent local time: {naive}")))
}

fn hhmmss(time: NaiveTime) -> u32 {
    time.format("%H%M%S")
        .to_string()
        .parse()
        .unwrap_or_default()
}
