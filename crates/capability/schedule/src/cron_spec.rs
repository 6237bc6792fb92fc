use crate::error::ScheduleError;
use chrono::{Datelike, Local, NaiveDate, NaiveTime, TimeDelta, Timelike};
use domain::schedule::{parse_date, parse_time};
use domain::{Frequency, GeoLocation, ScheduleConfig, ScheduleSpec, ScheduleType, parse_duration};
use sunrise::{Coordinates, SolarDay, SolarEvent};

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// 由调度配置生成核心调度器规格（6 字段 cron 或 `@every`）。
///
/// 日出/日落按 `today` 计算，需要地理位置。
pub fn build_cron_spec(
    config: &ScheduleConfig,
    location: Option<&GeoLocation>,
    today: NaiveDate,
) -> Result<String, ScheduleError> {
    let spec = &config.spec;
    match config.schedule_type {
        ScheduleType::Repeat => {
            let interval = parse_duration(&spec.repeat_interval)?;
            if interval.is_zero() {
                return Err(ScheduleError::Config(
                    "repeat interval must be positive".to_string(),
                ));
            }
            Ok(format!("@every {}", spec.repeat_interval.trim()))
        }
        ScheduleType::Cron => {
            let expression = spec.cron_expression.trim();
            if expression.is_empty() {
                return Err(ScheduleError::Config("empty cron expression".to_string()));
            }
            Ok(expression.to_string())
        }
        ScheduleType::Simple => simple_spec(spec, parse_time(&spec.time)?),
        ScheduleType::Sunrise | ScheduleType::Sunset => {
            let location = location.ok_or_else(|| {
                ScheduleError::Location("location is not configured".to_string())
            })?;
            let time = sun_event_time(config.schedule_type, location, today, &spec.offset)?;
            simple_spec(spec, time)
        }
    }
}

/// 频率表 → `S M H DoM Mo DoW`。
fn simple_spec(spec: &ScheduleSpec, time: NaiveTime) -> Result<String, ScheduleError> {
    let (day_of_month, month, day_of_week) = match spec.frequency {
        Frequency::Daily | Frequency::Weekly => (
            "*".to_string(),
            "*".to_string(),
            normalize_day_of_week(&spec.day_of_week)?,
        ),
        Frequency::Monthly => {
            let date = spec.date_of_month.trim();
            if date.is_empty() {
                return Err(ScheduleError::Config("dateOfMonth is required".to_string()));
            }
            (date.to_string(), "*".to_string(), "*".to_string())
        }
        Frequency::OnDate => {
            let date = parse_date(&spec.date)?;
            (date.day().to_string(), date.month().to_string(), "*".to_string())
        }
    };
    Ok(format!(
        "{} {} {} {} {} {}",
        time.second(),
        time.minute(),
        time.hour(),
        day_of_month,
        month,
        day_of_week
    ))
}

/// 星期列表：`0`–`6`（`7` 同 `0`）转换成名称，空串为 `*`，名称原样保留。
pub fn normalize_day_of_week(input: &str) -> Result<String, ScheduleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok("*".to_string());
    }
    let days = trimmed
        .split(',')
        .map(str::trim)
        .filter(|day| !day.is_empty())
        .map(|day| match day.parse::<usize>() {
            Ok(index) if index <= 7 => Ok(DAY_NAMES[index % 7].to_string()),
            Ok(_) => Err(ScheduleError::Config(format!("invalid day of week: {day}"))),
            Err(_) => Ok(day.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(days.join(","))
}

/// 本地时区下的日出/日落时间，叠加带符号偏移（如 `-30m`）。
pub fn sun_event_time(
    schedule_type: ScheduleType,
    location: &GeoLocation,
    date: NaiveDate,
    offset: &str,
) -> Result<NaiveTime, ScheduleError> {
    let coordinates = Coordinates::new(location.latitude, location.longitude).ok_or_else(|| {
        ScheduleError::Location(format!(
            "invalid coordinates: {}, {}",
            location.latitude, location.longitude
        ))
    })?;
    let event = match schedule_type {
        ScheduleType::Sunrise => SolarEvent::Sunrise,
        ScheduleType::Sunset => SolarEvent::Sunset,
        other => {
            return Err(ScheduleError::Config(format!(
                "{} is not a solar schedule",
                other.as_str()
            )));
        }
    };
    let offset = if offset.trim().is_empty() {
        TimeDelta::zero()
    } else {
        domain::parse_signed_duration(offset)?
    };
    let at = SolarDay::new(coordinates, date)
        .event_time(event)
        .with_timezone(&Local)
        + offset;
    Ok(at.time().with_nanosecond(0).unwrap_or(at.time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ScheduleSpec;

    fn config(schedule_type: ScheduleType, spec: ScheduleSpec) -> ScheduleConfig {
        ScheduleConfig {
            id: "s1".to_string(),
            schedule_type,
            spec,
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 21).expect("date")
    }

    #[test]
    fn repeat_uses_every() {
        let spec = ScheduleSpec {
            repeat_interval: "90s".to_string(),
            ..Default::default()
        };
        let cron = build_cron_spec(&config(ScheduleType::Repeat, spec), None, today()).expect("spec");
        assert_eq!(cron, "@every 90s");
    }

    #[test]
    fn simple_daily_and_weekly() {
        let daily = ScheduleSpec {
            frequency: Frequency::Daily,
            time: "07:30:15".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_cron_spec(&config(ScheduleType::Simple, daily), None, today()).expect("daily"),
            "15 30 7 * * *"
        );
        let weekly = ScheduleSpec {
            frequency: Frequency::Weekly,
            time: "18:00".to_string(),
            day_of_week: "1,3,5".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_cron_spec(&config(ScheduleType::Simple, weekly), None, today()).expect("weekly"),
            "0 0 18 * * Mon,Wed,Fri"
        );
    }

    #[test]
    fn simple_monthly_and_on_date() {
        let monthly = ScheduleSpec {
            frequency: Frequency::Monthly,
            time: "06:00:00".to_string(),
            date_of_month: "15".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_cron_spec(&config(ScheduleType::Simple, monthly), None, today()).expect("monthly"),
            "0 0 6 15 * *"
        );
        let on_date = ScheduleSpec {
            frequency: Frequency::OnDate,
            time: "08:00:00".to_string(),
            date: "2099-01-05".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_cron_spec(&config(ScheduleType::Simple, on_date), None, today()).expect("on date"),
            "0 0 8 5 1 *"
        );
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let missing_time = ScheduleSpec::default();
        assert!(build_cron_spec(&config(ScheduleType::Simple, missing_time), None, today()).is_err());
        assert!(build_cron_spec(&config(ScheduleType::Cron, ScheduleSpec::default()), None, today()).is_err());
        assert!(normalize_day_of_week("9").is_err());
        assert_eq!(normalize_day_of_week("0,7").expect("sunday"), "Sun,Sun");
    }

    #[test]
    fn sunrise_needs_location() {
        let spec = ScheduleSpec {
            frequency: Frequency::Daily,
            ..Default::default()
        };
        let err = build_cron_spec(&config(ScheduleType::Sunrise, spec), None, today())
            .expect_err("location");
        assert!(matches!(err, ScheduleError::Location(_)));
    }

    #[test]
    fn sunset_offset_moves_time() {
        let location = GeoLocation {
            latitude: 52.52,
            longitude: 13.405,
        };
        let base = sun_event_time(ScheduleType::Sunset, &location, today(), "").expect("sunset");
        let earlier =
            sun_event_time(ScheduleType::Sunset, &location, today(), "-30m").expect("offset");
        assert_eq!(base - earlier, TimeDelta::minutes(30));
    }
}
