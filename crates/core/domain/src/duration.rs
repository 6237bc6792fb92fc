//! 时长字符串解析（`15s`、`200ms`、`1h30m`、`-30m`）。

use crate::error::DomainError;
use std::time::Duration;

/// 解析非负时长。
pub fn parse_duration(input: &str) -> Result<Duration, DomainError> {
    let (negative, duration) = parse_parts(input)?;
    if negative && !duration.is_zero() {
        return Err(DomainError::InvalidDuration(input.to_string()));
    }
    Ok(duration)
}

/// 解析带符号时长（日出/日落偏移）。
pub fn parse_signed_duration(input: &str) -> Result<chrono::TimeDelta, DomainError> {
    let (negative, duration) = parse_parts(input)?;
    let delta = chrono::TimeDelta::from_std(duration)
        .map_err(|_| DomainError::InvalidDuration(input.to_string()))?;
    Ok(if negative { -delta } else { delta })
}

/// 解析时长，空串返回默认值。
pub fn parse_duration_or(input: &str, default: Duration) -> Result<Duration, DomainError> {
    if input.trim().is_empty() {
        return Ok(default);
    }
    parse_duration(input)
}

fn parse_parts(input: &str) -> Result<(bool, Duration), DomainError> {
    let invalid = || DomainError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    let (negative, mut rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if rest.is_empty() {
        return Err(invalid());
    }
    if rest == "0" {
        return Ok((negative, Duration::ZERO));
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        let tail = &rest[number_end..];
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let factor = match &tail[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            _ => return Err(invalid()),
        };
        total_nanos += number * factor;
        rest = &tail[unit_end..];
    }
    Ok((negative, Duration::from_nanos(total_nanos as u64)))
}
