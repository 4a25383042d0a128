//! Small parsing helpers shared by the config sections.

use std::time::Duration;

use serde_yaml::Value;

use crate::{McError, Result};

/// Parses a duration the way machine configs write them: `"1s"`, `"1.5s"`,
/// `"250ms"`, `"2m"`. Bare numbers are milliseconds.
pub fn parse_duration(section: &str, value: &Value) -> Result<Duration> {
    match value {
        Value::Number(number) => {
            let ms = number
                .as_f64()
                .ok_or_else(|| McError::config(section, format!("invalid duration `{number}`")))?;
            millis(section, ms)
        }
        Value::String(text) => parse_duration_str(section, text),
        other => Err(McError::config(
            section,
            format!("expected a duration, found {}", describe(other)),
        )),
    }
}

/// Same as [`parse_duration`] but `null`/missing values map to `None`.
pub fn parse_optional_duration(section: &str, value: Option<&Value>) -> Result<Option<Duration>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("none") => Ok(None),
        Some(value) => parse_duration(section, value).map(Some),
    }
}

pub fn parse_duration_str(section: &str, text: &str) -> Result<Duration> {
    let text = text.trim().to_ascii_lowercase();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| McError::config(section, format!("invalid duration `{text}`")))?;

    let scale = match unit.trim() {
        "" | "ms" => 1.0,
        "s" | "sec" | "secs" => 1_000.0,
        "m" | "min" | "mins" => 60_000.0,
        "h" | "hr" | "hrs" => 3_600_000.0,
        other => {
            return Err(McError::config(
                section,
                format!("unknown duration unit `{other}` in `{text}`"),
            ))
        }
    };

    millis(section, number * scale)
}

fn millis(section: &str, ms: f64) -> Result<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(McError::config(
            section,
            format!("duration must be a positive number, got {ms}ms"),
        ));
    }
    Ok(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
}

/// Turns `"a, b c"` or a YAML sequence into a list of strings.
pub fn string_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(text) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

/// Renders a scalar YAML node as a string. Collections yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Reads an optional boolean, accepting YAML-ish `yes`/`no` strings.
pub fn parse_bool(section: &str, key: &str, value: Option<&Value>, default: bool) -> Result<bool> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(text)) => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(McError::config(section, format!("`{key}` must be a boolean, got `{text}`"))),
        },
        Some(other) => Err(McError::config(
            section,
            format!("`{key}` must be a boolean, found {}", describe(other)),
        )),
    }
}

pub fn parse_optional_int(section: &str, key: &str, value: Option<&Value>) -> Result<Option<i32>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| McError::config(section, format!("`{key}` must be an integer"))),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| McError::config(section, format!("`{key}` must be an integer, got `{text}`"))),
        Some(other) => Err(McError::config(
            section,
            format!("`{key}` must be an integer, found {}", describe(other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration_str("t", "1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration_str("t", "1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration_str("t", "250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration_str("t", "2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration_str("t", "40").unwrap(), Duration::from_millis(40));
    }

    #[test]
    fn bare_numbers_are_milliseconds() {
        let value: Value = serde_yaml::from_str("500").unwrap();
        assert_eq!(parse_duration("t", &value).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_unknown_units() {
        let err = parse_duration_str("slides:foo", "3 fortnights").unwrap_err();
        assert!(format!("{err}").contains("slides:foo"));
    }

    #[test]
    fn none_is_no_duration() {
        let value = Value::String("None".into());
        assert_eq!(parse_optional_duration("t", Some(&value)).unwrap(), None);
    }

    #[test]
    fn splits_string_lists() {
        let value = Value::String("x, y opacity".into());
        assert_eq!(string_to_list(&value), vec!["x", "y", "opacity"]);
    }
}
