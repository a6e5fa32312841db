use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Timelike};
use regex::{Captures, Regex};

use super::{FunctionContext, arg};
use crate::evaluator::EvalError;
use crate::value::Value;

static TEMPLATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("YYYY|MM|DD|HH|mm|ss").expect("valid template pattern"));

const DEFAULT_TEMPLATE: &str = "YYYY-MM-DD";

/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` and integer epoch milliseconds.
pub(crate) fn parse_date(value: &Value) -> Result<NaiveDateTime, EvalError> {
    let invalid = || EvalError::InvalidDate(value.to_text());

    match value {
        Value::Integer(millis) => DateTime::from_timestamp_millis(*millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.naive_local());
            }
            for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
                    return Ok(dt);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Render `dt` through a `YYYY MM DD HH mm ss` template.
pub(crate) fn format_date(dt: &NaiveDateTime, template: &str) -> String {
    TEMPLATE_TOKEN
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "YYYY" => format!("{:04}", dt.year()),
            "MM" => format!("{:02}", dt.month()),
            "DD" => format!("{:02}", dt.day()),
            "HH" => format!("{:02}", dt.hour()),
            "mm" => format!("{:02}", dt.minute()),
            "ss" => format!("{:02}", dt.second()),
            other => other.to_string(),
        })
        .into_owned()
}

pub(super) fn now(_: &[Value], ctx: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::String(ctx.now.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

pub(super) fn today(_: &[Value], ctx: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::String(ctx.now.format("%Y-%m-%d").to_string()))
}

fn date_part(args: &[Value], part: fn(&NaiveDateTime) -> i64) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Null => Ok(Value::Null),
        v => parse_date(v).map(|dt| Value::Integer(part(&dt))),
    }
}

pub(super) fn year(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    date_part(args, |dt| dt.year() as i64)
}

pub(super) fn month(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    date_part(args, |dt| dt.month() as i64)
}

pub(super) fn day(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    date_part(args, |dt| dt.day() as i64)
}

/// DATETIME_FORMAT(date, template="YYYY-MM-DD")
pub(super) fn format(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let date = match arg(args, 0) {
        Value::Null => return Ok(Value::Null),
        v => parse_date(v)?,
    };
    let template = match arg(args, 1) {
        Value::Null => DEFAULT_TEMPLATE.to_string(),
        v => v.to_text(),
    };
    Ok(Value::String(format_date(&date, &template)))
}

/// DATETIME_PARSE(text) - returns its argument unchanged
pub(super) fn parse(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(arg(args, 0).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn every_accepted_shape_parses() {
        for input in [
            "2024-03-05",
            "2024-03-05 10:20:30",
            "2024-03-05T10:20:30",
            "2024-03-05T10:20:30.250",
            "2024-03-05T10:20:30Z",
        ] {
            let dt = parse_date(&Value::from(input)).unwrap();
            assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 5), "{}", input);
        }

        let epoch = parse_date(&Value::Integer(0)).unwrap();
        assert_eq!(epoch.year(), 1970);
    }

    #[test]
    fn garbage_is_an_invalid_date() {
        assert!(matches!(
            parse_date(&Value::from("next tuesday")),
            Err(EvalError::InvalidDate(_))
        ));
    }

    #[test]
    fn template_tokens_are_replaced() {
        let dt = parse_date(&Value::from("2024-03-05 07:08:09")).unwrap();
        assert_eq!(format_date(&dt, "DD/MM/YYYY HH:mm:ss"), "05/03/2024 07:08:09");
        assert_eq!(format_date(&dt, DEFAULT_TEMPLATE), "2024-03-05");
    }

    #[test]
    fn now_and_today_use_the_shared_clock() {
        let ctx = FunctionContext {
            record: None,
            now: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        };
        assert_eq!(now(&[], &ctx).unwrap(), Value::from("2025-01-02T03:04:05Z"));
        assert_eq!(today(&[], &ctx).unwrap(), Value::from("2025-01-02"));
    }
}
