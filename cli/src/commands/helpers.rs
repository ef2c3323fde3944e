use anyhow::{Context, Result, bail};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::process;

use pantry_core::Error;

/// Parse a week start: `YYYY-MM-DD`, or `this`/`next` for the Monday of the
/// current/next week relative to `today`.
pub(crate) fn parse_week_start(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let this_monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    match s.trim().to_lowercase().as_str() {
        "this" => Ok(this_monday),
        "next" => Ok(this_monday + Duration::days(7)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .with_context(|| format!("Invalid week start '{s}'. Use YYYY-MM-DD or this/next")),
    }
}

/// Parse a day of the week: `0`-`6` (Monday = 0) or a weekday name like `tue`.
pub(crate) fn parse_day(s: &str) -> Result<u8> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u8>() {
        return Ok(n);
    }
    let Ok(weekday) = s.parse::<Weekday>() else {
        bail!("Invalid day '{s}'. Use 0-6 (Monday = 0) or a weekday name");
    };
    Ok(u8::try_from(weekday.num_days_from_monday())?)
}

pub(crate) fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        6 => "Sun",
        _ => "?",
    }
}

/// Unwrap a core result, turning `NotFound` into a message and exit code 2.
pub(crate) fn or_exit_not_found<T>(result: pantry_core::Result<T>, json: bool) -> Result<T> {
    match result {
        Err(Error::NotFound(what)) => {
            let message = format!("Not found: {what}");
            if json {
                println!("{}", json_error(&message));
            } else {
                eprintln!("{message}");
            }
            process::exit(2);
        }
        other => Ok(other?),
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn or_dash(s: Option<&str>) -> String {
    s.filter(|s| !s.is_empty()).unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    #[test]
    fn test_parse_week_start_keywords() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(parse_week_start("this", wednesday()).unwrap(), monday);
        assert_eq!(
            parse_week_start("Next", wednesday()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
        assert_eq!(parse_week_start("this", monday).unwrap(), monday);
    }

    #[test]
    fn test_parse_week_start_iso() {
        assert_eq!(
            parse_week_start("2026-10-05", wednesday()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 5).unwrap()
        );
        assert!(parse_week_start("last week", wednesday()).is_err());
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("0").unwrap(), 0);
        assert_eq!(parse_day("6").unwrap(), 6);
        assert_eq!(parse_day("tue").unwrap(), 1);
        assert_eq!(parse_day("Sunday").unwrap(), 6);
        assert!(parse_day("someday").is_err());
    }

    #[test]
    fn test_day_name() {
        assert_eq!(day_name(0), "Mon");
        assert_eq!(day_name(6), "Sun");
        assert_eq!(day_name(9), "?");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("Produce")), "Produce");
    }
}
