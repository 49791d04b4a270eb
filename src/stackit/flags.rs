//! Typed access to command flags.
//!
//! clap only tokenizes; every flag value arrives here as a raw string and is
//! converted by the helpers below. Two families exist:
//!
//! - value helpers (`string`, `bool`, `int64`, ...) return the parsed value or
//!   the type's zero when the flag was not given;
//! - optional helpers (`*_opt`) return `None` when the flag was not given, so
//!   an explicit `--limit 0` or `--async=false` stays distinguishable from
//!   absence.
//!
//! Every conversion failure is an input error naming the flag:
//! `the provided flag --limit is invalid: ...`.

use crate::error::{InputError, Result};
use chrono::{DateTime, Months, Utc};
use clap::parser::ValueSource;
use clap::ArgMatches;
use std::collections::BTreeMap;
use std::fs;

pub const LIMIT_FLAG: &str = "limit";

/// Checks the 8-4-4-4-12 hexadecimal UUID grammar.
pub fn validate_uuid(value: &str) -> std::result::Result<(), String> {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = value.split('-').collect();
    let valid = value.len() == 36
        && parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(format!("parse {value:?} as UUID: invalid UUID format"))
    }
}

pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("parse {value:?} as bool")),
    }
}

pub fn parse_int64(value: &str) -> std::result::Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("parse {value:?} as int: {e}"))
}

/// `a,b, c` → `["a", "b", "c"]`; empty segments are dropped.
pub fn parse_string_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `k=v,k2=v2` → map. A segment without `=` is an error.
pub fn parse_string_map(value: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for pair in parse_string_list(value) {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| format!("{pair:?} must be formatted as key=value"))?;
        if k.trim().is_empty() {
            return Err(format!("{pair:?} has an empty key"));
        }
        map.insert(k.trim().to_string(), v.trim().to_string());
    }
    Ok(map)
}

/// Resolves the `@path` syntax.
///
/// `@path`, `@"path"` and `@'path'` read the file; any other value is returned
/// unchanged.
pub fn read_from_file(value: &str) -> std::result::Result<String, String> {
    let Some(path) = value.strip_prefix('@') else {
        return Ok(value.to_string());
    };
    let path = strip_quotes(path.trim());
    if path.is_empty() {
        return Err("no file path given after \"@\"".to_string());
    }
    fs::read_to_string(path).map_err(|e| format!("read file {path:?}: {e}"))
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Case-insensitive match against a fixed set; returns the canonical value.
pub fn parse_enum(value: &str, allowed: &[&'static str]) -> std::result::Result<&'static str, String> {
    allowed
        .iter()
        .find(|a| a.eq_ignore_ascii_case(value.trim()))
        .copied()
        .ok_or_else(|| {
            let quoted: Vec<String> = allowed.iter().map(|a| format!("{a:?}")).collect();
            format!("value {value:?} must be one of [{}]", quoted.join(" "))
        })
}

/// Bounds for [`parse_duration`], in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationBounds {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Converts `<n><unit>` to seconds.
///
/// Units: `s`, `m`, `h`, `d` (24h) and `M` (calendar months counted from
/// `now`). The number must be positive without leading zeros.
pub fn parse_duration(
    value: &str,
    bounds: DurationBounds,
    now: DateTime<Utc>,
) -> std::result::Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("{value:?} is missing a unit (one of s, m, h, d, M)"))?;
    let (number, unit) = value.split_at(split);
    if number.is_empty() {
        return Err(format!("{value:?} must start with a number"));
    }
    if number.starts_with('0') {
        return Err(format!("{value:?} must not have leading zeros or be zero"));
    }
    let n: u64 = number
        .parse()
        .map_err(|_| format!("{value:?} is out of range"))?;

    let seconds = match unit {
        "s" => Some(n),
        "m" => n.checked_mul(60),
        "h" => n.checked_mul(3_600),
        "d" => n.checked_mul(86_400),
        "M" => u32::try_from(n)
            .ok()
            .and_then(|months| now.checked_add_months(Months::new(months)))
            .and_then(|later| u64::try_from((later - now).num_seconds()).ok()),
        other => return Err(format!("unknown unit {other:?} (one of s, m, h, d, M)")),
    }
    .ok_or_else(|| format!("{value:?} is out of range"))?;

    if let Some(min) = bounds.min {
        if seconds < min {
            return Err(format!("{value:?} is below the minimum of {min} seconds"));
        }
    }
    if let Some(max) = bounds.max {
        if seconds > max {
            return Err(format!("{value:?} exceeds the maximum of {max} seconds"));
        }
    }
    Ok(seconds)
}

/// Typed view over the matches of one leaf command.
pub struct Flags<'a> {
    matches: &'a ArgMatches,
}

impl<'a> Flags<'a> {
    pub fn new(matches: &'a ArgMatches) -> Self {
        Self { matches }
    }

    /// Whether the flag was given on the command line.
    pub fn is_set(&self, name: &str) -> bool {
        matches!(
            self.matches.try_contains_id(name),
            Ok(true)
        ) && self.matches.value_source(name) == Some(ValueSource::CommandLine)
    }

    fn raw(&self, name: &str) -> Option<String> {
        if !self.is_set(name) {
            return None;
        }
        match self.matches.try_get_many::<String>(name) {
            Ok(Some(values)) => {
                let values: Vec<&String> = values.collect();
                if values.is_empty() {
                    None
                } else {
                    Some(
                        values
                            .into_iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(","),
                    )
                }
            }
            _ => None,
        }
    }

    fn parse<T>(
        &self,
        name: &str,
        f: impl FnOnce(&str) -> std::result::Result<T, String>,
    ) -> Result<Option<T>> {
        match self.raw(name) {
            Some(raw) => f(&raw)
                .map(Some)
                .map_err(|details| InputError::flag(name, details).into()),
            None => Ok(None),
        }
    }

    pub fn string(&self, name: &str) -> String {
        self.raw(name).unwrap_or_default()
    }

    /// `None` when unset; an explicitly empty value is `Some("")`.
    pub fn string_opt(&self, name: &str) -> Option<String> {
        if !self.is_set(name) {
            return None;
        }
        Some(self.raw(name).unwrap_or_default())
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        Ok(self.bool_opt(name)?.unwrap_or(false))
    }

    pub fn bool_opt(&self, name: &str) -> Result<Option<bool>> {
        self.parse(name, parse_bool)
    }

    pub fn int64(&self, name: &str) -> Result<i64> {
        Ok(self.int64_opt(name)?.unwrap_or(0))
    }

    pub fn int64_opt(&self, name: &str) -> Result<Option<i64>> {
        self.parse(name, parse_int64)
    }

    pub fn string_list(&self, name: &str) -> Option<Vec<String>> {
        self.raw(name).map(|raw| parse_string_list(&raw))
    }

    pub fn string_map(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        self.parse(name, parse_string_map)
    }

    /// A UUID flag that must be present. Presence is enforced by the
    /// dispatcher for required flags; an empty value is always invalid.
    pub fn uuid(&self, name: &str) -> Result<String> {
        match self.uuid_opt(name)? {
            Some(v) => Ok(v),
            None => Err(InputError::flag(name, "must not be empty").into()),
        }
    }

    pub fn uuid_opt(&self, name: &str) -> Result<Option<String>> {
        if !self.is_set(name) {
            return Ok(None);
        }
        let raw = self.raw(name).unwrap_or_default();
        if raw.is_empty() {
            return Err(InputError::flag(name, "must not be empty").into());
        }
        validate_uuid(&raw).map_err(|d| InputError::flag(name, d))?;
        Ok(Some(raw))
    }

    pub fn enum_opt(&self, name: &str, allowed: &[&'static str]) -> Result<Option<&'static str>> {
        self.parse(name, |raw| parse_enum(raw, allowed))
    }

    /// Literal value or the contents of the file named by `@path`.
    pub fn read_from_file(&self, name: &str) -> Result<Option<String>> {
        self.parse(name, read_from_file)
    }

    pub fn duration_opt(&self, name: &str, bounds: DurationBounds) -> Result<Option<u64>> {
        self.parse(name, |raw| parse_duration(raw, bounds, Utc::now()))
    }

    /// `--limit`: unset means unlimited, values below 1 are rejected.
    pub fn limit(&self) -> Result<Option<usize>> {
        match self.int64_opt(LIMIT_FLAG)? {
            Some(n) if n < 1 => Err(InputError::flag(LIMIT_FLAG, "must be greater than 0").into()),
            Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
            None => Ok(None),
        }
    }

    /// Fails if more than one flag of the group was given.
    pub fn ensure_exclusive(&self, group: &[&str]) -> Result<()> {
        let set: Vec<String> = group
            .iter()
            .filter(|name| self.is_set(name))
            .map(|name| name.to_string())
            .collect();
        if set.len() > 1 {
            return Err(InputError::MutuallyExclusive(set).into());
        }
        Ok(())
    }
}

/// Truncates a listing to `--limit` items.
pub fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::{Arg, ArgAction, Command};
    use std::io::Write;

    fn matches(args: &[&str]) -> ArgMatches {
        Command::new("test")
            .arg(Arg::new("limit").long("limit"))
            .arg(Arg::new("name").long("name"))
            .arg(Arg::new("instance-id").long("instance-id"))
            .arg(Arg::new("payload").long("payload"))
            .arg(Arg::new("labels").long("labels").action(ArgAction::Append))
            .arg(
                Arg::new("async")
                    .long("async")
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true"),
            )
            .arg(Arg::new("plan-id").long("plan-id"))
            .arg(Arg::new("plan-name").long("plan-name"))
            .try_get_matches_from(std::iter::once("test").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_uuid_grammar() {
        assert!(validate_uuid("3b2e4c1a-0f7d-4e2b-9c8a-1d2e3f4a5b6c").is_ok());
        assert!(validate_uuid("3B2E4C1A-0F7D-4E2B-9C8A-1D2E3F4A5B6C").is_ok());
        for bad in [
            "",
            "xxx",
            "3b2e4c1a0f7d4e2b9c8a1d2e3f4a5b6c",
            "3b2e4c1a-0f7d-4e2b-9c8a-1d2e3f4a5b6",
            "3b2e4c1a-0f7d-4e2b-9c8a-1d2e3f4a5b6cc",
            "3b2e4c1a-0f7d4-e2b-9c8a-1d2e3f4a5b6c",
            "gb2e4c1a-0f7d-4e2b-9c8a-1d2e3f4a5b6c",
            "{3b2e4c1-0f7d-4e2b-9c8a-1d2e3f4a5b6c}",
        ] {
            assert!(validate_uuid(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_unset_vs_explicit_zero() {
        let m = matches(&[]);
        let flags = Flags::new(&m);
        assert_eq!(flags.int64_opt("limit").unwrap(), None);
        assert_eq!(flags.bool_opt("async").unwrap(), None);

        let m = matches(&["--async=false", "--name", ""]);
        let flags = Flags::new(&m);
        assert_eq!(flags.bool_opt("async").unwrap(), Some(false));
        assert_eq!(flags.string_opt("name"), Some(String::new()));
    }

    #[test]
    fn test_bool_switch_without_value() {
        let m = matches(&["--async"]);
        assert!(Flags::new(&m).bool("async").unwrap());
    }

    #[test]
    fn test_limit_guard() {
        let m = matches(&["--limit", "0"]);
        let err = Flags::new(&m).limit().unwrap_err();
        assert!(err.to_string().contains("--limit"));
        assert!(err.to_string().contains("must be greater than 0"));

        let m = matches(&["--limit", "abc"]);
        assert!(Flags::new(&m).limit().is_err());

        let m = matches(&["--limit", "2"]);
        let limit = Flags::new(&m).limit().unwrap();
        assert_eq!(apply_limit(vec![1, 2, 3, 4, 5], limit), vec![1, 2]);
        assert_eq!(apply_limit(vec![1, 2, 3], None), vec![1, 2, 3]);
    }

    #[test]
    fn test_uuid_flag_names_flag_on_error() {
        let m = matches(&["--instance-id", "not-a-uuid"]);
        let err = Flags::new(&m).uuid("instance-id").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("the provided flag --instance-id is invalid"));

        let m = matches(&["--instance-id", ""]);
        assert!(Flags::new(&m).uuid("instance-id").is_err());
    }

    #[test]
    fn test_read_from_file_literal_and_path() {
        assert_eq!(read_from_file("{\"a\":1}").unwrap(), "{\"a\":1}");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"jobName\":\"x\"}}").unwrap();
        let path = file.path().display().to_string();
        for value in [
            format!("@{path}"),
            format!("@\"{path}\""),
            format!("@'{path}'"),
        ] {
            assert_eq!(read_from_file(&value).unwrap(), "{\"jobName\":\"x\"}");
        }
    }

    #[test]
    fn test_read_from_file_missing_is_flag_error() {
        let m = matches(&["--payload", "@/definitely/not/here.json"]);
        let err = Flags::new(&m).read_from_file("payload").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(err.to_string().contains("--payload"));
    }

    #[test]
    fn test_string_map_and_repeated_flags() {
        let m = matches(&["--labels", "a=1,b=2", "--labels", "c=3"]);
        let map = Flags::new(&m).string_map("labels").unwrap().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["c"], "3");

        assert!(parse_string_map("novalue").is_err());
        assert!(parse_string_map("=x").is_err());
    }

    #[test]
    fn test_string_list() {
        assert_eq!(parse_string_list("a, b,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_exclusive_group() {
        let m = matches(&["--plan-id", "x", "--plan-name", "y"]);
        let err = Flags::new(&m)
            .ensure_exclusive(&["plan-id", "plan-name"])
            .unwrap_err();
        assert!(err.to_string().contains("[plan-id plan-name]"));

        let m = matches(&["--plan-id", "x"]);
        assert!(Flags::new(&m)
            .ensure_exclusive(&["plan-id", "plan-name"])
            .is_ok());
    }

    #[test]
    fn test_enum_is_case_insensitive() {
        assert_eq!(parse_enum("JSON", &["json", "yaml"]).unwrap(), "json");
        assert!(parse_enum("xml", &["json", "yaml"]).is_err());
    }

    #[test]
    fn test_undefined_flag_reads_as_unset() {
        let m = matches(&[]);
        assert_eq!(Flags::new(&m).string_opt("no-such-flag"), None);
    }

    #[test]
    fn test_duration_units() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let none = DurationBounds::default();
        assert_eq!(parse_duration("30s", none, now).unwrap(), 30);
        assert_eq!(parse_duration("2h", none, now).unwrap(), 7_200);
        assert_eq!(parse_duration("7d", none, now).unwrap(), 604_800);
        // 2024-01-31 + 1 month clamps to 2024-02-29
        assert_eq!(parse_duration("1M", none, now).unwrap(), 29 * 86_400);

        for bad in ["", "5", "m", "05m", "0s", "5w", "-5m"] {
            assert!(parse_duration(bad, none, now).is_err(), "{bad:?}");
        }

        let bounds = DurationBounds {
            min: Some(60),
            max: Some(3_600),
        };
        assert!(parse_duration("30s", bounds, now).is_err());
        assert!(parse_duration("2h", bounds, now).is_err());
        assert_eq!(parse_duration("1h", bounds, now).unwrap(), 3_600);
    }
}
