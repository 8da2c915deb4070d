//! Typed literal values and the coercers that produce them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use winnow::ascii::digit0;
use winnow::combinator::{alt, opt, preceded, repeat};
use winnow::prelude::*;

use super::error::CompileError;

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

const NANOS_PER_SEC: i128 = 1_000_000_000;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$",
    )
    .expect("email pattern is valid")
});

/// A literal after coercion to its field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Calendar date, stored as midnight UTC.
    Timestamp(OffsetDateTime),
    Duration(Duration),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// ASCII letters only.
    Text(String),
    Email(String),
}

/// How a field's literal is validated and typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercer {
    Timestamp,
    Duration,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Email,
}

impl fmt::Display for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coercer::Timestamp => "timestamp",
            Coercer::Duration => "duration",
            Coercer::Int32 => "int32",
            Coercer::Int64 => "int64",
            Coercer::Float32 => "float32",
            Coercer::Float64 => "float64",
            Coercer::Text => "text",
            Coercer::Email => "email",
        };
        f.write_str(name)
    }
}

impl Coercer {
    /// Convert a raw literal token into a typed value.
    pub fn coerce(self, token: &str) -> Result<Value, CompileError> {
        let value = match self {
            Coercer::Timestamp => parse_date(token).map(Value::Timestamp),
            Coercer::Duration => parse_duration(token).map(Value::Duration),
            Coercer::Int32 => token.parse().ok().map(Value::Int32),
            Coercer::Int64 => token.parse().ok().map(Value::Int64),
            Coercer::Float32 => token
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Float32),
            Coercer::Float64 => token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Float64),
            Coercer::Text => token
                .chars()
                .all(|c| c.is_ascii_alphabetic())
                .then(|| Value::Text(token.to_string())),
            Coercer::Email => EMAIL
                .is_match(token)
                .then(|| Value::Email(token.to_string())),
        };

        value.ok_or_else(|| CompileError::InvalidValue {
            value: token.to_string(),
            expected: self,
        })
    }
}

fn parse_date(token: &str) -> Option<OffsetDateTime> {
    // `[year]` would also take a leading sign.
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let date = Date::parse(token, format_description!("[year]-[month]-[day]")).ok()?;
    Some(date.midnight().assume_utc())
}

/// One `<magnitude><unit>` component: whole digits, fraction digits, unit in nanoseconds.
fn lex_duration_part<'a>(input: &mut &'a str) -> PResult<(&'a str, &'a str, i128)> {
    let whole = digit0.parse_next(input)?;
    let fraction = opt(preceded('.', digit0)).parse_next(input)?.unwrap_or("");
    if whole.is_empty() && fraction.is_empty() {
        return Err(winnow::error::ErrMode::Backtrack(
            winnow::error::ContextError::default(),
        ));
    }

    let unit = alt((
        "ns".value(1i128),
        "us".value(1_000),
        "µs".value(1_000),
        "μs".value(1_000),
        "ms".value(1_000_000),
        "s".value(NANOS_PER_SEC),
        "m".value(60 * NANOS_PER_SEC),
        "h".value(3_600 * NANOS_PER_SEC),
    ))
    .parse_next(input)?;

    Ok((whole, fraction, unit))
}

/// Parse a signed duration such as `10000s`, `1h30m` or `-1.5h`.
fn parse_duration(token: &str) -> Option<Duration> {
    let (negative, mut input) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if input == "0" {
        return Some(Duration::ZERO);
    }

    let parts: Vec<(&str, &str, i128)> = repeat(1.., lex_duration_part)
        .parse_next(&mut input)
        .ok()?;
    if !input.is_empty() {
        return None;
    }

    let mut nanos: i128 = 0;
    for (whole, fraction, unit) in parts {
        let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        nanos = nanos.checked_add(whole.checked_mul(unit)?)?;
        nanos = nanos.checked_add(fraction_nanos(fraction, unit))?;
        if nanos > i128::from(i64::MAX) {
            return None;
        }
    }
    if negative {
        nanos = -nanos;
    }

    Some(Duration::nanoseconds(i64::try_from(nanos).ok()?))
}

/// Truncated nanoseconds contributed by the fractional digits of one component.
fn fraction_nanos(fraction: &str, unit: i128) -> i128 {
    let mut numerator: i128 = 0;
    let mut scale: i128 = 1;
    for digit in fraction.bytes().take(18) {
        numerator = numerator * 10 + i128::from(digit - b'0');
        scale *= 10;
    }
    numerator * unit / scale
}

impl Value {
    /// Render the value the way a document store expects it.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Timestamp(ts) => ts
                .format(&Rfc3339)
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
            Value::Duration(d) => i64::try_from(d.whole_nanoseconds())
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            Value::Int32(v) => serde_json::Value::from(*v),
            Value::Int64(v) => serde_json::Value::from(*v),
            // Widen through the shortest decimal form so 0.1f32 stays 0.1.
            Value::Float32(v) => serde_json::Value::from(
                v.to_string().parse::<f64>().unwrap_or(f64::from(*v)),
            ),
            Value::Float64(v) => serde_json::Value::from(*v),
            Value::Text(s) | Value::Email(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Prints the value as a literal token that coerces back to the same value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Timestamp(ts) => {
                let date = ts
                    .date()
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&date)
            }
            Value::Duration(d) => {
                let nanos = d.whole_nanoseconds();
                if nanos % NANOS_PER_SEC == 0 {
                    write!(f, "{}s", nanos / NANOS_PER_SEC)
                } else {
                    write!(f, "{}ns", nanos)
                }
            }
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Text(s) | Value::Email(s) => f.write_str(s),
        }
    }
}
