use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Timelike, Utc};
use regex::Regex;

use crate::{
    interpreter::EvalError,
    value::{equals, MapKey, Value},
};

/// The capability the interpreter calls through for every non-macro call.
///
/// Implement this to provide custom functions. Implementations must be
/// thread-safe: a compiled program holds its registry behind an `Arc` and
/// may be shared across threads.
///
/// Custom registries usually wrap [`StandardFunctions`] and delegate to it
/// for everything they do not handle themselves.
pub trait Functions: Send + Sync {
    /// Calls a global function by name.
    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError>;

    /// Calls a method on a receiver value.
    fn call_method(&self, target: Value, method: &str, args: Vec<Value>)
        -> Result<Value, EvalError>;
}

/// The standard function library.
///
/// Global functions: type conversions (`int`, `uint`, `double`, `string`,
/// `bool`), `type`, `size`, `has`, `matches`, `timestamp`, `duration`, the
/// date accessors, and `max`/`min`. Methods: string operations plus
/// `contains` on lists and `size` on anything sized.
///
/// Method dispatch falls back to the global table with the receiver
/// prepended, so `ts.getFullYear()` and `s.matches(pattern)` work in
/// method form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFunctions;

impl StandardFunctions {
    pub fn new() -> Self {
        StandardFunctions
    }
}

impl Functions for StandardFunctions {
    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        match name {
            "size" => {
                expect_args("size", &args, 1)?;
                size_of(&args[0])
            }
            "int" => {
                expect_args("int", &args, 1)?;
                as_int(&args[0]).map(Value::Int)
            }
            "uint" => {
                expect_args("uint", &args, 1)?;
                as_uint(&args[0]).map(Value::Int)
            }
            "double" => {
                expect_args("double", &args, 1)?;
                as_double(&args[0]).map(Value::Double)
            }
            "string" => {
                expect_args("string", &args, 1)?;
                Ok(Value::String(args[0].to_string()))
            }
            "bool" => {
                expect_args("bool", &args, 1)?;
                Ok(Value::Bool(args[0].is_truthy()))
            }
            "type" => {
                expect_args("type", &args, 1)?;
                Ok(Value::String(type_of(&args[0]).to_string()))
            }
            "has" => {
                expect_args("has", &args, 2)?;
                Ok(Value::Bool(has(&args[0], &args[1])))
            }
            "matches" => {
                expect_args("matches", &args, 2)?;
                matches(&args[0], &args[1]).map(Value::Bool)
            }
            "timestamp" => {
                if args.len() > 1 {
                    return Err(EvalError::BadArgument(
                        "timestamp() requires 0 or 1 argument(s)".to_string(),
                    ));
                }
                timestamp(args.first()).map(Value::Timestamp)
            }
            "duration" => {
                expect_args("duration", &args, 1)?;
                duration(&args[0]).map(Value::Duration)
            }
            "getDate" => {
                expect_args("getDate", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.day() as i64))
            }
            "getMonth" => {
                // Zero-based: January is 0
                expect_args("getMonth", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.month0() as i64))
            }
            "getFullYear" => {
                expect_args("getFullYear", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.year() as i64))
            }
            "getHours" => {
                expect_args("getHours", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.hour() as i64))
            }
            "getMinutes" => {
                expect_args("getMinutes", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.minute() as i64))
            }
            "getSeconds" => {
                expect_args("getSeconds", &args, 1)?;
                Ok(Value::Int(local_time(&args[0])?.second() as i64))
            }
            "max" => extremum("max", &args, std::cmp::Ordering::Greater),
            "min" => extremum("min", &args, std::cmp::Ordering::Less),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    fn call_method(
        &self,
        target: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        if target == Value::Null {
            return Err(EvalError::BadArgument(
                "Cannot call method on null".to_string(),
            ));
        }

        match method {
            "contains" => match (&target, args.as_slice()) {
                (Value::String(s), [Value::String(sub)]) => Ok(Value::Bool(s.contains(sub))),
                (Value::List(items), [value]) => {
                    Ok(Value::Bool(items.iter().any(|item| equals(item, value))))
                }
                _ => Err(EvalError::BadArgument(
                    "Invalid arguments for contains()".to_string(),
                )),
            },
            "startsWith" => match (&target, args.as_slice()) {
                (Value::String(s), [Value::String(prefix)]) => {
                    Ok(Value::Bool(s.starts_with(prefix)))
                }
                _ => Err(EvalError::BadArgument(
                    "startsWith() requires string target and argument".to_string(),
                )),
            },
            "endsWith" => match (&target, args.as_slice()) {
                (Value::String(s), [Value::String(suffix)]) => {
                    Ok(Value::Bool(s.ends_with(suffix)))
                }
                _ => Err(EvalError::BadArgument(
                    "endsWith() requires string target and argument".to_string(),
                )),
            },
            "toLowerCase" => match (&target, args.as_slice()) {
                (Value::String(s), []) => Ok(Value::String(s.to_lowercase())),
                _ => Err(EvalError::BadArgument(
                    "toLowerCase() requires string target".to_string(),
                )),
            },
            "toUpperCase" => match (&target, args.as_slice()) {
                (Value::String(s), []) => Ok(Value::String(s.to_uppercase())),
                _ => Err(EvalError::BadArgument(
                    "toUpperCase() requires string target".to_string(),
                )),
            },
            "trim" => match (&target, args.as_slice()) {
                (Value::String(s), []) => Ok(Value::String(s.trim().to_string())),
                _ => Err(EvalError::BadArgument(
                    "trim() requires string target".to_string(),
                )),
            },
            "replace" => match (&target, args.as_slice()) {
                (Value::String(s), [Value::String(from), Value::String(to)]) => {
                    // All non-overlapping occurrences
                    Ok(Value::String(s.replace(from, to)))
                }
                _ => Err(EvalError::BadArgument(
                    "replace() requires string target and 2 string arguments".to_string(),
                )),
            },
            "split" => match (&target, args.as_slice()) {
                (Value::String(s), [Value::String(separator)]) => {
                    // The separator is a literal, not a pattern; an empty
                    // separator splits into single characters
                    let parts: Vec<Value> = if separator.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    };
                    Ok(Value::List(parts))
                }
                _ => Err(EvalError::BadArgument(
                    "split() requires string target and separator".to_string(),
                )),
            },
            "size" => {
                expect_args("size", &args, 0)?;
                size_of(&target)
            }
            // Macro methods never reach the registry
            "map" | "filter" | "all" | "exists" | "existsOne" => {
                Err(EvalError::BadArgument(format!(
                    "Macro function {} was not properly handled by the interpreter",
                    method
                )))
            }
            _ => {
                // Method form of a global function: the receiver becomes
                // the first argument
                let mut all_args = Vec::with_capacity(args.len() + 1);
                all_args.push(target);
                all_args.extend(args);
                self.call_function(method, all_args).map_err(|e| match e {
                    EvalError::UnknownFunction(name) => EvalError::UnknownMethod(name),
                    other => other,
                })
            }
        }
    }
}

fn expect_args(name: &str, args: &[Value], count: usize) -> Result<(), EvalError> {
    if args.len() != count {
        return Err(EvalError::BadArgument(format!(
            "{}() requires {} argument(s)",
            name, count
        )));
    }
    Ok(())
}

/// Length of a string (in characters), bytes, list, or map; null has
/// size 0.
fn size_of(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Int(0)),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Bytes(b) => Ok(Value::Int(b.len() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Map(map) => Ok(Value::Int(map.len() as i64)),
        other => Err(EvalError::BadArgument(format!(
            "size() not supported for type: {}",
            other.type_name()
        ))),
    }
}

fn as_int(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Double(d) => {
            // Truncation toward zero; out-of-range doubles error
            let truncated = d.trunc();
            if !truncated.is_finite()
                || truncated < i64::MIN as f64
                || truncated >= -(i64::MIN as f64)
            {
                return Err(EvalError::BadArgument(format!(
                    "Cannot convert to int: {}",
                    value
                )));
            }
            Ok(truncated as i64)
        }
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| EvalError::BadArgument(format!("Cannot convert to int: {}", s))),
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        other => Err(EvalError::BadArgument(format!(
            "Cannot convert to int: {}",
            other.type_name()
        ))),
    }
}

fn as_uint(value: &Value) -> Result<i64, EvalError> {
    let result = as_int(value)?;
    if result < 0 {
        return Err(EvalError::BadArgument(format!(
            "Cannot convert negative value to uint: {}",
            value
        )));
    }
    Ok(result)
}

fn as_double(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Double(d) => Ok(*d),
        Value::Int(n) => Ok(*n as f64),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| EvalError::BadArgument(format!("Cannot convert to double: {}", s))),
        other => Err(EvalError::BadArgument(format!(
            "Cannot convert to double: {}",
            other.type_name()
        ))),
    }
}

/// Type tag for `type()`: one of null, bool, int, double, string, list,
/// map, or unknown.
fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Double(_) => "double",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        _ => "unknown",
    }
}

fn has(target: &Value, field: &Value) -> bool {
    match (target, field) {
        (Value::Map(map), Value::String(key)) => {
            map.contains_key(&MapKey::String(key.clone()))
        }
        _ => false,
    }
}

/// Regex find semantics: true if the pattern matches anywhere in the text.
fn matches(text: &Value, pattern: &Value) -> Result<bool, EvalError> {
    let (Value::String(text), Value::String(pattern)) = (text, pattern) else {
        return Err(EvalError::BadArgument(
            "matches() requires string arguments".to_string(),
        ));
    };
    let regex = Regex::new(pattern)
        .map_err(|e| EvalError::BadArgument(format!("Invalid regex pattern: {}", e)))?;
    Ok(regex.is_match(text))
}

/// Resolves an instant: no argument is now, a string parses as RFC 3339,
/// an integer is epoch milliseconds.
fn timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, EvalError> {
    match value {
        None | Some(Value::Null) => Ok(Utc::now()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| EvalError::BadArgument(format!("Invalid timestamp value: {}", s))),
        Some(Value::Int(millis)) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .ok_or_else(|| EvalError::BadArgument(format!("Invalid timestamp value: {}", millis))),
        Some(other) => Err(EvalError::BadArgument(format!(
            "Invalid timestamp value: {}",
            other.type_name()
        ))),
    }
}

/// Parses a short duration literal: `<integer>` followed by `h`, `m`, or
/// `s`.
fn duration(value: &Value) -> Result<Duration, EvalError> {
    let Value::String(text) = value else {
        return Err(EvalError::BadArgument(format!(
            "duration() requires a string argument, got {}",
            value.type_name()
        )));
    };

    let invalid = || EvalError::BadArgument(format!("Invalid duration format: {}", text));

    let pattern = Regex::new(r"^(\d+)([hms])$").expect("duration pattern is valid");
    let captures = pattern.captures(text).ok_or_else(invalid)?;
    let amount: i64 = captures[1].parse().map_err(|_| invalid())?;

    match &captures[2] {
        "h" => Duration::try_hours(amount).ok_or_else(invalid),
        "m" => Duration::try_minutes(amount).ok_or_else(invalid),
        "s" => Duration::try_seconds(amount).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Local-time view for the date accessors. Accepts an instant directly or
/// anything `timestamp()` accepts.
fn local_time(value: &Value) -> Result<DateTime<Local>, EvalError> {
    let instant = match value {
        Value::Timestamp(t) => *t,
        other => timestamp(Some(other))?,
    };
    Ok(instant.with_timezone(&Local))
}

fn extremum(
    name: &str,
    args: &[Value],
    keep: std::cmp::Ordering,
) -> Result<Value, EvalError> {
    let Some(first) = args.first() else {
        return Err(EvalError::BadArgument(format!(
            "{}() requires at least one argument",
            name
        )));
    };

    let mut result = first;
    for value in &args[1..] {
        if compare_args(value, result)? == keep {
            result = value;
        }
    }
    Ok(result.clone())
}

// max/min comparison: numbers by double value, strings lexicographically,
// timestamps chronologically.
fn compare_args(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    if let (Some(l), Some(r)) = (a.as_num(), b.as_num()) {
        return Ok(l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal));
    }
    match (a, b) {
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        (Value::Timestamp(l), Value::Timestamp(r)) => Ok(l.cmp(r)),
        _ => Err(EvalError::BadArgument(
            "Cannot compare values of different types".to_string(),
        )),
    }
}
