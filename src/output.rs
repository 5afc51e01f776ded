//! JSON output and environment input for evaluation results.
//!
//! Results are serialized with a deterministic printer (object keys are
//! sorted); environments come in as `serde_json` values and convert to
//! runtime values.
//!
//! Types without a JSON counterpart serialize as strings: timestamps as
//! RFC 3339, durations as `<seconds>s`, bytes as lossy UTF-8.

use chrono::SecondsFormat;

use crate::value::{MapKey, Value};

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Double(d) => {
                if d.is_finite() {
                    value.to_string()
                } else {
                    // JSON has no NaN or infinity
                    "null".to_string()
                }
            }
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::Bytes(b) => {
                format!("\"{}\"", self.escape_string(&String::from_utf8_lossy(b)))
            }
            Value::Timestamp(t) => {
                format!("\"{}\"", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Duration(d) => format!("\"{}s\"", d.num_seconds()),
            Value::List(items) => self.print_list(items, indent),
            Value::Map(map) => self.print_map(map, indent),
        }
    }

    fn print_list(&self, items: &[Value], indent: usize) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let mut result = "[\n".to_string();
            let rendered: Vec<String> = items
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            result.push_str(&rendered.join(",\n"));
            result.push('\n');
            result.push_str(&self.indent(indent));
            result.push(']');
            result
        } else {
            let rendered: Vec<String> =
                items.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", rendered.join(","))
        }
    }

    fn print_map(
        &self,
        map: &std::collections::HashMap<MapKey, Value>,
        indent: usize,
    ) -> String {
        if map.is_empty() {
            return "{}".to_string();
        }

        // Sort keys for deterministic output
        let mut keys: Vec<_> = map.keys().collect();
        keys.sort();

        if self.pretty {
            let mut result = "{\n".to_string();
            let rendered: Vec<String> = keys
                .iter()
                .map(|k| {
                    format!(
                        "{}\"{}\": {}",
                        self.indent(indent + 1),
                        self.escape_string(&k.to_string()),
                        self.print_value(&map[*k], indent + 1)
                    )
                })
                .collect();
            result.push_str(&rendered.join(",\n"));
            result.push('\n');
            result.push_str(&self.indent(indent));
            result.push('}');
            result
        } else {
            let rendered: Vec<String> = keys
                .iter()
                .map(|k| {
                    format!(
                        "\"{}\":{}",
                        self.escape_string(&k.to_string()),
                        self.print_value(&map[*k], indent)
                    )
                })
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

/// Converts a `Value` to compact JSON.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a `Value` to pretty-printed JSON with 2-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

/// Converts a parsed JSON value into a runtime value. Numbers become
/// integers when they fit in `i64`, doubles otherwise.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (MapKey::String(k.clone()), from_json(v)))
                .collect(),
        ),
    }
}
