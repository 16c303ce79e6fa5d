//! Record encoding.
//!
//! Production records use lowercase levels and epoch-seconds timestamps;
//! development records use uppercase levels and RFC 3339 timestamps.
//!
//! The record's own keys always win: a field named like one of them is
//! written under `fields.<name>` instead.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use super::error::LoggerError;
use super::level::Level;

/// Output format of a logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One JSON object per line.
    #[default]
    Json,
    /// Tab-separated, human-readable lines.
    Console,
}

impl FromStr for Encoding {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Encoding::Json),
            "console" => Ok(Encoding::Console),
            other => Err(LoggerError::UnknownEncoding(other.to_string())),
        }
    }
}

/// One log record, ready to encode.
#[derive(Debug)]
pub struct Record<'a> {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub caller: Option<&'a str>,
    pub message: &'a str,
    pub fields: Map<String, Value>,
    pub stacktrace: Option<String>,
}

/// Keys the JSON encoder writes itself.
const RESERVED_KEYS: [&str; 5] = ["level", "ts", "caller", "msg", "stacktrace"];

fn field_key(key: String) -> String {
    if RESERVED_KEYS.contains(&key.as_str()) {
        format!("fields.{}", key)
    } else {
        key
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    encoding: Encoding,
    development: bool,
}

impl Encoder {
    pub fn new(encoding: Encoding, development: bool) -> Self {
        Self {
            encoding,
            development,
        }
    }

    /// Encode a record as one line (plus stacktrace lines for console output),
    /// newline-terminated.
    pub fn encode(&self, record: Record<'_>) -> Vec<u8> {
        let mut line = match self.encoding {
            Encoding::Json => self.encode_json(record),
            Encoding::Console => self.encode_console(record),
        };
        line.push('\n');
        line.into_bytes()
    }

    fn level_str(&self, level: Level) -> &'static str {
        if self.development {
            level.as_capital_str()
        } else {
            level.as_str()
        }
    }

    fn time_value(&self, time: &DateTime<Utc>) -> Value {
        if self.development {
            return Value::String(time.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        let secs = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9;
        Number::from_f64(secs)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(time.timestamp()))
    }

    fn encode_json(&self, record: Record<'_>) -> String {
        let mut obj = Map::new();
        obj.insert("level".into(), self.level_str(record.level).into());
        obj.insert("ts".into(), self.time_value(&record.time));
        if let Some(caller) = record.caller {
            obj.insert("caller".into(), caller.into());
        }
        obj.insert("msg".into(), record.message.into());
        for (k, v) in record.fields {
            obj.insert(field_key(k), v);
        }
        if let Some(stack) = record.stacktrace {
            obj.insert("stacktrace".into(), stack.into());
        }
        Value::Object(obj).to_string()
    }

    fn encode_console(&self, record: Record<'_>) -> String {
        let ts = match self.time_value(&record.time) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let mut parts = vec![ts, self.level_str(record.level).to_string()];
        if let Some(caller) = record.caller {
            parts.push(caller.to_string());
        }
        parts.push(record.message.to_string());
        if !record.fields.is_empty() {
            parts.push(Value::Object(record.fields).to_string());
        }

        let mut line = parts.join("\t");
        if let Some(stack) = record.stacktrace {
            line.push('\n');
            line.push_str(stack.trim_end());
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(fields: Map<String, Value>) -> Record<'static> {
        Record {
            level: Level::Warn,
            time: Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap(),
            caller: Some("src/main.rs:12"),
            message: "disk almost full",
            fields,
            stacktrace: None,
        }
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert!(matches!(
            "xml".parse::<Encoding>(),
            Err(LoggerError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn production_json_layout() {
        let mut fields = Map::new();
        fields.insert("free_mb".into(), json!(12));
        let out = Encoder::new(Encoding::Json, false).encode(record(fields));
        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["ts"].as_f64().unwrap(), 1_700_000_000.5);
        assert_eq!(value["caller"], "src/main.rs:12");
        assert_eq!(value["msg"], "disk almost full");
        assert_eq!(value["free_mb"], 12);

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["level", "ts", "caller", "msg", "free_mb"]);
    }

    #[test]
    fn fields_cannot_replace_record_keys() {
        let mut fields = Map::new();
        fields.insert("level".into(), json!("audit"));
        fields.insert("msg".into(), json!("shadow"));
        fields.insert("user".into(), json!("alice"));
        let out = Encoder::new(Encoding::Json, false).encode(record(fields));
        let value: Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["level"], "warn");
        assert_eq!(value["msg"], "disk almost full");
        assert_eq!(value["fields.level"], "audit");
        assert_eq!(value["fields.msg"], "shadow");
        assert_eq!(value["user"], "alice");
    }

    #[test]
    fn development_json_uses_capital_level_and_rfc3339() {
        let out = Encoder::new(Encoding::Json, true).encode(record(Map::new()));
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["ts"], "2023-11-14T22:13:20.500Z");
    }

    #[test]
    fn console_is_tab_separated() {
        let mut fields = Map::new();
        fields.insert("k".into(), json!("v"));
        let out = Encoder::new(Encoding::Console, true).encode(record(fields));
        let line = String::from_utf8(out).unwrap();
        assert_eq!(
            line,
            "2023-11-14T22:13:20.500Z\tWARN\tsrc/main.rs:12\tdisk almost full\t{\"k\":\"v\"}\n"
        );
    }
}
