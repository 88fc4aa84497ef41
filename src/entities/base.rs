// 🧱 Base - identity and timestamps shared by every entity
//
// Identity: UUID v4 string, generated once, never reassigned.
// Time: created_at is fixed at construction, updated_at moves forward on every save.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AttributeError;

/// Timestamp layout used by the JSON document and the relational columns
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current time truncated to the precision that survives persistence
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ============================================================================
// BASE FIELDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredBase")]
pub struct Base {
    /// Stable identity (UUID)
    pub id: String,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Base {
    pub fn new() -> Self {
        let now = now();

        Base {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh updated_at, never moving it before created_at
    pub fn touch(&mut self) {
        self.updated_at = now().max(self.created_at);
    }
}

impl Default for Base {
    fn default() -> Self {
        Self::new()
    }
}

/// Base fields as found in a stored dictionary, any of them possibly absent
#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredBase {
    id: Option<String>,

    #[serde(deserialize_with = "timestamp::deserialize_option")]
    created_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "timestamp::deserialize_option")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<StoredBase> for Base {
    /// Missing fields are generated; a missing timestamp borrows the other
    /// one, and created_at never ends up after updated_at
    fn from(stored: StoredBase) -> Self {
        let created_at = stored
            .created_at
            .or(stored.updated_at)
            .unwrap_or_else(now);
        let updated_at = stored.updated_at.unwrap_or(created_at);

        Base {
            id: stored
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            created_at: created_at.min(updated_at),
            updated_at,
        }
    }
}

/// serde adapter for the ISO layout without offset
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    /// Absent or null is None
    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }

    /// Accepts both `2017-09-28T21:05:54.119427` and `2017-09-28T21:05:54`
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

// ============================================================================
// BASE MODEL (no declared attributes)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseModel {
    #[serde(flatten)]
    pub base: Base,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BaseModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        self.extra.insert(name.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// ATTRIBUTE COERCION
// ============================================================================

fn malformed(name: &str, value: &Value) -> AttributeError {
    AttributeError::Malformed {
        name: name.to_string(),
        value: value.to_string(),
    }
}

pub(crate) fn coerce_string(name: &str, value: Value) -> Result<String, AttributeError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(malformed(name, &other)),
    }
}

pub(crate) fn coerce_int(name: &str, value: Value) -> Result<i64, AttributeError> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| malformed(name, &value))
}

pub(crate) fn coerce_float(name: &str, value: Value) -> Result<f64, AttributeError> {
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };

    parsed.ok_or_else(|| malformed(name, &value))
}

pub(crate) fn coerce_string_list(name: &str, value: Value) -> Result<Vec<String>, AttributeError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(malformed(name, &other)),
            })
            .collect(),
        other => Err(malformed(name, &other)),
    }
}

// ============================================================================
// DICT RENDERING
// ============================================================================

/// Render a JSON value the way the shell has always printed attribute
/// dictionaries: `{'name': 'Lodge', 'max_guest': 4, 'latitude': 37.77}`
pub fn py_repr(value: &Value) -> String {
    let mut out = String::new();
    write_repr(value, &mut out);
    out
}

fn write_repr(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => {
            if n.is_f64() {
                out.push_str(&float_repr(n.as_f64().unwrap_or_default()));
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::String(s) => write_str_repr(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_str_repr(key, out);
                out.push_str(": ");
                write_repr(item, out);
            }
            out.push('}');
        }
    }
}

/// `37.77`, `0.0`, `1e+20`, `1e-05`: exponents are signed and at least two digits
fn float_repr(f: f64) -> String {
    let debug = format!("{:?}", f);
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };

    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

fn write_str_repr(s: &str, out: &mut String) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_creation() {
        let base = Base::new();

        assert_eq!(base.id.len(), 36, "id should be a hyphenated UUID");
        assert_eq!(base.created_at, base.updated_at);
        assert_ne!(Base::new().id, base.id, "every base gets its own id");
    }

    #[test]
    fn test_touch_keeps_ordering() {
        let mut base = Base::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        base.touch();

        assert!(base.created_at < base.updated_at);

        // A created_at in the future still never ends up after updated_at
        base.created_at = now() + chrono::Duration::hours(1);
        base.touch();
        assert!(base.created_at <= base.updated_at);
    }

    #[test]
    fn test_timestamp_parse_with_and_without_fraction() {
        let with = timestamp::parse("2017-09-28T21:05:54.119427").unwrap();
        let without = timestamp::parse("2017-09-28T21:05:54").unwrap();

        assert_eq!(with.format(TIME_FORMAT).to_string(), "2017-09-28T21:05:54.119427");
        assert_eq!(without.format(TIME_FORMAT).to_string(), "2017-09-28T21:05:54.000000");
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int("n", json!(4)), Ok(4));
        assert_eq!(coerce_int("n", json!(4.0)), Ok(4));
        assert_eq!(coerce_int("n", json!(" 12 ")), Ok(12));
        assert!(coerce_int("n", json!(4.5)).is_err());
        assert!(coerce_int("n", json!(1e300)).is_err(), "out of range, not saturated");
        assert!(coerce_int("n", json!(-1e19)).is_err());
        assert!(coerce_int("n", json!("four")).is_err());
    }

    #[test]
    fn test_coerce_float_and_string() {
        assert_eq!(coerce_float("f", json!(37.77)), Ok(37.77));
        assert_eq!(coerce_float("f", json!("-122.4")), Ok(-122.4));
        assert!(coerce_float("f", json!("a")).is_err());

        assert_eq!(coerce_string("s", json!("x")), Ok("x".to_string()));
        assert_eq!(coerce_string("s", json!(89)), Ok("89".to_string()));
        assert!(coerce_string("s", json!(["x"])).is_err());
    }

    #[test]
    fn test_stored_base_keeps_timestamps_ordered() {
        let only_updated: Base =
            serde_json::from_value(json!({"id": "x", "updated_at": "2017-09-28T21:05:54.119427"}))
                .unwrap();
        assert_eq!(only_updated.id, "x");
        assert_eq!(only_updated.created_at, only_updated.updated_at);

        let only_created: Base =
            serde_json::from_value(json!({"created_at": "2017-09-28T21:05:54"})).unwrap();
        assert_eq!(only_created.created_at, only_created.updated_at);
        assert_eq!(only_created.id.len(), 36);

        let inverted: Base = serde_json::from_value(json!({
            "created_at": "2020-01-01T00:00:00",
            "updated_at": "2019-01-01T00:00:00",
        }))
        .unwrap();
        assert!(inverted.created_at <= inverted.updated_at);

        let nothing: Base = serde_json::from_value(json!({"created_at": null})).unwrap();
        assert!(nothing.created_at <= nothing.updated_at);
    }

    #[test]
    fn test_float_repr_exponents() {
        assert_eq!(float_repr(37.77), "37.77");
        assert_eq!(float_repr(0.0), "0.0");
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1.5e300), "1.5e+300");
        assert_eq!(float_repr(0.00001), "1e-05");
        assert_eq!(py_repr(&json!({"big": 1e20})), "{'big': 1e+20}");
    }

    #[test]
    fn test_py_repr() {
        let value = json!({
            "name": "My house",
            "number_rooms": 4,
            "latitude": 37.77,
            "longitude": 0.0,
            "amenity_ids": ["a", "b"],
            "quote": "it's",
        });

        assert_eq!(
            py_repr(&value),
            "{'amenity_ids': ['a', 'b'], 'latitude': 37.77, 'longitude': 0.0, \
             'name': 'My house', 'number_rooms': 4, 'quote': \"it's\"}"
        );
    }
}
