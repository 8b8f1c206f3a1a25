use crate::error::FirebaseError;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write};

/// A decoded Firestore field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Bytes(Vec<u8>),
    /// Document path relative to the database root.
    Reference(String),
    GeoPoint { latitude: f64, longitude: f64 },
    Array(Vec<FieldValue>),
    Map(DocumentData),
}

/// Field map of a document, rendered like a Python dict: `{'k': 'v'}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData(BTreeMap<String, FieldValue>);

impl DocumentData {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for DocumentData {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for DocumentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_str_repr(f, key)?;
            write!(f, ": {value}")?;
        }
        f.write_char('}')
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Boolean(true) => f.write_str("True"),
            Self::Boolean(false) => f.write_str("False"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Double(x) => write_float(f, *x),
            Self::Timestamp(ts) => write_timestamp(f, ts),
            Self::String(s) => write_str_repr(f, s),
            Self::Bytes(bytes) => write_bytes_repr(f, bytes),
            Self::Reference(path) => {
                f.write_str("DocumentReference(")?;
                write_str_repr(f, path)?;
                f.write_char(')')
            }
            Self::GeoPoint {
                latitude,
                longitude,
            } => {
                f.write_str("GeoPoint(latitude=")?;
                write_float(f, *latitude)?;
                f.write_str(", longitude=")?;
                write_float(f, *longitude)?;
                f.write_char(')')
            }
            Self::Array(values) => {
                f.write_char('[')?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_char(']')
            }
            Self::Map(data) => write!(f, "{data}"),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        // Same thresholds as Python's repr; only the exponent spelling differs.
        let repr = format!("{x:?}");
        match repr.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                write!(f, "{mantissa}e{sign}{digits:0>2}")
            }
            None => f.write_str(&repr),
        }
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn write_bytes_repr(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    f.write_char('b')?;
    f.write_char(quote as char)?;
    for &b in bytes {
        match b {
            b'\\' => f.write_str("\\\\")?,
            b if b == quote => {
                f.write_char('\\')?;
                f.write_char(b as char)?;
            }
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            0x20..=0x7e => f.write_char(b as char)?,
            _ => write!(f, "\\x{b:02x}")?,
        }
    }
    f.write_char(quote as char)
}

fn write_timestamp(f: &mut fmt::Formatter<'_>, ts: &DateTime<Utc>) -> fmt::Result {
    write!(
        f,
        "DatetimeWithNanoseconds({}, {}, {}, {}, {}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute()
    )?;
    let micros = ts.timestamp_subsec_micros();
    if ts.second() != 0 || micros != 0 {
        write!(f, ", {}", ts.second())?;
    }
    if micros != 0 {
        write!(f, ", {micros}")?;
    }
    f.write_str(", tzinfo=datetime.timezone.utc)")
}

/// Firestore REST encoding of a value (`{"stringValue": "v"}` and friends).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum WireValue {
    NullValue(IgnoredAny),
    BooleanValue(bool),
    IntegerValue(WireNumber<i64>),
    DoubleValue(WireNumber<f64>),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(WireLatLng),
    ArrayValue(WireArray),
    MapValue(WireMap),
}

/// Numbers arrive either as JSON numbers or as strings (int64, `NaN`, `Infinity`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireNumber<T> {
    Number(T),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireArray {
    #[serde(default)]
    values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMap {
    #[serde(default)]
    fields: HashMap<String, WireValue>,
}

pub(crate) fn decode_fields(
    fields: HashMap<String, WireValue>,
) -> Result<DocumentData, FirebaseError> {
    fields
        .into_iter()
        .map(|(name, value)| Ok((name, decode_value(value)?)))
        .collect()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FirebaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| FirebaseError::Decode(format!("timestamp {raw:?}: {e}")))
}

pub(crate) fn decode_value(value: WireValue) -> Result<FieldValue, FirebaseError> {
    Ok(match value {
        WireValue::NullValue(_) => FieldValue::Null,
        WireValue::BooleanValue(b) => FieldValue::Boolean(b),
        WireValue::IntegerValue(WireNumber::Number(n)) => FieldValue::Integer(n),
        WireValue::IntegerValue(WireNumber::Text(raw)) => FieldValue::Integer(
            raw.parse()
                .map_err(|e| FirebaseError::Decode(format!("integer {raw:?}: {e}")))?,
        ),
        WireValue::DoubleValue(WireNumber::Number(x)) => FieldValue::Double(x),
        WireValue::DoubleValue(WireNumber::Text(raw)) => FieldValue::Double(match raw.as_str() {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => raw
                .parse()
                .map_err(|e| FirebaseError::Decode(format!("double {raw:?}: {e}")))?,
        }),
        WireValue::TimestampValue(raw) => FieldValue::Timestamp(parse_timestamp(&raw)?),
        WireValue::StringValue(s) => FieldValue::String(s),
        WireValue::BytesValue(raw) => FieldValue::Bytes(
            STANDARD
                .decode(&raw)
                .or_else(|_| URL_SAFE.decode(&raw))
                .map_err(|e| FirebaseError::Decode(format!("bytes: {e}")))?,
        ),
        WireValue::ReferenceValue(name) => FieldValue::Reference(relative_path(&name).to_string()),
        WireValue::GeoPointValue(p) => FieldValue::GeoPoint {
            latitude: p.latitude,
            longitude: p.longitude,
        },
        WireValue::ArrayValue(a) => FieldValue::Array(
            a.values
                .into_iter()
                .map(decode_value)
                .collect::<Result<_, _>>()?,
        ),
        WireValue::MapValue(m) => FieldValue::Map(decode_fields(m.fields)?),
    })
}

/// Strip `projects/{p}/databases/{d}/documents/` from a resource name.
pub(crate) fn relative_path(name: &str) -> &str {
    name.split_once("/documents/")
        .map(|(_, rest)| rest)
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(raw: serde_json::Value) -> FieldValue {
        let wire: WireValue = serde_json::from_value(raw).unwrap();
        decode_value(wire).unwrap()
    }

    #[test]
    fn scalar_values_decode() {
        assert_eq!(decode(json!({"nullValue": null})), FieldValue::Null);
        assert_eq!(decode(json!({"booleanValue": true})), FieldValue::Boolean(true));
        assert_eq!(decode(json!({"integerValue": "42"})), FieldValue::Integer(42));
        assert_eq!(decode(json!({"integerValue": 7})), FieldValue::Integer(7));
        assert_eq!(decode(json!({"doubleValue": 1.5})), FieldValue::Double(1.5));
        assert_eq!(decode(json!({"stringValue": "v"})), FieldValue::String("v".into()));
        assert_eq!(decode(json!({"bytesValue": "aGk="})), FieldValue::Bytes(b"hi".to_vec()));
        assert!(matches!(
            decode(json!({"doubleValue": "NaN"})),
            FieldValue::Double(x) if x.is_nan()
        ));
    }

    #[test]
    fn reference_is_made_relative() {
        let value = decode(json!({
            "referenceValue": "projects/p/databases/(default)/documents/users/alice"
        }));
        assert_eq!(value, FieldValue::Reference("users/alice".into()));
        assert_eq!(value.to_string(), "DocumentReference('users/alice')");
    }

    #[test]
    fn nested_values_render_like_python() {
        let value = decode(json!({"mapValue": {"fields": {
            "b": {"arrayValue": {"values": [
                {"integerValue": "1"},
                {"booleanValue": false},
                {"nullValue": null}
            ]}},
            "a": {"doubleValue": 2.0},
            "empty": {"arrayValue": {}},
            "quote": {"stringValue": "it's"}
        }}}));

        assert_eq!(
            value.to_string(),
            r#"{'a': 2.0, 'b': [1, False, None], 'empty': [], 'quote': "it's"}"#
        );
    }

    #[test]
    fn timestamp_renders_like_datetime() {
        let value = decode(json!({"timestampValue": "2024-03-05T07:08:09.250Z"}));
        assert_eq!(
            value.to_string(),
            "DatetimeWithNanoseconds(2024, 3, 5, 7, 8, 9, 250000, tzinfo=datetime.timezone.utc)"
        );

        let midnight = decode(json!({"timestampValue": "2024-03-05T00:00:00Z"}));
        assert_eq!(
            midnight.to_string(),
            "DatetimeWithNanoseconds(2024, 3, 5, 0, 0, tzinfo=datetime.timezone.utc)"
        );
    }

    #[test]
    fn bytes_and_geo_render() {
        assert_eq!(FieldValue::Bytes(vec![b'a', 0, b'\'']).to_string(), r#"b"a\x00'""#);
        assert_eq!(FieldValue::Bytes(b"'\"".to_vec()).to_string(), r#"b'\'"'"#);
        assert_eq!(FieldValue::Bytes(b"a\\b".to_vec()).to_string(), r"b'a\\b'");
        assert_eq!(
            FieldValue::GeoPoint {
                latitude: 51.5,
                longitude: -0.1
            }
            .to_string(),
            "GeoPoint(latitude=51.5, longitude=-0.1)"
        );
    }

    #[test]
    fn floats_use_python_exponent_form() {
        let cases = [
            (1e16, "1e+16"),
            (1.5e16, "1.5e+16"),
            (1e15, "1000000000000000.0"),
            (1e-5, "1e-05"),
            (1.25e-7, "1.25e-07"),
            (1e-4, "0.0001"),
            (1e100, "1e+100"),
            (-2.5e-300, "-2.5e-300"),
            (0.1, "0.1"),
        ];
        for (x, expected) in cases {
            assert_eq!(FieldValue::Double(x).to_string(), expected, "{x:?}");
        }
    }

    #[test]
    fn malformed_integer_is_decode_error() {
        let wire: WireValue = serde_json::from_value(json!({"integerValue": "x1"})).unwrap();
        assert!(matches!(
            decode_value(wire),
            Err(FirebaseError::Decode(_))
        ));
    }
}
