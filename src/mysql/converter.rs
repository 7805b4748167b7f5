// ABOUTME: MySQL to SQLite type coercion keyed by the catalog's logical type
// ABOUTME: Two phases: decode into a nullable scan shape, then convert for SQLite storage

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use mysql_async::Value;
use rusqlite::types::Value as SqlValue;

/// Logical type families recognized in `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    Float,
    Text,
    Blob,
    Timestamp,
    Boolean,
    /// Anything not in the table below; scanned as text
    Unrecognized,
}

impl TypeFamily {
    /// Look up the family for a logical type name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_sqlite_migrator::mysql::converter::TypeFamily;
    /// assert_eq!(TypeFamily::from_logical_type("BIGINT"), TypeFamily::Integer);
    /// assert_eq!(TypeFamily::from_logical_type("json"), TypeFamily::Text);
    /// assert_eq!(TypeFamily::from_logical_type("enum"), TypeFamily::Unrecognized);
    /// ```
    pub fn from_logical_type(logical_type: &str) -> Self {
        match logical_type.to_lowercase().as_str() {
            "int" | "tinyint" | "smallint" | "mediumint" | "bigint" => Self::Integer,
            "float" | "double" | "decimal" | "numeric" => Self::Float,
            "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" | "char" | "json" => {
                Self::Text
            }
            "blob" | "longblob" | "mediumblob" | "tinyblob" => Self::Blob,
            "datetime" | "timestamp" | "date" => Self::Timestamp,
            "boolean" => Self::Boolean,
            _ => Self::Unrecognized,
        }
    }

    pub fn scan_shape(self) -> ScanShape {
        match self {
            Self::Integer => ScanShape::Integer,
            Self::Float => ScanShape::Float,
            Self::Text | Self::Unrecognized => ScanShape::Text,
            Self::Blob => ScanShape::Bytes,
            Self::Timestamp => ScanShape::Timestamp,
            Self::Boolean => ScanShape::Boolean,
        }
    }
}

/// Nullable in-memory shape a column value is decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanShape {
    Integer,
    Float,
    Text,
    Bytes,
    Timestamp,
    Boolean,
}

/// What to do with a value that decoded to raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesRule {
    /// Text-like logical type: decode as UTF-8 and sanitize
    AsText,
    /// Blob logical type: store byte-for-byte
    AsBlob,
    /// Neither: store as-is and warn
    Passthrough,
}

impl BytesRule {
    /// Substring match on the lower-cased logical type, so `varbinary` and
    /// friends still pick a sensible rule
    pub fn from_logical_type(logical_type: &str) -> Self {
        let lower = logical_type.to_lowercase();
        if lower.contains("text") || lower.contains("char") || lower.contains("json") {
            Self::AsText
        } else if lower.contains("blob") {
            Self::AsBlob
        } else {
            Self::Passthrough
        }
    }
}

/// A decoded column value; `Null` is an explicit absence, never a zero value
#[derive(Debug, Clone, PartialEq)]
pub enum ScannedValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
}

/// Coercion rule for one column: how to decode it and how to store it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionRule {
    logical_type: String,
    family: TypeFamily,
    shape: ScanShape,
    bytes: BytesRule,
}

impl CoercionRule {
    pub fn for_logical_type(logical_type: &str) -> Self {
        let family = TypeFamily::from_logical_type(logical_type);
        Self {
            logical_type: logical_type.to_lowercase(),
            family,
            shape: family.scan_shape(),
            bytes: BytesRule::from_logical_type(logical_type),
        }
    }

    pub fn logical_type(&self) -> &str {
        &self.logical_type
    }

    pub fn family(&self) -> TypeFamily {
        self.family
    }

    pub fn shape(&self) -> ScanShape {
        self.shape
    }

    /// Decode a MySQL value and convert it for insertion into SQLite
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_async::Value;
    /// # use rusqlite::types::Value as SqlValue;
    /// # use mysql_sqlite_migrator::mysql::converter::CoercionRule;
    /// let rule = CoercionRule::for_logical_type("varchar");
    /// let stored = rule.coerce(Value::Bytes(b"  hello \n".to_vec())).unwrap();
    /// assert_eq!(stored, SqlValue::Text("hello".to_string()));
    /// ```
    pub fn coerce(&self, value: Value) -> Result<SqlValue> {
        let scanned = self.scan(value)?;
        Ok(self.convert(scanned))
    }

    /// Phase 1: decode the wire value into this column's scan shape
    pub fn scan(&self, value: Value) -> Result<ScannedValue> {
        if matches!(value, Value::NULL) {
            return Ok(ScannedValue::Null);
        }

        let scanned = match self.shape {
            ScanShape::Integer => scan_integer(value),
            ScanShape::Float => scan_float(value),
            ScanShape::Text => Ok(scan_text(value)),
            ScanShape::Bytes => scan_bytes(value),
            ScanShape::Timestamp => scan_timestamp(value),
            ScanShape::Boolean => scan_boolean(value),
        };

        scanned.with_context(|| {
            format!(
                "Failed to decode value as {:?} for logical type '{}'",
                self.shape, self.logical_type
            )
        })
    }

    /// Phase 2: convert a decoded value into a SQLite storage value
    pub fn convert(&self, scanned: ScannedValue) -> SqlValue {
        match scanned {
            ScannedValue::Null => SqlValue::Null,
            ScannedValue::Integer(i) => SqlValue::Integer(i),
            ScannedValue::Float(f) => SqlValue::Real(f),
            // SQLite has no boolean storage class
            ScannedValue::Boolean(b) => SqlValue::Integer(i64::from(b)),
            ScannedValue::Timestamp(ts) => SqlValue::Text(format_timestamp(&ts)),
            ScannedValue::Text(s) => SqlValue::Text(sanitize_text(&s)),
            ScannedValue::Bytes(b) => match self.bytes {
                BytesRule::AsText => SqlValue::Text(sanitize_text(&String::from_utf8_lossy(&b))),
                BytesRule::AsBlob => SqlValue::Blob(b),
                BytesRule::Passthrough => {
                    tracing::warn!(
                        "Unexpected raw bytes for MySQL type '{}', storing as BLOB",
                        self.logical_type
                    );
                    SqlValue::Blob(b)
                }
            },
        }
    }
}

/// Trim surrounding whitespace, then drop every NUL character
///
/// Interior newlines are kept.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::mysql::converter::sanitize_text;
/// assert_eq!(sanitize_text("  a\u{0}b\n c  "), "ab\n c");
/// ```
pub fn sanitize_text(value: &str) -> String {
    value.trim().replace('\0', "")
}

/// Format an instant as RFC 3339 with whole seconds and a `Z` suffix
///
/// # Examples
///
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use mysql_sqlite_migrator::mysql::converter::format_timestamp;
/// let ts = Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap();
/// assert_eq!(format_timestamp(&ts), "2024-03-05T10:15:00Z");
/// ```
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn bytes_as_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).context("Value is not valid UTF-8")
}

fn scan_integer(value: Value) -> Result<ScannedValue> {
    match value {
        Value::Int(i) => Ok(ScannedValue::Integer(i)),
        Value::UInt(u) => i64::try_from(u)
            .map(ScannedValue::Integer)
            .map_err(|_| anyhow!("Unsigned value {} does not fit in a 64-bit integer", u)),
        Value::Bytes(b) => {
            let text = bytes_as_str(&b)?;
            text.trim()
                .parse::<i64>()
                .map(ScannedValue::Integer)
                .with_context(|| format!("'{}' is not an integer", text))
        }
        other => bail!("Cannot decode {:?} as an integer", other),
    }
}

fn scan_float(value: Value) -> Result<ScannedValue> {
    match value {
        Value::Float(f) => Ok(ScannedValue::Float(f64::from(f))),
        Value::Double(d) => Ok(ScannedValue::Float(d)),
        Value::Int(i) => Ok(ScannedValue::Float(i as f64)),
        Value::UInt(u) => Ok(ScannedValue::Float(u as f64)),
        Value::Bytes(b) => {
            let text = bytes_as_str(&b)?;
            text.trim()
                .parse::<f64>()
                .map(ScannedValue::Float)
                .with_context(|| format!("'{}' is not a number", text))
        }
        other => bail!("Cannot decode {:?} as a float", other),
    }
}

fn scan_text(value: Value) -> ScannedValue {
    match value {
        Value::NULL => ScannedValue::Null,
        // Invalid UTF-8 falls through to the bytes rule
        Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => ScannedValue::Text(s),
            Err(e) => ScannedValue::Bytes(e.into_bytes()),
        },
        Value::Int(i) => ScannedValue::Text(i.to_string()),
        Value::UInt(u) => ScannedValue::Text(u.to_string()),
        Value::Float(f) => ScannedValue::Text(f.to_string()),
        Value::Double(d) => ScannedValue::Text(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            ScannedValue::Text(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            ScannedValue::Text(text)
        }
    }
}

fn scan_bytes(value: Value) -> Result<ScannedValue> {
    match value {
        Value::Bytes(b) => Ok(ScannedValue::Bytes(b)),
        Value::Int(i) => Ok(ScannedValue::Bytes(i.to_string().into_bytes())),
        Value::UInt(u) => Ok(ScannedValue::Bytes(u.to_string().into_bytes())),
        Value::Float(f) => Ok(ScannedValue::Bytes(f.to_string().into_bytes())),
        Value::Double(d) => Ok(ScannedValue::Bytes(d.to_string().into_bytes())),
        other => bail!("Cannot decode {:?} as raw bytes", other),
    }
}

/// MySQL's `0000-00-00` has no calendar equivalent; it maps to 0001-01-01 UTC
fn zero_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn scan_timestamp(value: Value) -> Result<ScannedValue> {
    match value {
        Value::Date(0, 0, 0, _, _, _, _) => Ok(ScannedValue::Timestamp(zero_instant())),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let naive = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micros,
                    )
                })
                .ok_or_else(|| {
                    anyhow!(
                        "Invalid date {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year,
                        month,
                        day,
                        hour,
                        minute,
                        second
                    )
                })?;
            Ok(ScannedValue::Timestamp(Utc.from_utc_datetime(&naive)))
        }
        Value::Bytes(b) => parse_mysql_datetime(bytes_as_str(&b)?).map(ScannedValue::Timestamp),
        other => bail!("Cannot decode {:?} as a timestamp", other),
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS[.ffffff]` or `YYYY-MM-DD`, interpreted as UTC
fn parse_mysql_datetime(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if text.starts_with("0000-00-00") {
        return Ok(zero_instant());
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|date| date.and_time(NaiveTime::default()))
        })
        .with_context(|| format!("'{}' is not a MySQL date or datetime", text))?;

    Ok(Utc.from_utc_datetime(&naive))
}

fn scan_boolean(value: Value) -> Result<ScannedValue> {
    match value {
        Value::Int(i) => Ok(ScannedValue::Boolean(i != 0)),
        Value::UInt(u) => Ok(ScannedValue::Boolean(u != 0)),
        Value::Bytes(b) => {
            let text = bytes_as_str(&b)?.trim();
            if text.eq_ignore_ascii_case("true") {
                Ok(ScannedValue::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(ScannedValue::Boolean(false))
            } else {
                text.parse::<i64>()
                    .map(|i| ScannedValue::Boolean(i != 0))
                    .with_context(|| format!("'{}' is not a boolean", text))
            }
        }
        other => bail!("Cannot decode {:?} as a boolean", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coerce(logical_type: &str, value: Value) -> SqlValue {
        CoercionRule::for_logical_type(logical_type)
            .coerce(value)
            .unwrap()
    }

    #[test]
    fn test_type_family_lookup() {
        let cases = [
            ("int", TypeFamily::Integer),
            ("tinyint", TypeFamily::Integer),
            ("smallint", TypeFamily::Integer),
            ("mediumint", TypeFamily::Integer),
            ("bigint", TypeFamily::Integer),
            ("float", TypeFamily::Float),
            ("double", TypeFamily::Float),
            ("decimal", TypeFamily::Float),
            ("numeric", TypeFamily::Float),
            ("varchar", TypeFamily::Text),
            ("text", TypeFamily::Text),
            ("tinytext", TypeFamily::Text),
            ("mediumtext", TypeFamily::Text),
            ("longtext", TypeFamily::Text),
            ("char", TypeFamily::Text),
            ("json", TypeFamily::Text),
            ("blob", TypeFamily::Blob),
            ("longblob", TypeFamily::Blob),
            ("mediumblob", TypeFamily::Blob),
            ("tinyblob", TypeFamily::Blob),
            ("datetime", TypeFamily::Timestamp),
            ("timestamp", TypeFamily::Timestamp),
            ("date", TypeFamily::Timestamp),
            ("boolean", TypeFamily::Boolean),
        ];

        for (logical_type, expected) in cases {
            assert_eq!(
                TypeFamily::from_logical_type(logical_type),
                expected,
                "wrong family for '{}'",
                logical_type
            );
        }
    }

    #[test]
    fn test_type_family_lookup_is_case_insensitive() {
        assert_eq!(TypeFamily::from_logical_type("VARCHAR"), TypeFamily::Text);
        assert_eq!(TypeFamily::from_logical_type("DateTime"), TypeFamily::Timestamp);
        assert_eq!(TypeFamily::from_logical_type("LongBlob"), TypeFamily::Blob);
    }

    #[test]
    fn test_unrecognized_types_scan_as_text() {
        for logical_type in ["enum", "set", "time", "year", "bit", "varbinary", "geometry"] {
            let rule = CoercionRule::for_logical_type(logical_type);
            assert_eq!(rule.family(), TypeFamily::Unrecognized);
            assert_eq!(rule.shape(), ScanShape::Text);
        }
    }

    #[test]
    fn test_bytes_rule_uses_substring_match() {
        assert_eq!(BytesRule::from_logical_type("varchar"), BytesRule::AsText);
        assert_eq!(BytesRule::from_logical_type("mediumtext"), BytesRule::AsText);
        assert_eq!(BytesRule::from_logical_type("JSON"), BytesRule::AsText);
        assert_eq!(BytesRule::from_logical_type("longblob"), BytesRule::AsBlob);
        assert_eq!(BytesRule::from_logical_type("varbinary"), BytesRule::Passthrough);
        assert_eq!(BytesRule::from_logical_type("int"), BytesRule::Passthrough);
    }

    #[test]
    fn test_null_is_preserved_for_every_shape() {
        for logical_type in [
            "int", "double", "varchar", "blob", "datetime", "boolean", "enum",
        ] {
            assert_eq!(
                coerce(logical_type, Value::NULL),
                SqlValue::Null,
                "NULL not preserved for '{}'",
                logical_type
            );
        }
    }

    #[test]
    fn test_integer_from_text_protocol() {
        assert_eq!(coerce("int", Value::Bytes(b"42".to_vec())), SqlValue::Integer(42));
        assert_eq!(coerce("bigint", Value::Bytes(b"-7".to_vec())), SqlValue::Integer(-7));
        assert_eq!(coerce("tinyint", Value::Int(0)), SqlValue::Integer(0));
        assert_eq!(coerce("int", Value::UInt(9)), SqlValue::Integer(9));
    }

    #[test]
    fn test_integer_decode_errors() {
        let rule = CoercionRule::for_logical_type("int");
        assert!(rule.coerce(Value::Bytes(b"abc".to_vec())).is_err());
        assert!(rule.coerce(Value::UInt(u64::MAX)).is_err());
        assert!(rule.coerce(Value::Date(2024, 1, 1, 0, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_float_values() {
        assert_eq!(coerce("decimal", Value::Bytes(b"12.50".to_vec())), SqlValue::Real(12.5));
        assert_eq!(coerce("double", Value::Double(0.25)), SqlValue::Real(0.25));
        assert_eq!(coerce("float", Value::Float(1.5)), SqlValue::Real(1.5));
        assert_eq!(coerce("numeric", Value::Int(3)), SqlValue::Real(3.0));
    }

    #[test]
    fn test_boolean_maps_to_one_and_zero() {
        assert_eq!(coerce("boolean", Value::Int(1)), SqlValue::Integer(1));
        assert_eq!(coerce("boolean", Value::Int(0)), SqlValue::Integer(0));
        assert_eq!(coerce("boolean", Value::Bytes(b"1".to_vec())), SqlValue::Integer(1));
        assert_eq!(coerce("boolean", Value::Bytes(b"0".to_vec())), SqlValue::Integer(0));
        assert_eq!(coerce("boolean", Value::Bytes(b"TRUE".to_vec())), SqlValue::Integer(1));
        assert!(CoercionRule::for_logical_type("boolean")
            .coerce(Value::Bytes(b"maybe".to_vec()))
            .is_err());
    }

    #[test]
    fn test_string_sanitization() {
        assert_eq!(
            coerce("varchar", Value::Bytes(b"  a\x00b\n c  ".to_vec())),
            SqlValue::Text("ab\n c".to_string())
        );
    }

    #[test]
    fn test_sanitize_text_keeps_interior_whitespace() {
        assert_eq!(sanitize_text("\tline one\nline two\r\n"), "line one\nline two");
        assert_eq!(sanitize_text("\0\0"), "");
        assert_eq!(sanitize_text(""), "");
    }

    #[test]
    fn test_timestamp_is_rfc3339_text() {
        let stored = coerce("datetime", Value::Bytes(b"2024-03-05 10:15:00".to_vec()));
        assert_eq!(stored, SqlValue::Text("2024-03-05T10:15:00Z".to_string()));

        let SqlValue::Text(text) = stored else {
            panic!("timestamp should be stored as text");
        };
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert_eq!(
            parsed.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_timestamp_from_binary_protocol_value() {
        assert_eq!(
            coerce("timestamp", Value::Date(2024, 3, 5, 10, 15, 0, 500_000)),
            SqlValue::Text("2024-03-05T10:15:00Z".to_string())
        );
    }

    #[test]
    fn test_date_only_values() {
        assert_eq!(
            coerce("date", Value::Bytes(b"2023-12-31".to_vec())),
            SqlValue::Text("2023-12-31T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_zero_date_maps_to_zero_instant() {
        assert_eq!(
            coerce("datetime", Value::Bytes(b"0000-00-00 00:00:00".to_vec())),
            SqlValue::Text("0001-01-01T00:00:00Z".to_string())
        );
        assert_eq!(
            coerce("date", Value::Date(0, 0, 0, 0, 0, 0, 0)),
            SqlValue::Text("0001-01-01T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let rule = CoercionRule::for_logical_type("datetime");
        assert!(rule.coerce(Value::Bytes(b"yesterday".to_vec())).is_err());
        assert!(rule.coerce(Value::Date(2024, 13, 1, 0, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_blob_bytes_pass_through_untouched() {
        let bytes = vec![b' ', 0x00, 0xFF, b'\n', 0x00, b' '];
        assert_eq!(coerce("blob", Value::Bytes(bytes.clone())), SqlValue::Blob(bytes));
    }

    #[test]
    fn test_text_with_invalid_utf8_is_decoded_lossily() {
        assert_eq!(
            coerce("text", Value::Bytes(vec![b' ', b'o', b'k', 0xFF, b' '])),
            SqlValue::Text("ok\u{FFFD}".to_string())
        );
    }

    #[test]
    fn test_unrecognized_binary_type_keeps_raw_bytes() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(coerce("varbinary", Value::Bytes(bytes.clone())), SqlValue::Blob(bytes));
    }

    #[test]
    fn test_unrecognized_type_falls_back_to_text() {
        assert_eq!(
            coerce("enum", Value::Bytes(b" draft ".to_vec())),
            SqlValue::Text("draft".to_string())
        );
        assert_eq!(
            coerce("time", Value::Time(false, 1, 2, 3, 4, 0)),
            SqlValue::Text("26:03:04".to_string())
        );
    }

    #[test]
    fn test_unrecognized_binary_type_with_utf8_bytes_is_sanitized_as_text() {
        // BIT(1) zero arrives as a single NUL byte
        assert_eq!(coerce("bit", Value::Bytes(vec![0x00])), SqlValue::Text(String::new()));
        assert_eq!(
            coerce("varbinary", Value::Bytes(b" abc ".to_vec())),
            SqlValue::Text("abc".to_string())
        );
    }

    #[test]
    fn test_convert_boolean_directly() {
        let rule = CoercionRule::for_logical_type("boolean");
        assert_eq!(rule.convert(ScannedValue::Boolean(true)), SqlValue::Integer(1));
        assert_eq!(rule.convert(ScannedValue::Boolean(false)), SqlValue::Integer(0));
    }
}
