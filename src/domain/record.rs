// Aggregated store rows and raw value coercion
use chrono::DateTime;
use std::collections::BTreeMap;
use std::fmt;

pub const SPEED: &str = "speed";
pub const MAIN_POWER_VOLTAGE: &str = "main_power_voltage";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const EVENT_TIME: &str = "event_time";
pub const FUEL_SENSOR_PREFIX: &str = "fuel_level_";

/// Fields with a fixed name that the store query may return.
pub const FIXED_FIELDS: [&str; 5] = [SPEED, MAIN_POWER_VOLTAGE, LATITUDE, LONGITUDE, EVENT_TIME];

/// `fuel_level_<N>` for a non-negative integer sensor index N.
pub fn is_fuel_sensor(name: &str) -> bool {
    name.strip_prefix(FUEL_SENSOR_PREFIX)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

pub fn is_allowlisted(name: &str) -> bool {
    FIXED_FIELDS.contains(&name) || is_fuel_sensor(name)
}

/// A raw cell as delivered by the store. Its type depends on how the source wrote it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    /// Convert a JSON cell. `null` means the field is absent from the bucket.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Float),
            },
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            // Arrays and objects never come out of a scalar column.
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One bucket of the aggregated query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub time: Option<FieldValue>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
impl Record {
    pub fn new(time: impl Into<FieldValue>) -> Self {
        Self {
            time: Some(time.into()),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }
}

/// Finite floating-point value, or `None` when the cell cannot be read as one.
pub fn to_float(value: &FieldValue) -> Option<f64> {
    let v = match value {
        FieldValue::Float(v) => *v,
        FieldValue::Integer(v) => *v as f64,
        FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        FieldValue::Boolean(_) => return None,
    };
    v.is_finite().then_some(v)
}

/// Integers pass through, floats truncate toward zero, strings parse as base-10.
pub fn to_int64(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Integer(v) => Some(*v),
        FieldValue::Float(v) => float_to_i64(*v),
        FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
        FieldValue::Boolean(_) => None,
    }
}

/// Normalise a timestamp cell to unix seconds.
///
/// Strings may be RFC 3339 or a bare integer. Numeric epochs are interpreted by
/// magnitude: anything past year 5138 in seconds is taken as milliseconds,
/// microseconds or nanoseconds respectively.
pub fn to_unix_seconds(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Integer(v) => Some(epoch_to_seconds(*v)),
        FieldValue::Float(v) => float_to_i64(*v).map(epoch_to_seconds),
        FieldValue::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(v) => Some(epoch_to_seconds(v)),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|t| t.timestamp()),
            }
        }
        _ => None,
    }
}

/// Truncate toward zero. Non-finite values and values outside `i64` are rejected
/// instead of saturating.
fn float_to_i64(v: f64) -> Option<i64> {
    let t = v.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then(|| t as i64)
}

fn epoch_to_seconds(v: i64) -> i64 {
    const SECONDS_LIMIT: i64 = 100_000_000_000;
    let magnitude = v.unsigned_abs();
    if magnitude < SECONDS_LIMIT as u64 {
        v
    } else if magnitude < (SECONDS_LIMIT * 1_000) as u64 {
        v.div_euclid(1_000)
    } else if magnitude < (SECONDS_LIMIT * 1_000_000) as u64 {
        v.div_euclid(1_000_000)
    } else {
        v.div_euclid(1_000_000_000)
    }
}

/// Two-decimal rounding, midpoints away from zero.
///
/// Magnitudes from 1e15 up carry no meaningful hundredths and are returned as is,
/// which also keeps `x * 100` from overflowing to infinity.
pub fn round2(x: f64) -> f64 {
    if x.abs() >= 1e15 {
        return x;
    }
    (x * 100.0).round() / 100.0
}
