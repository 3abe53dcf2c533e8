use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

pub const BOTH_AUTO_MESSAGE: &str = "You can choose only 'auto_now' or 'auto_now_add'";
pub const TIMEZONE_PAIR_MESSAGE: &str = "Please specify a valid timezone to both 'tz' and 'db_tz'";
const AUTO_ON_NON_DATETIME_MESSAGE: &str =
    "'auto_now' and 'auto_now_add' are only supported by datetime fields";
const TIMEZONE_ON_NON_DATETIME_MESSAGE: &str =
    "'tz' and 'db_tz' are only supported by datetime fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Datetime,
    Date,
    Duration,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Datetime => "datetime",
            FieldKind::Date => "date",
            FieldKind::Duration => "duration",
        };
        f.write_str(label)
    }
}

/// Validated configuration for one temporal column.
///
/// Only obtainable through [`FieldSpecBuilder::build`], so every `FieldSpec` in
/// circulation already satisfies the declaration rules:
///
/// - `auto_now` and `auto_now_add` are mutually exclusive,
/// - `tz` and `db_tz` are either both set or both unset,
/// - auto rules and timezones only appear on datetime fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    kind: FieldKind,
    nullable: bool,
    auto_now: bool,
    auto_now_add: bool,
    timezones: Option<TimezonePair>,
}

/// Offset that naive input is interpreted in, and offset the column is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezonePair {
    pub source: FixedOffset,
    pub storage: FixedOffset,
}

impl FieldSpec {
    pub fn builder(kind: FieldKind) -> FieldSpecBuilder {
        FieldSpecBuilder::new(kind)
    }

    pub fn datetime() -> FieldSpecBuilder {
        FieldSpecBuilder::new(FieldKind::Datetime)
    }

    pub fn date() -> FieldSpecBuilder {
        FieldSpecBuilder::new(FieldKind::Date)
    }

    pub fn duration() -> FieldSpecBuilder {
        FieldSpecBuilder::new(FieldKind::Duration)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn auto_now(&self) -> bool {
        self.auto_now
    }

    pub fn auto_now_add(&self) -> bool {
        self.auto_now_add
    }

    pub fn timezones(&self) -> Option<TimezonePair> {
        self.timezones
    }

    pub fn source_timezone(&self) -> Option<FixedOffset> {
        self.timezones.map(|pair| pair.source)
    }

    pub fn storage_timezone(&self) -> Option<FixedOffset> {
        self.timezones.map(|pair| pair.storage)
    }

    /// Whether a missing value can be filled in by the codec for this kind of write.
    pub fn generates_value(&self, is_insert: bool) -> bool {
        self.auto_now || (self.auto_now_add && is_insert)
    }
}

/// Builder for [`FieldSpec`]; `build` runs the declaration rules.
#[derive(Debug, Clone)]
pub struct FieldSpecBuilder {
    kind: FieldKind,
    nullable: bool,
    auto_now: bool,
    auto_now_add: bool,
    source_timezone: Option<FixedOffset>,
    storage_timezone: Option<FixedOffset>,
}

impl FieldSpecBuilder {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
            auto_now: false,
            auto_now_add: false,
            source_timezone: None,
            storage_timezone: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn auto_now(mut self, auto_now: bool) -> Self {
        self.auto_now = auto_now;
        self
    }

    pub fn auto_now_add(mut self, auto_now_add: bool) -> Self {
        self.auto_now_add = auto_now_add;
        self
    }

    /// Offset attached to naive input (`tz`).
    pub fn source_timezone(mut self, offset: Option<FixedOffset>) -> Self {
        self.source_timezone = offset;
        self
    }

    /// Offset values are stored and read back in (`db_tz`).
    pub fn storage_timezone(mut self, offset: Option<FixedOffset>) -> Self {
        self.storage_timezone = offset;
        self
    }

    pub fn build(self) -> Result<FieldSpec, FieldError> {
        if self.auto_now && self.auto_now_add {
            return Err(FieldError::configuration(BOTH_AUTO_MESSAGE));
        }

        let timezones = match (self.source_timezone, self.storage_timezone) {
            (Some(source), Some(storage)) => Some(TimezonePair { source, storage }),
            (None, None) => None,
            _ => return Err(FieldError::configuration(TIMEZONE_PAIR_MESSAGE)),
        };

        if self.kind != FieldKind::Datetime {
            if self.auto_now || self.auto_now_add {
                return Err(FieldError::configuration(AUTO_ON_NON_DATETIME_MESSAGE));
            }
            if timezones.is_some() {
                return Err(FieldError::configuration(TIMEZONE_ON_NON_DATETIME_MESSAGE));
            }
        }

        Ok(FieldSpec {
            kind: self.kind,
            nullable: self.nullable,
            auto_now: self.auto_now,
            auto_now_add: self.auto_now_add,
            timezones,
        })
    }
}

/// Application-side temporal value.
///
/// Equality of [`TemporalValue::Aware`] values is moment-of-time equality: the
/// same instant written at `+03:00` and read back at `+07:30` compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalValue {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
    Date(NaiveDate),
    Duration(TimeDelta),
}

impl TemporalValue {
    pub fn as_naive(&self) -> Option<NaiveDateTime> {
        match self {
            TemporalValue::Naive(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_aware(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            TemporalValue::Aware(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            TemporalValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            TemporalValue::Duration(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            TemporalValue::Naive(_) => "naive datetime",
            TemporalValue::Aware(_) => "aware datetime",
            TemporalValue::Date(_) => "date",
            TemporalValue::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalValue::Naive(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S%.f")),
            TemporalValue::Aware(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S%.f%:z")),
            TemporalValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            TemporalValue::Duration(value) => {
                f.write_str(&crate::codec::parse::format_duration(*value))
            }
        }
    }
}

impl From<NaiveDateTime> for TemporalValue {
    fn from(value: NaiveDateTime) -> Self {
        TemporalValue::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for TemporalValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        TemporalValue::Aware(value)
    }
}

impl From<DateTime<Utc>> for TemporalValue {
    fn from(value: DateTime<Utc>) -> Self {
        TemporalValue::Aware(value.fixed_offset())
    }
}

impl From<NaiveDate> for TemporalValue {
    fn from(value: NaiveDate) -> Self {
        TemporalValue::Date(value)
    }
}

impl From<TimeDelta> for TemporalValue {
    fn from(value: TimeDelta) -> Self {
        TemporalValue::Duration(value)
    }
}

/// What application code hands to a write or a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Null,
    /// ISO-8601 text, parsed according to the field kind.
    Text(String),
    Value(TemporalValue),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

macro_rules! raw_value_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for RawValue {
                fn from(value: $source) -> Self {
                    RawValue::Value(value.into())
                }
            }
        )+
    };
}

raw_value_from!(
    TemporalValue,
    NaiveDateTime,
    DateTime<FixedOffset>,
    DateTime<Utc>,
    NaiveDate,
    TimeDelta,
);

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Option<TemporalValue>> for RawValue {
    fn from(value: Option<TemporalValue>) -> Self {
        value.map_or(RawValue::Null, RawValue::Value)
    }
}

impl TryFrom<serde_json::Value> for RawValue {
    type Error = FieldError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(RawValue::Null),
            serde_json::Value::String(text) => Ok(RawValue::Text(text)),
            other => Err(FieldError::invalid(format!(
                "expected an ISO-8601 string or null, got {other}"
            ))),
        }
    }
}

/// Native storage representation of a temporal column.
///
/// Timestamps carry microsecond resolution; intervals are signed microsecond counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StorageValue {
    Null,
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Date(NaiveDate),
    Interval(i64),
}

impl StorageValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StorageValue::Null)
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            StorageValue::Null => "null",
            StorageValue::Timestamp(_) => "timestamp",
            StorageValue::TimestampTz(_) => "timestamptz",
            StorageValue::Date(_) => "date",
            StorageValue::Interval(_) => "interval",
        }
    }
}
