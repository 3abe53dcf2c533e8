//! Temporal field codec.
//!
//! Three entry points, all pure functions of their inputs:
//!
//! - [`encode`] turns an application value into its storage form for a write,
//!   applying auto rules and not-null checks,
//! - [`encode_lookup`] applies the same normalization to a query value, so a
//!   predicate matches exactly when both sides normalize to the same storage value,
//! - [`decode`] reconstitutes the application value from storage.
//!
//! The current instant is never sampled here; it arrives through [`WriteContext`].

pub mod parse;
pub mod timezone;

use chrono::{DateTime, NaiveTime, SubsecRound, TimeDelta, Utc};

use crate::clock::WriteContext;
use crate::errors::FieldError;
use crate::types::{FieldKind, FieldSpec, RawValue, StorageValue, TemporalValue};

/// Storage timestamps keep this many fractional digits.
const STORAGE_SUBSEC_DIGITS: u16 = 6;

/// Write-path encode.
///
/// `auto_now` fields always take `ctx.now`. `auto_now_add` fields take it only on
/// insert, and only when no value was supplied. A missing value on any other
/// non-nullable field is [`FieldError::NotNull`].
pub fn encode(
    raw: &RawValue,
    spec: &FieldSpec,
    ctx: &WriteContext,
) -> Result<StorageValue, FieldError> {
    if spec.auto_now() {
        log::debug!("auto_now field refreshed to {}", ctx.now);
        return Ok(auto_value(spec, ctx.now));
    }

    if raw.is_null() {
        if spec.generates_value(ctx.is_insert) {
            log::debug!("auto_now_add field initialised to {}", ctx.now);
            return Ok(auto_value(spec, ctx.now));
        }
        if spec.is_nullable() {
            return Ok(StorageValue::Null);
        }
        return Err(FieldError::NotNull);
    }

    normalize(raw, spec)
}

/// Normalizes a query value without applying auto rules or not-null checks.
pub fn encode_lookup(raw: &RawValue, spec: &FieldSpec) -> Result<StorageValue, FieldError> {
    normalize(raw, spec)
}

/// Read-path decode. `Null` decodes to `None` for every kind.
///
/// Datetime fields with a `tz`/`db_tz` pair always come back aware, in the
/// `db_tz` offset; a naive stored timestamp is taken to be in that offset.
pub fn decode(
    stored: &StorageValue,
    spec: &FieldSpec,
) -> Result<Option<TemporalValue>, FieldError> {
    let value = match (spec.kind(), stored) {
        (_, StorageValue::Null) => return Ok(None),
        (FieldKind::Datetime, StorageValue::Timestamp(naive)) => match spec.timezones() {
            Some(pair) => TemporalValue::Aware(timezone::attach(*naive, pair.storage)?),
            None => TemporalValue::Naive(*naive),
        },
        (FieldKind::Datetime, StorageValue::TimestampTz(aware)) => match spec.timezones() {
            Some(pair) => TemporalValue::Aware(timezone::normalize_aware(*aware, pair)),
            None => TemporalValue::Aware(*aware),
        },
        (FieldKind::Date, StorageValue::Date(date)) => TemporalValue::Date(*date),
        (FieldKind::Duration, StorageValue::Interval(micros)) => {
            TemporalValue::Duration(TimeDelta::microseconds(*micros))
        }
        (kind, other) => {
            return Err(FieldError::invalid(format!(
                "cannot decode stored {} into a {kind} field",
                other.shape()
            )));
        }
    };
    Ok(Some(value))
}

fn auto_value(spec: &FieldSpec, now: DateTime<Utc>) -> StorageValue {
    let now = now.trunc_subsecs(STORAGE_SUBSEC_DIGITS);
    match spec.timezones() {
        Some(pair) => StorageValue::TimestampTz(now.with_timezone(&pair.storage)),
        None => StorageValue::Timestamp(now.naive_utc()),
    }
}

fn normalize(raw: &RawValue, spec: &FieldSpec) -> Result<StorageValue, FieldError> {
    let value = match raw {
        RawValue::Null => return Ok(StorageValue::Null),
        RawValue::Text(text) => parse_for_kind(text, spec.kind())?,
        RawValue::Value(value) => *value,
    };

    match spec.kind() {
        FieldKind::Datetime => encode_datetime(value, spec),
        FieldKind::Date => match value {
            TemporalValue::Date(date) => Ok(StorageValue::Date(date)),
            TemporalValue::Naive(naive) => Ok(StorageValue::Date(naive.date())),
            TemporalValue::Aware(aware) => Ok(StorageValue::Date(aware.date_naive())),
            TemporalValue::Duration(_) => Err(mismatch(&value, FieldKind::Date)),
        },
        FieldKind::Duration => match value {
            TemporalValue::Duration(delta) => delta
                .num_microseconds()
                .map(StorageValue::Interval)
                .ok_or_else(|| {
                    FieldError::invalid(format!("duration {delta} exceeds the storable range"))
                }),
            other => Err(mismatch(&other, FieldKind::Duration)),
        },
    }
}

fn parse_for_kind(text: &str, kind: FieldKind) -> Result<TemporalValue, FieldError> {
    match kind {
        FieldKind::Datetime => parse::parse_datetime(text),
        FieldKind::Date => parse::parse_date(text).map(TemporalValue::Date),
        FieldKind::Duration => parse::parse_duration(text).map(TemporalValue::Duration),
    }
}

fn encode_datetime(value: TemporalValue, spec: &FieldSpec) -> Result<StorageValue, FieldError> {
    let value = match value {
        TemporalValue::Date(date) => TemporalValue::Naive(date.and_time(NaiveTime::MIN)),
        TemporalValue::Duration(_) => return Err(mismatch(&value, FieldKind::Datetime)),
        other => other,
    };

    let stored = match (value, spec.timezones()) {
        (TemporalValue::Naive(naive), Some(pair)) => {
            let converted = timezone::normalize_naive(naive, pair)?;
            log::debug!("naive {naive} read at {} and stored at {}", pair.source, pair.storage);
            StorageValue::TimestampTz(converted.trunc_subsecs(STORAGE_SUBSEC_DIGITS))
        }
        (TemporalValue::Aware(aware), Some(pair)) => {
            let converted = timezone::normalize_aware(aware, pair);
            StorageValue::TimestampTz(converted.trunc_subsecs(STORAGE_SUBSEC_DIGITS))
        }
        (TemporalValue::Naive(naive), None) => {
            StorageValue::Timestamp(naive.trunc_subsecs(STORAGE_SUBSEC_DIGITS))
        }
        (TemporalValue::Aware(aware), None) => {
            StorageValue::TimestampTz(aware.trunc_subsecs(STORAGE_SUBSEC_DIGITS))
        }
        (other, _) => return Err(mismatch(&other, FieldKind::Datetime)),
    };
    Ok(stored)
}

fn mismatch(value: &TemporalValue, kind: FieldKind) -> FieldError {
    FieldError::invalid(format!("a {} cannot be stored in a {kind} field", value.shape()))
}
