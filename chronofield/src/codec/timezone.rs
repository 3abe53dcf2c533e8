//! Offset pairing for datetime fields declared with `tz` and `db_tz`.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::errors::FieldError;
use crate::types::TimezonePair;

/// Interprets a naive wall-clock time in `offset`.
pub fn attach(
    naive: NaiveDateTime,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, FieldError> {
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| FieldError::invalid(format!("{naive} is out of range for offset {offset}")))
}

/// Naive input is read in the source offset, then everything lands in the storage offset.
pub fn normalize_naive(
    naive: NaiveDateTime,
    pair: TimezonePair,
) -> Result<DateTime<FixedOffset>, FieldError> {
    let local = attach(naive, pair.source)?;
    Ok(local.with_timezone(&pair.storage))
}

pub fn normalize_aware(value: DateTime<FixedOffset>, pair: TimezonePair) -> DateTime<FixedOffset> {
    value.with_timezone(&pair.storage)
}
