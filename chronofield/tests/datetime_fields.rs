//! Datetime field behaviour through the reference repository: auto timestamps,
//! timezone pairing, string casting, projections and equality lookups.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chronofield::{
    ErrorKind, FieldSpec, ManualClock, ModelSchema, Record, RepoError, Repo, SystemClock,
    TemporalValue, record,
};

// ============================================================================
// Test Models
// ============================================================================

fn plus(hours: i32, minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600 + minutes * 60).unwrap()
}

fn datetime_fields() -> ModelSchema {
    ModelSchema::builder("datetime_fields")
        .field("datetime", FieldSpec::datetime())
        .field("datetime_null", FieldSpec::datetime().nullable(true))
        .field("datetime_auto", FieldSpec::datetime().auto_now(true))
        .field("datetime_add", FieldSpec::datetime().auto_now_add(true))
        .field(
            "datetime_tz_aware",
            FieldSpec::datetime()
                .nullable(true)
                .source_timezone(Some(plus(3, 0)))
                .storage_timezone(Some(plus(7, 30))),
        )
        .build()
        .expect("schema is valid")
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 9, 1, 8, 15, 30).unwrap() + TimeDelta::microseconds(250_001)
}

fn manual_repo() -> (Repo<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    (Repo::with_clock(datetime_fields(), Arc::clone(&clock)), clock)
}

fn naive(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
}

fn naive_of(value: Option<TemporalValue>) -> NaiveDateTime {
    value.and_then(|v| v.as_naive()).expect("naive datetime")
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn both_auto_flags_are_a_configuration_error() {
    let err = FieldSpec::datetime().auto_now(true).auto_now_add(true).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.to_string(), "You can choose only 'auto_now' or 'auto_now_add'");
}

#[test]
fn timezone_pair_must_be_complete() {
    for (tz, db_tz) in [(None, Some(plus(5, 0))), (Some(plus(5, 0)), None)] {
        let err = FieldSpec::datetime()
            .source_timezone(tz)
            .storage_timezone(db_tz)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "Please specify a valid timezone to both 'tz' and 'db_tz'");
    }
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn empty_create_is_an_integrity_error() {
    let (mut repo, _) = manual_repo();
    let err = repo.create(Record::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(matches!(err, RepoError::Integrity { ref field, .. } if field == "datetime"));
    assert_eq!(repo.count(&Record::new()).unwrap(), 0);
}

#[test]
fn create_fills_auto_fields_and_converts_timezones() {
    let (mut repo, clock) = manual_repo();
    let utc_now = start().naive_utc();
    let aware_now = start().with_timezone(&plus(3, 0));

    let created = repo
        .create(record([
            ("datetime", TemporalValue::Naive(utc_now)),
            ("datetime_tz_aware", TemporalValue::Aware(aware_now)),
        ]))
        .unwrap();
    let row = repo.get(created.id()).unwrap();

    assert_eq!(row.get("datetime"), Some(TemporalValue::Naive(utc_now)));
    assert_eq!(row.get("datetime_null"), None);
    assert_eq!(naive_of(row.get("datetime_auto")), utc_now);
    assert_eq!(naive_of(row.get("datetime_add")), utc_now);

    let stored_aware = row.get("datetime_tz_aware").and_then(|v| v.as_aware()).unwrap();
    assert_eq!(stored_aware.offset().local_minus_utc(), 27_000);
    assert_eq!(stored_aware, aware_now);
    assert_eq!(stored_aware.naive_local(), aware_now.with_timezone(&plus(7, 30)).naive_local());

    let datetime_auto = row.get("datetime_auto");
    clock.advance(TimeDelta::milliseconds(12));
    repo.save(&row).unwrap();
    let saved = repo.get(row.id()).unwrap();

    assert_eq!(saved.get("datetime"), Some(TemporalValue::Naive(utc_now)));
    assert_eq!(saved.get("datetime_null"), None);
    assert_ne!(saved.get("datetime_auto"), datetime_auto);
    assert_eq!(naive_of(saved.get("datetime_auto")) - utc_now, TimeDelta::milliseconds(12));
    assert_eq!(saved.get("datetime_add"), row.get("datetime_add"));
}

#[test]
fn create_with_system_clock_stays_close_to_now() {
    let mut repo = Repo::with_clock(datetime_fields(), SystemClock);
    let before = Utc::now().naive_utc();
    let row = repo.create(record([("datetime", before)])).unwrap();

    let auto = naive_of(row.get("datetime_auto"));
    assert!(auto >= before - TimeDelta::microseconds(1));
    assert!(auto - before < TimeDelta::seconds(1));
    assert_eq!(row.get("datetime_auto"), row.get("datetime_add"));

    let saved = repo.save(&row).unwrap();
    assert!(naive_of(saved.get("datetime_auto")) > auto);
    assert_eq!(saved.get("datetime_add"), row.get("datetime_add"));
}

#[test]
fn update_replaces_the_value() {
    let (mut repo, _) = manual_repo();
    let created = repo.create(record([("datetime", naive(2019, 9, 1, 0, 0, 0))])).unwrap();

    let updated = repo
        .update(
            &record([("datetime", naive(2019, 9, 1, 0, 0, 0))]),
            record([("datetime", naive(2019, 9, 1, 6, 0, 8))]),
        )
        .unwrap();
    assert_eq!(updated, 1);

    let row = repo.get(created.id()).unwrap();
    assert_eq!(row.get("datetime"), Some(TemporalValue::Naive(naive(2019, 9, 1, 6, 0, 8))));
    assert_eq!(row.get("datetime_null"), None);
    assert!(naive_of(row.get("datetime_auto")) > naive_of(created.get("datetime_auto")));
    assert_eq!(row.get("datetime_add"), created.get("datetime_add"));
}

#[test]
fn edited_row_is_persisted_by_save() {
    let (mut repo, clock) = manual_repo();
    let created = repo.create(record([("datetime", naive(2019, 9, 1, 0, 0, 0))])).unwrap();

    let later = start() + TimeDelta::hours(2);
    clock.set(later);
    let mut row = repo.get(created.id()).unwrap();
    row.set("datetime", Some(TemporalValue::Naive(naive(2020, 2, 29, 23, 59, 59))));
    row.set("datetime_null", Some(TemporalValue::Naive(naive(2019, 12, 31, 0, 0, 0))));
    repo.save(&row).unwrap();

    let saved = repo.get(created.id()).unwrap();
    assert_eq!(saved.get("datetime"), Some(TemporalValue::Naive(naive(2020, 2, 29, 23, 59, 59))));
    assert_eq!(
        saved.get("datetime_null"),
        Some(TemporalValue::Naive(naive(2019, 12, 31, 0, 0, 0)))
    );
    assert_eq!(naive_of(saved.get("datetime_auto")), later.naive_utc());
    assert_eq!(saved.get("datetime_add"), created.get("datetime_add"));
}

#[test]
fn clearing_auto_now_add_on_save_is_an_integrity_error() {
    let (mut repo, clock) = manual_repo();
    let created = repo.create(record([("datetime", naive(2019, 9, 1, 0, 0, 0))])).unwrap();

    let mut row = created.clone();
    row.set("datetime_add", None);
    clock.advance(TimeDelta::seconds(1));
    let err = repo.save(&row).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(matches!(err, RepoError::Integrity { ref field, .. } if field == "datetime_add"));
    assert_eq!(repo.get(created.id()).unwrap(), created);
}

#[test]
fn iso_strings_are_cast() {
    let (mut repo, _) = manual_repo();
    let now = start().naive_utc();
    let text = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

    let created = repo.create(record([("datetime", text)])).unwrap();
    let row = repo.get(created.id()).unwrap();
    assert_eq!(row.get("datetime"), Some(TemporalValue::Naive(now)));
}

#[test]
fn malformed_strings_are_rejected_without_persisting() {
    let (mut repo, _) = manual_repo();
    let err = repo.create(record([("datetime", "2020-08-xx")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.field_error().is_some_and(|field| field.is_value_error()));
    assert_eq!(repo.count(&Record::new()).unwrap(), 0);
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn values_and_values_list_return_decoded_values() {
    let (mut repo, _) = manual_repo();
    let now = start().naive_utc();
    let created = repo.create(record([("datetime", now)])).unwrap();
    let by_value = record([("datetime", now)]);

    let values = repo.values(&by_value, &["datetime"]).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["datetime"], Some(TemporalValue::Naive(now)));

    let flat = repo.values_list_flat(&by_value, "datetime").unwrap();
    assert_eq!(flat, vec![Some(TemporalValue::Naive(now))]);

    let tuples = repo.values_list(&by_value, &["datetime", "datetime_null"]).unwrap();
    assert_eq!(tuples, vec![vec![Some(TemporalValue::Naive(now)), None]]);
    assert_eq!(repo.get_by(&by_value).unwrap().id(), created.id());
}

#[test]
fn lookup_by_utc_and_local_wall_clock() {
    let (mut repo, _) = manual_repo();
    let utc_now = start().naive_utc();
    let local_now = start().with_timezone(&plus(-4, 0)).naive_local();

    repo.create(record([("datetime", utc_now)])).unwrap();
    repo.create(record([("datetime", local_now)])).unwrap();

    let utc_row = repo.get_by(&record([("datetime", utc_now)])).unwrap();
    assert_eq!(utc_row.get("datetime"), Some(TemporalValue::Naive(utc_now)));

    let local_row = repo.get_by(&record([("datetime", local_now)])).unwrap();
    assert_eq!(local_row.get("datetime"), Some(TemporalValue::Naive(local_now)));
}

#[test]
fn aware_lookup_matches_by_instant() {
    let (mut repo, _) = manual_repo();
    let written = start().with_timezone(&plus(3, 0));
    repo.create(record([
        ("datetime", TemporalValue::Naive(start().naive_utc())),
        ("datetime_tz_aware", TemporalValue::Aware(written)),
    ]))
    .unwrap();

    let as_utc = record([("datetime_tz_aware", start())]);
    assert_eq!(repo.count(&as_utc).unwrap(), 1);

    // Naive lookups are read in the source offset, exactly like naive writes.
    let as_source_wall_clock = record([("datetime_tz_aware", written.naive_local())]);
    assert_eq!(repo.count(&as_source_wall_clock).unwrap(), 1);
}

#[test]
fn count_by_each_stored_value() {
    let (mut repo, _) = manual_repo();
    let created = repo.create(record([("datetime", start().naive_utc())])).unwrap();

    for field in ["datetime", "datetime_auto", "datetime_add"] {
        let value = created.get(field).unwrap();
        assert_eq!(repo.count(&record([(field, value)])).unwrap(), 1, "{field}");
    }
}
