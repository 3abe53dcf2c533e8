use chrono::{NaiveDate, Utc};
use chronofield::{ErrorKind, FieldSpec, ModelSchema, Record, Repo, TemporalValue, record};

fn date_fields() -> Repo {
    let schema = ModelSchema::builder("date_fields")
        .field("date", FieldSpec::date())
        .field("date_null", FieldSpec::date().nullable(true))
        .build()
        .expect("schema is valid");
    Repo::new(schema)
}

/// Call once per test.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[test]
fn empty_create_is_an_integrity_error() {
    let mut repo = date_fields();
    let err = repo.create(Record::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn create_and_resave_are_stable() {
    let mut repo = date_fields();
    let today = today();
    let created = repo.create(record([("date", today)])).unwrap();
    let row = repo.get(created.id()).unwrap();
    assert_eq!(row.get("date"), Some(TemporalValue::Date(today)));
    assert_eq!(row.get("date_null"), None);

    repo.save(&row).unwrap();
    assert_eq!(repo.get(row.id()).unwrap(), row);
}

#[test]
fn iso_string_is_cast() {
    let mut repo = date_fields();
    let today = today();
    let text = today.format("%Y-%m-%d").to_string();
    let created = repo.create(record([("date", text)])).unwrap();
    assert_eq!(repo.get(created.id()).unwrap().get("date"), Some(TemporalValue::Date(today)));
}

#[test]
fn values_projections() {
    let mut repo = date_fields();
    let today = today();
    repo.create(record([("date", today)])).unwrap();
    let by_date = record([("date", today)]);

    let values = repo.values(&by_date, &["date"]).unwrap();
    assert_eq!(values[0]["date"], Some(TemporalValue::Date(today)));

    let flat = repo.values_list_flat(&by_date, "date").unwrap();
    assert_eq!(flat, vec![Some(TemporalValue::Date(today))]);
}

#[test]
fn string_lookups_and_updates() {
    let mut repo = date_fields();
    let created = repo.create(record([("date", "2020-08-17")])).unwrap();
    let found = repo.get_by(&record([("date", "2020-08-17")])).unwrap();
    assert_eq!(created.get("date"), found.get("date"));

    let err = repo.create(record([("date", "2020-08-xx")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
    assert_eq!(repo.count(&Record::new()).unwrap(), 1);

    let updated = repo
        .update(&record([("date", "2020-08-17")]), record([("date", "2020-08-18")]))
        .unwrap();
    assert_eq!(updated, 1);

    let moved = repo.get_by(&record([("date", "2020-08-18")])).unwrap();
    assert_eq!(
        moved.get("date"),
        Some(TemporalValue::Date(NaiveDate::from_ymd_opt(2020, 8, 18).unwrap()))
    );
}

#[test]
fn typed_and_string_lookups_agree() {
    let mut repo = date_fields();
    let day = NaiveDate::from_ymd_opt(2020, 8, 17).unwrap();
    repo.create(record([("date", day)])).unwrap();
    assert_eq!(repo.count(&record([("date", "2020-08-17")])).unwrap(), 1);
    assert_eq!(repo.count(&record([("date", day)])).unwrap(), 1);
}
