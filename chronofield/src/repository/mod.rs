//! In-memory reference host.
//!
//! Plays the role of the persistence framework the codec is registered into:
//! records are kept as JSON documents of [`StorageValue`]s, so every read goes
//! back through serde and the codec exactly like a real storage round trip.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use nanoid::nanoid;
use serde_json::Value;

use crate::{
    clock::{Clock, SystemClock, WriteContext},
    errors::RepoError,
    schema::{DecodedRecord, ModelSchema, Record, StoredRecord},
    types::{RawValue, StorageValue, TemporalValue},
};

const RECORD_ID_LENGTH: usize = 16;

/// A decoded record as handed back to application code.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: String,
    values: DecodedRecord,
}

impl Row {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value of `field`, `None` for a null or undeclared field.
    pub fn get(&self, field: &str) -> Option<TemporalValue> {
        self.values.get(field).copied().flatten()
    }

    pub fn values(&self) -> &DecodedRecord {
        &self.values
    }

    /// Changes an in-memory value; persisted by [`Repo::save`].
    pub fn set(&mut self, field: &str, value: Option<TemporalValue>) {
        self.values.insert(field.to_string(), value);
    }

    pub fn to_record(&self) -> Record {
        self.values
            .iter()
            .map(|(name, value)| (name.clone(), RawValue::from(*value)))
            .collect()
    }
}

struct Document {
    id: String,
    body: Value,
}

pub struct Repo<C: Clock = SystemClock> {
    schema: ModelSchema,
    clock: C,
    documents: Vec<Document>,
    last_instant: Option<DateTime<Utc>>,
}

impl Repo<SystemClock> {
    pub fn new(schema: ModelSchema) -> Self {
        Self::with_clock(schema, SystemClock)
    }
}

impl<C: Clock> Repo<C> {
    pub fn with_clock(schema: ModelSchema, clock: C) -> Self {
        Self {
            schema,
            clock,
            documents: Vec::new(),
            last_instant: None,
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Inserts a record. Nothing is persisted if any field fails.
    pub fn create(&mut self, record: Record) -> Result<Row, RepoError> {
        let ctx = WriteContext::insert(self.next_instant());
        let stored = self.schema.prepare_write(&record, &ctx).inspect_err(|err| {
            log::warn!("rejected insert into '{}': {err}", self.schema.name());
        })?;

        let id = nanoid!(RECORD_ID_LENGTH);
        let body = serde_json::to_value(&stored)?;
        self.documents.push(Document { id: id.clone(), body });
        log::debug!("inserted '{}' record {id}", self.schema.name());

        Ok(Row {
            id,
            values: self.schema.decode_record(&stored)?,
        })
    }

    pub fn get(&self, id: &str) -> Result<Row, RepoError> {
        let document = self
            .documents
            .iter()
            .find(|document| document.id == id)
            .ok_or_else(|| RepoError::NotFound {
                record_id: Some(id.to_string()),
            })?;
        self.read(document)
    }

    /// Exactly one record matching `predicates`.
    pub fn get_by(&self, predicates: &Record) -> Result<Row, RepoError> {
        let mut rows = self.filter(predicates)?;
        match rows.len() {
            0 => Err(RepoError::NotFound { record_id: None }),
            1 => Ok(rows.remove(0)),
            count => Err(RepoError::MultipleObjectsReturned { count }),
        }
    }

    /// Records whose stored values equal every normalized predicate.
    pub fn filter(&self, predicates: &Record) -> Result<Vec<Row>, RepoError> {
        let lookup = self.schema.prepare_lookup(predicates)?;
        let mut rows = Vec::new();
        for document in &self.documents {
            let stored = self.stored(document)?;
            if matches_lookup(&stored, &lookup) {
                rows.push(Row {
                    id: document.id.clone(),
                    values: self.schema.decode_record(&stored)?,
                });
            }
        }
        Ok(rows)
    }

    pub fn count(&self, predicates: &Record) -> Result<usize, RepoError> {
        let lookup = self.schema.prepare_lookup(predicates)?;
        let mut total = 0;
        for document in &self.documents {
            if matches_lookup(&self.stored(document)?, &lookup) {
                total += 1;
            }
        }
        Ok(total)
    }

    /// Applies `patch` to every matching record and returns how many were updated.
    ///
    /// The patch is encoded once, so all affected records receive the same
    /// refreshed `auto_now` instant.
    pub fn update(&mut self, predicates: &Record, patch: Record) -> Result<usize, RepoError> {
        let lookup = self.schema.prepare_lookup(predicates)?;
        let ctx = WriteContext::update(self.next_instant());
        let changes = self.schema.prepare_update(&patch, &ctx)?;

        let mut updated = Vec::new();
        for (index, document) in self.documents.iter().enumerate() {
            let mut stored = self.stored(document)?;
            if !matches_lookup(&stored, &lookup) {
                continue;
            }
            stored.extend(changes.iter().map(|(name, value)| (name.clone(), *value)));
            updated.push((index, serde_json::to_value(&stored)?));
        }

        let total = updated.len();
        for (index, body) in updated {
            self.documents[index].body = body;
        }
        log::debug!("updated {total} '{}' record(s)", self.schema.name());
        Ok(total)
    }

    /// Re-saves every field of an existing record.
    pub fn save(&mut self, row: &Row) -> Result<Row, RepoError> {
        let index = self
            .documents
            .iter()
            .position(|document| document.id == row.id)
            .ok_or_else(|| RepoError::NotFound {
                record_id: Some(row.id.clone()),
            })?;

        let ctx = WriteContext::update(self.next_instant());
        let stored = self.schema.prepare_write(&row.to_record(), &ctx)?;
        self.documents[index].body = serde_json::to_value(&stored)?;

        Ok(Row {
            id: row.id.clone(),
            values: self.schema.decode_record(&stored)?,
        })
    }

    /// Projects the named fields of every matching record.
    pub fn values(
        &self,
        predicates: &Record,
        fields: &[&str],
    ) -> Result<Vec<DecodedRecord>, RepoError> {
        self.check_fields(fields)?;
        let rows = self.filter(predicates)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|name| (name.to_string(), row.get(name)))
                    .collect::<DecodedRecord>()
            })
            .collect())
    }

    /// Like [`Repo::values`] but as positional tuples.
    pub fn values_list(
        &self,
        predicates: &Record,
        fields: &[&str],
    ) -> Result<Vec<Vec<Option<TemporalValue>>>, RepoError> {
        self.check_fields(fields)?;
        let rows = self.filter(predicates)?;
        Ok(rows
            .into_iter()
            .map(|row| fields.iter().map(|name| row.get(name)).collect())
            .collect())
    }

    pub fn values_list_flat(
        &self,
        predicates: &Record,
        field: &str,
    ) -> Result<Vec<Option<TemporalValue>>, RepoError> {
        self.check_fields(&[field])?;
        Ok(self.filter(predicates)?.into_iter().map(|row| row.get(field)).collect())
    }

    /// Captures the instant for one write, strictly later than any issued before.
    fn next_instant(&mut self) -> DateTime<Utc> {
        let mut now = self.clock.now().trunc_subsecs(6);
        if let Some(last) = self.last_instant
            && now <= last
        {
            now = last + TimeDelta::microseconds(1);
        }
        self.last_instant = Some(now);
        now
    }

    fn check_fields(&self, fields: &[&str]) -> Result<(), RepoError> {
        for name in fields {
            self.schema.spec(name)?;
        }
        Ok(())
    }

    fn stored(&self, document: &Document) -> Result<StoredRecord, RepoError> {
        Ok(serde_json::from_value(document.body.clone())?)
    }

    fn read(&self, document: &Document) -> Result<Row, RepoError> {
        let stored = self.stored(document)?;
        Ok(Row {
            id: document.id.clone(),
            values: self.schema.decode_record(&stored)?,
        })
    }
}

fn matches_lookup(stored: &StoredRecord, lookup: &StoredRecord) -> bool {
    lookup
        .iter()
        .all(|(name, expected)| stored.get(name).unwrap_or(&StorageValue::Null) == expected)
}
