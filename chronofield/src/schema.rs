//! Named temporal fields of one model, and the per-write preparation that runs
//! every field through the codec with a single shared [`WriteContext`].

use std::collections::BTreeMap;

use crate::{
    clock::WriteContext,
    codec,
    errors::{FieldError, RepoError},
    types::{FieldSpec, FieldSpecBuilder, RawValue, StorageValue, TemporalValue},
};

/// Application-side values keyed by field name.
pub type Record = BTreeMap<String, RawValue>;
/// Storage-side values keyed by field name.
pub type StoredRecord = BTreeMap<String, StorageValue>;
/// Decoded values keyed by field name; `None` is a stored null.
pub type DecodedRecord = BTreeMap<String, Option<TemporalValue>>;

/// Builds a [`Record`] from `(name, value)` pairs.
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<RawValue>,
{
    pairs.into_iter().map(|(name, value)| (name.into(), value.into())).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub spec: FieldSpec,
}

#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDef>,
}

impl ModelSchema {
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn spec(&self, name: &str) -> Result<&FieldSpec, RepoError> {
        self.field(name).map(|field| &field.spec).ok_or_else(|| self.unknown(name))
    }

    /// Encodes a full record: every declared field is written, missing ones as null.
    ///
    /// Used for inserts (`ctx.is_insert`) and full re-saves of an existing record.
    pub fn prepare_write(
        &self,
        record: &Record,
        ctx: &WriteContext,
    ) -> Result<StoredRecord, RepoError> {
        self.reject_unknown(record)?;
        let mut stored = StoredRecord::new();
        for field in &self.fields {
            let raw = record.get(&field.name).unwrap_or(&RawValue::Null);
            let value = codec::encode(raw, &field.spec, ctx)
                .map_err(|err| self.wrap(&field.name, err))?;
            stored.insert(field.name.clone(), value);
        }
        Ok(stored)
    }

    /// Encodes a partial update. `auto_now` fields absent from the patch are refreshed too.
    pub fn prepare_update(
        &self,
        patch: &Record,
        ctx: &WriteContext,
    ) -> Result<StoredRecord, RepoError> {
        self.reject_unknown(patch)?;
        let mut stored = StoredRecord::new();
        for field in &self.fields {
            let raw = match patch.get(&field.name) {
                Some(raw) => raw,
                None if field.spec.auto_now() => &RawValue::Null,
                None => continue,
            };
            let value = codec::encode(raw, &field.spec, ctx)
                .map_err(|err| self.wrap(&field.name, err))?;
            stored.insert(field.name.clone(), value);
        }
        Ok(stored)
    }

    /// Normalizes equality predicates into storage values.
    pub fn prepare_lookup(&self, predicates: &Record) -> Result<StoredRecord, RepoError> {
        predicates
            .iter()
            .map(|(name, raw)| {
                let spec = self.spec(name)?;
                let value = codec::encode_lookup(raw, spec).map_err(|err| self.wrap(name, err))?;
                Ok((name.clone(), value))
            })
            .collect()
    }

    pub fn decode_record(&self, stored: &StoredRecord) -> Result<DecodedRecord, RepoError> {
        self.fields
            .iter()
            .map(|field| {
                let value = stored.get(&field.name).unwrap_or(&StorageValue::Null);
                let decoded = codec::decode(value, &field.spec)
                    .map_err(|err| self.wrap(&field.name, err))?;
                Ok((field.name.clone(), decoded))
            })
            .collect()
    }

    fn reject_unknown(&self, record: &Record) -> Result<(), RepoError> {
        match record.keys().find(|name| self.field(name).is_none()) {
            Some(name) => Err(self.unknown(name)),
            None => Ok(()),
        }
    }

    fn unknown(&self, name: &str) -> RepoError {
        RepoError::UnknownField {
            model: self.name.clone(),
            field: name.to_string(),
        }
    }

    fn wrap(&self, name: &str, err: FieldError) -> RepoError {
        RepoError::from_field(&self.name, name, err)
    }
}

/// Collects field declarations; `build` validates all of them.
#[derive(Debug, Clone)]
pub struct ModelSchemaBuilder {
    name: String,
    fields: Vec<(String, FieldSpecBuilder)>,
}

impl ModelSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpecBuilder) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    pub fn build(self) -> Result<ModelSchema, RepoError> {
        let mut fields: Vec<FieldDef> = Vec::with_capacity(self.fields.len());
        for (name, builder) in self.fields {
            if fields.iter().any(|field| field.name == name) {
                return Err(RepoError::Configuration {
                    source: FieldError::configuration(format!(
                        "field '{name}' is declared more than once"
                    )),
                    field: name,
                });
            }
            let spec = builder
                .build()
                .map_err(|source| RepoError::Configuration { field: name.clone(), source })?;
            fields.push(FieldDef { name, spec });
        }
        Ok(ModelSchema { name: self.name, fields })
    }
}
