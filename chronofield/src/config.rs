//! TOML schema declarations.
//!
//! ```toml
//! [model]
//! name = "events"
//!
//! [[model.fields]]
//! name = "created"
//! kind = "datetime"
//! auto_now_add = true
//! tz = "+03:00"
//! db_tz = "+07:30"
//! ```

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    codec::parse::parse_offset,
    errors::{FieldError, RepoError},
    schema::ModelSchema,
    types::{FieldKind, FieldSpec, FieldSpecBuilder},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Schema(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub auto_now: bool,
    #[serde(default)]
    pub auto_now_add: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_tz: Option<String>,
}

impl FieldConfig {
    pub fn to_builder(&self) -> Result<FieldSpecBuilder, FieldError> {
        Ok(FieldSpec::builder(self.kind)
            .nullable(self.nullable)
            .auto_now(self.auto_now)
            .auto_now_add(self.auto_now_add)
            .source_timezone(offset_option("tz", self.tz.as_deref())?)
            .storage_timezone(offset_option("db_tz", self.db_tz.as_deref())?))
    }
}

fn offset_option(key: &str, text: Option<&str>) -> Result<Option<FixedOffset>, FieldError> {
    text.map(|text| {
        parse_offset(text).map_err(|err| {
            FieldError::configuration(format!("invalid timezone for '{key}': {err}"))
        })
    })
    .transpose()
}

impl SchemaFile {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates every declaration with the same rules as [`FieldSpecBuilder::build`].
    pub fn to_schema(&self) -> Result<ModelSchema, ConfigError> {
        let mut builder = ModelSchema::builder(self.model.name.clone());
        for field in &self.model.fields {
            let spec = field.to_builder().map_err(|source| RepoError::Configuration {
                field: field.name.clone(),
                source,
            })?;
            builder = builder.field(field.name.clone(), spec);
        }
        Ok(builder.build()?)
    }
}
