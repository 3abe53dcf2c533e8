pub mod check;
pub mod codec;

use std::path::Path;

use anyhow::{Context, Result};
use chronofield::{ModelSchema, config::SchemaFile};

/// Loads and validates a TOML schema file.
pub fn load_schema(path: &Path) -> Result<ModelSchema> {
    let file = SchemaFile::load(path)
        .with_context(|| format!("Failed to load schema {}", path.display()))?;
    let schema = file
        .to_schema()
        .with_context(|| format!("Invalid field declarations in {}", path.display()))?;
    log::debug!("loaded schema '{}' with {} field(s)", schema.name(), schema.fields().len());
    Ok(schema)
}
