use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use chronofield::{RawValue, StorageValue, SystemClock, TemporalValue, WriteContext, decode, encode};

use super::load_schema;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, themed_table};

#[derive(Args)]
pub struct EncodeArgs {
    /// Schema file declaring the field
    #[arg(env = "CHRONOFIELD_SCHEMA")]
    pub schema: PathBuf,

    /// Field to encode for
    #[arg(long)]
    pub field: String,

    /// ISO-8601 value; omit to encode a missing value
    #[arg(long)]
    pub value: Option<String>,

    /// Encode as a write to an existing record rather than an insert
    #[arg(long)]
    pub update: bool,
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Schema file declaring the field
    #[arg(env = "CHRONOFIELD_SCHEMA")]
    pub schema: PathBuf,

    /// Field to decode for
    #[arg(long)]
    pub field: String,

    /// Stored value as JSON, e.g. '{"type":"date","value":"2020-08-17"}'
    #[arg(long)]
    pub stored: String,
}

#[derive(Debug, Serialize)]
pub struct CodecReport {
    pub field: String,
    pub kind: String,
    pub stored: StorageValue,
    pub decoded: Option<String>,
}

impl CodecReport {
    fn new(
        field: &str,
        kind: String,
        stored: StorageValue,
        decoded: Option<TemporalValue>,
    ) -> Self {
        Self {
            field: field.to_string(),
            kind,
            stored,
            decoded: decoded.map(|value| value.to_string()),
        }
    }

    fn stored_json(&self) -> String {
        serde_json::to_string(&self.stored).unwrap_or_default()
    }
}

impl TableDisplay for CodecReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["Field", "Kind", "Stored", "Decoded"]);
        table.add_row(vec![
            Cell::new(&self.field),
            Cell::new(&self.kind),
            Cell::new(self.stored_json()),
            Cell::new(self.decoded.as_deref().unwrap_or("null")),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{}={} ({})",
            self.field,
            self.decoded.as_deref().unwrap_or("null"),
            self.stored_json()
        )
    }
}

pub fn handle_encode(args: EncodeArgs, output: &OutputManager) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let spec = schema.spec(&args.field)?;
    let raw = args.value.map_or(RawValue::Null, RawValue::Text);

    let ctx = WriteContext::capture(&SystemClock, !args.update);
    if spec.auto_now() || (raw.is_null() && spec.generates_value(ctx.is_insert)) {
        output.info(&format!("'{}' is auto-timestamped; using {}", args.field, ctx.now));
    }

    let stored = encode(&raw, spec, &ctx)
        .with_context(|| format!("Failed to encode '{}'", args.field))?;
    let decoded = decode(&stored, spec)?;
    output.display(&CodecReport::new(&args.field, spec.kind().to_string(), stored, decoded))
}

pub fn handle_decode(args: DecodeArgs, output: &OutputManager) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let spec = schema.spec(&args.field)?;
    let stored: StorageValue =
        serde_json::from_str(&args.stored).context("Stored value is not valid JSON")?;

    let decoded = decode(&stored, spec)
        .with_context(|| format!("Failed to decode '{}'", args.field))?;
    output.display(&CodecReport::new(&args.field, spec.kind().to_string(), stored, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn compact_shows_decoded_and_stored() {
        let day = NaiveDate::from_ymd_opt(2020, 8, 17).unwrap();
        let report = CodecReport::new(
            "date",
            "date".into(),
            StorageValue::Date(day),
            Some(TemporalValue::Date(day)),
        );
        assert_eq!(
            report.to_compact(),
            r#"date=2020-08-17 ({"type":"date","value":"2020-08-17"})"#
        );
    }
}
