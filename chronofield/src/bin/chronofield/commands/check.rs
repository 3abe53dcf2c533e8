use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use chronofield::{FieldDef, ModelSchema};

use super::load_schema;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, themed_table};

#[derive(Args)]
pub struct CheckArgs {
    /// Schema file to validate
    #[arg(env = "CHRONOFIELD_SCHEMA")]
    pub schema: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub model: String,
    pub fields: Vec<FieldRow>,
}

#[derive(Debug, Serialize)]
pub struct FieldRow {
    pub name: String,
    pub kind: String,
    pub nullable: bool,
    pub auto: Option<&'static str>,
    pub tz: Option<String>,
    pub db_tz: Option<String>,
}

impl From<&FieldDef> for FieldRow {
    fn from(field: &FieldDef) -> Self {
        let spec = &field.spec;
        let auto = if spec.auto_now() {
            Some("auto_now")
        } else if spec.auto_now_add() {
            Some("auto_now_add")
        } else {
            None
        };
        Self {
            name: field.name.clone(),
            kind: spec.kind().to_string(),
            nullable: spec.is_nullable(),
            auto,
            tz: spec.source_timezone().map(|offset| offset.to_string()),
            db_tz: spec.storage_timezone().map(|offset| offset.to_string()),
        }
    }
}

impl From<&ModelSchema> for SchemaReport {
    fn from(schema: &ModelSchema) -> Self {
        Self {
            model: schema.name().to_string(),
            fields: schema.fields().iter().map(FieldRow::from).collect(),
        }
    }
}

impl TableDisplay for SchemaReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table =
            themed_table(options, &["Field", "Kind", "Nullable", "Auto", "tz", "db_tz"]);
        for field in &self.fields {
            table.add_row(vec![
                Cell::new(&field.name),
                Cell::new(&field.kind),
                Cell::new(if field.nullable { "yes" } else { "no" }),
                Cell::new(field.auto.unwrap_or("-")),
                Cell::new(field.tz.as_deref().unwrap_or("-")),
                Cell::new(field.db_tz.as_deref().unwrap_or("-")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let names: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{}:{}", field.name, field.kind))
            .collect();
        format!("{} [{}]", self.model, names.join(", "))
    }
}

pub fn handle_check(args: CheckArgs, output: &OutputManager) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let report = SchemaReport::from(&schema);
    output.display(&report)?;
    output.success(&format!(
        "{} field(s) of '{}' are valid",
        report.fields.len(),
        report.model
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use chronofield::FieldSpec;

    #[test]
    fn report_lists_every_field() {
        let schema = ModelSchema::builder("events")
            .field("created", FieldSpec::datetime().auto_now_add(true))
            .field(
                "seen",
                FieldSpec::datetime()
                    .nullable(true)
                    .source_timezone(FixedOffset::east_opt(3 * 3600))
                    .storage_timezone(FixedOffset::east_opt(0)),
            )
            .build()
            .unwrap();

        let report = SchemaReport::from(&schema);
        assert_eq!(report.fields.len(), 2);
        assert_eq!(report.fields[0].auto, Some("auto_now_add"));
        assert_eq!(report.fields[1].tz.as_deref(), Some("+03:00"));
        assert_eq!(report.to_compact(), "events [created:datetime, seen:datetime]");
    }
}
