use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use serde::Serialize;

use cpakit_core::report::{self, ModelReport};
use cpakit_core::schema::{Metadata, MetadataProvider};

use crate::args::{InspectArgs, InspectFormat};

/// One row of the inspect listing.
#[derive(Debug, Serialize)]
struct TableSummary {
    name: String,
    primary_key: Option<String>,
    parents: Vec<String>,
    children: Vec<String>,
    fields: usize,
    data_file: String,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let config = super::load_config()?;
    let metadata = super::load_metadata(&args.source, config.as_ref())?;
    let summaries = summarize(&metadata)?;

    let saved = match args.report {
        Some(ref path) => Some(
            report::read_report(path)
                .with_context(|| format!("Failed to read report {}", path.display()))?,
        ),
        None => None,
    };

    match args.format {
        InspectFormat::Json => {
            let json = match saved {
                Some(ref r) => serde_json::json!({
                    "tables": summaries,
                    "report": r,
                    "report_stale": r.is_stale(metadata.document()),
                }),
                None => serde_json::json!({ "tables": summaries }),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        InspectFormat::Table => {
            let doc = metadata.document();
            println!(
                "Tables: {}  Fields: {}  Foreign Keys: {}",
                doc.table_count(),
                doc.field_count(),
                doc.foreign_key_count()
            );
            println!("Roots: {}", metadata.graph().roots().join(", "));
            println!();

            let mut t = ComfyTable::new();
            t.set_header(vec!["Table", "PK", "Parent", "Children", "Fields", "Data"]);
            for s in &summaries {
                t.add_row(vec![
                    Cell::new(&s.name),
                    Cell::new(s.primary_key.as_deref().unwrap_or("")),
                    Cell::new(s.parents.join(", ")),
                    Cell::new(s.children.join(", ")),
                    Cell::new(s.fields),
                    Cell::new(&s.data_file),
                ]);
            }
            println!("{}", t);

            if let Some(ref r) = saved {
                println!();
                print_report(r, metadata.document().table_count(), r.is_stale(metadata.document()));
            }
        }
    }

    Ok(())
}

fn summarize(metadata: &Metadata) -> Result<Vec<TableSummary>> {
    metadata
        .document()
        .tables
        .iter()
        .map(|table| {
            Ok(TableSummary {
                name: table.name.clone(),
                primary_key: table.primary_key.clone(),
                parents: metadata.get_parents(&table.name)?,
                children: metadata.get_children(&table.name)?,
                fields: table.fields.len(),
                data_file: metadata.root().join(table.data_path()).display().to_string(),
            })
        })
        .collect()
}

fn print_report(report: &ModelReport, table_count: usize, stale: bool) {
    println!(
        "Report: {} model, {} of {} tables, {} parameters (cpakit {}, {})",
        report.model.kind,
        report.parameters.len(),
        table_count,
        report.parameter_count(),
        report.cpakit_version,
        report.created_at
    );
    if stale {
        println!("  ⚠ The metadata changed since this report was written. Run `cpakit model` again.");
    }

    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Rows", "Parameters"]);
    for (table, rows) in &report.table_sizes {
        t.add_row(vec![
            Cell::new(table),
            Cell::new(rows),
            Cell::new(report.parameters.get(table).map_or(0, |p| p.len())),
        ]);
    }
    println!("{}", t);
}
