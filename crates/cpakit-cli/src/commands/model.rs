use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};

use cpakit_core::report::{self, ModelReport, REPORT_FILE_NAME};
use cpakit_core::schema::MetadataProvider;
use cpakit_core::Modeler;

use crate::args::ModelArgs;

pub fn run(args: &ModelArgs) -> Result<()> {
    let config = super::load_config()?;

    // Phase 1: Metadata
    let pb = super::spinner("1/3", "Loading metadata...")?;
    let metadata = super::load_metadata(&args.source, config.as_ref())?;
    let table_count = metadata.document().table_count();
    pb.finish_with_message(format!(
        "Loading metadata... ✓ {} tables, {} foreign keys",
        table_count,
        metadata.document().foreign_key_count()
    ));

    // Phase 2: Model
    let model_config = super::model_config(&args.options, config.as_ref());
    let pb2 = ProgressBar::new(0);
    pb2.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [2/3] Modeling {msg} {bar:40.cyan/dim} {pos}/{len}")?
            .progress_chars("█▓░"),
    );

    let progress = pb2.clone();
    let mut modeler = Modeler::new(metadata, model_config.clone()).with_progress(
        move |table, rows| {
            progress.set_message(format!("{} ({} rows)", table, rows));
            progress.inc(1);
        },
    );
    let planned = modeler.planned_tables()?;
    pb2.set_length(planned.len() as u64);
    modeler.model_database(None)?;
    pb2.finish_with_message(format!("✓ {} tables", modeler.models().len()));

    let skipped: Vec<String> = modeler
        .metadata()
        .get_tables()
        .into_iter()
        .filter(|t| !planned.contains(t))
        .collect();
    if !skipped.is_empty() {
        eprintln!(
            "  ⚠ Not modeled (a parent has no primary key): {}",
            skipped.join(", ")
        );
    }

    // Phase 3: Report
    let pb3 = super::spinner("3/3", "Writing report...")?;
    let report = ModelReport::from_modeler(&modeler, &model_config)?;
    let path = args
        .output
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.report_path()))
        .unwrap_or_else(|| PathBuf::from(REPORT_FILE_NAME));
    report::write_report(&report, &path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    pb3.finish_with_message(format!("Writing report... ✓ {}", path.display()));

    println!();
    println!(
        "Model: {} ({} marginals)",
        model_config.kind, model_config.distribution
    );

    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Rows", "Parameters"]);
    for (table, rows) in &report.table_sizes {
        let params = report.parameters.get(table).map_or(0, |p| p.len());
        t.add_row(vec![
            Cell::new(table),
            Cell::new(rows),
            Cell::new(params),
        ]);
    }
    println!("{}", t);
    println!("Total parameters: {}", report.parameter_count());

    Ok(())
}
