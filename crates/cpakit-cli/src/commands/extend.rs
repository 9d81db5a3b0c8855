use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::{Context, Result};

use cpakit_core::output::write_frame_csv;
use cpakit_core::Modeler;

use crate::args::ExtendArgs;

pub fn run(args: &ExtendArgs) -> Result<()> {
    let config = super::load_config()?;
    let metadata = super::load_metadata(&args.source, config.as_ref())?;
    let model_config = super::model_config(&args.options, config.as_ref());

    let pb = super::spinner("1/2", &format!("Modeling {}...", args.table))?;
    let mut modeler = Modeler::new(metadata, model_config);
    let extended = modeler.cpa(&args.table, None, None)?;
    pb.finish_with_message(format!(
        "Modeling {}... ✓ {} tables fitted",
        args.table,
        modeler.models().len()
    ));

    match args.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_frame_csv(BufWriter::new(file), &extended)?;
            eprintln!(
                "[2/2] Wrote {} rows × {} columns to {}",
                extended.len(),
                extended.width(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            write_frame_csv(stdout.lock(), &extended)?;
        }
    }

    Ok(())
}
