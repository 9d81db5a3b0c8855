use anyhow::Result;

use cpakit_core::graph::visualize::{self, GraphFormat as VizFormat};

use crate::args::GraphArgs;

pub fn run(args: &GraphArgs) -> Result<()> {
    let config = super::load_config()?;
    let metadata = super::load_metadata(&args.source, config.as_ref())?;

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(metadata.graph(), format);
    println!("{}", output);

    Ok(())
}
