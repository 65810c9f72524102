use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_builder, load_builder_catalog},
    output::{plural, print_output, Align, TabWriter},
};

/// Command-line adjustments to a configured build.
pub struct GenerateOptions<'a> {
    pub winmd: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOutput {
    output_directory: String,
    units: Vec<String>,
    written: Option<usize>,
    unchanged: Option<usize>,
    removed: Option<usize>,
    unmatched: Vec<String>,
    patched: usize,
    missing_patches: Vec<String>,
}

pub fn run(config: &Path, options: &GenerateOptions, opts: &GlobalOptions) -> anyhow::Result<()> {
    let mut builder = load_builder(config, options.winmd)?;
    if let Some(output) = options.output {
        builder = builder.with_output_directory(output);
    }

    // surfaces configuration errors before the image is decoded
    builder.patches()?;
    builder.config().architecture()?;

    let catalog = load_builder_catalog(&builder)?;
    let result = builder.generate(&catalog)?;

    let summary = if options.dry_run || !builder.config().generate_files {
        None
    } else {
        Some(builder.write(&result.units)?)
    };

    let output = GenerateOutput {
        output_directory: result.output_directory.display().to_string(),
        units: result
            .units
            .iter()
            .map(|unit| unit.path.display().to_string())
            .collect(),
        written: summary.as_ref().map(|s| s.written),
        unchanged: summary.as_ref().map(|s| s.unchanged),
        removed: summary.as_ref().map(|s| s.removed),
        unmatched: result.unmatched,
        patched: result.patched,
        missing_patches: result.missing_patches,
    };

    print_output(&output, opts, |out| {
        for pattern in &out.unmatched {
            println!("No match: {pattern}");
        }

        match (out.written, out.unchanged, out.removed) {
            (Some(written), Some(unchanged), Some(removed)) => {
                let mut tw = TabWriter::new(&[("Output", Align::Left), ("Files", Align::Right)]);
                tw.row(["written".to_string(), written.to_string()]);
                tw.row(["unchanged".to_string(), unchanged.to_string()]);
                tw.row(["removed".to_string(), removed.to_string()]);
                tw.print();
                println!(
                    "\n{} generated in {}.",
                    plural(out.units.len(), "unit"),
                    out.output_directory
                );
            }
            _ => {
                for unit in &out.units {
                    println!("{unit}");
                }
                println!("\n{} generated, nothing written.", plural(out.units.len(), "unit"));
            }
        }

        if out.patched > 0 {
            println!("{} patched.", plural(out.patched, "member"));
        }
        for target in &out.missing_patches {
            println!("Patch target not found: {target}");
        }
    })
}
