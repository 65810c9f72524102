use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_builder, load_builder_catalog},
    output::{plural, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct RootEntry {
    token: String,
    kind: String,
    name: String,
    members: Option<usize>,
    generated: bool,
}

#[derive(Debug, Serialize)]
struct SelectOutput {
    roots: Vec<RootEntry>,
    unmatched: Vec<String>,
    count: usize,
}

pub fn run(config: &Path, winmd: Option<&Path>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let builder = load_builder(config, winmd)?;
    builder.config().architecture()?;

    let catalog = load_builder_catalog(&builder)?;
    let selection = builder.select(&catalog)?;

    let roots: Vec<RootEntry> = selection
        .roots
        .iter()
        .filter_map(|token| catalog.get(*token))
        .map(|def| RootEntry {
            token: def.token.to_string(),
            kind: catalog.kind(def).to_string(),
            name: def.full_name(),
            members: selection
                .filters
                .get(&def.token)
                .map(|filter| {
                    filter
                        .included
                        .iter()
                        .filter(|member| filter.allows(**member))
                        .count()
                }),
            generated: !selection.not_generated.contains(&def.token),
        })
        .collect();

    let output = SelectOutput {
        count: roots.len(),
        roots,
        unmatched: selection.unmatched,
    };

    print_output(&output, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Token", Align::Left),
            ("Kind", Align::Left),
            ("Members", Align::Right),
            ("Name", Align::Left),
        ]);
        for e in &out.roots {
            let name = if e.generated {
                e.name.clone()
            } else {
                format!("{} (not generated)", e.name)
            };
            tw.row([
                e.token.clone(),
                e.kind.clone(),
                e.members.map_or_else(|| "all".to_string(), |n| n.to_string()),
                name,
            ]);
        }
        tw.print();

        println!("\n{} selected.", plural(out.count, "root"));
        for pattern in &out.unmatched {
            println!("No match: {pattern}");
        }
    })
}
