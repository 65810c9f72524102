use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_catalog,
    output::{plural, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TypeEntry {
    token: String,
    kind: String,
    name: String,
    methods: usize,
    fields: usize,
}

#[derive(Debug, Serialize)]
struct TypesOutput {
    types: Vec<TypeEntry>,
    count: usize,
}

pub fn run(
    path: &Path,
    namespace: Option<&str>,
    kind: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let catalog = load_catalog(path)?;

    let mut entries = Vec::new();
    for def in catalog.types() {
        if let Some(ns) = namespace {
            if def.name.namespace != ns {
                continue;
            }
        }

        let def_kind = catalog.kind(def).to_string();
        if let Some(wanted) = kind {
            if !def_kind.eq_ignore_ascii_case(wanted) {
                continue;
            }
        }

        entries.push(TypeEntry {
            token: def.token.to_string(),
            kind: def_kind,
            name: def.full_name(),
            methods: def.methods.len(),
            fields: def.fields.len(),
        });
    }

    let count = entries.len();
    let output = TypesOutput {
        types: entries,
        count,
    };

    print_output(&output, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Token", Align::Left),
            ("Kind", Align::Left),
            ("Methods", Align::Right),
            ("Fields", Align::Right),
            ("Name", Align::Left),
        ]);
        for e in &out.types {
            tw.row([
                e.token.clone(),
                e.kind.clone(),
                e.methods.to_string(),
                e.fields.to_string(),
                e.name.clone(),
            ]);
        }
        tw.print();
        println!("\n{} listed.", plural(out.count, "type"));
    })
}
