//! CLI commands for defref: render, check, refs, index.

use std::path::{Path, PathBuf};

use defref::config::Config;
use defref::corpus::{self, RenderedDocument};
use defref::error::Error;
use defref::types::RefQuery;
use defref::{Engine, scanner, template};
use serde::Serialize;

/// Scan the project, run both passes, and hand back the engine with the results.
/// The configured output directory and `out`, when given, are never scanned.
///
/// # Errors
///
/// Returns errors from config loading, scanning, or either pass.
fn process_project(root: &Path, out: Option<&Path>) -> Result<(Config, Engine, Vec<RenderedDocument>), Error> {
    let config = Config::load(root)?;
    let mut skip_dirs = vec![root.join(&config.output)];
    if let Some(out) = out {
        skip_dirs.push(root.join(out));
    }
    let documents = scanner::scan(root, &config, &skip_dirs)?;

    let mut engine = Engine::new();
    let templates = config.templates.clone();
    let rendered = corpus::process(
        &mut engine,
        &documents,
        |def| return template::render_definition(&templates.definition, def),
        |def, r| return template::render_reference(&templates.reference, def, r),
    )?;

    return Ok((config, engine, rendered));
}

/// Render every document into the output directory, mirroring source paths.
///
/// # Errors
///
/// Returns processing errors, or `Error::Io` if an output file cannot be written.
pub fn render(out: Option<PathBuf>) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let (config, engine, rendered) = process_project(&root, out.as_deref())?;
    let out_dir = root.join(out.unwrap_or(config.output));

    for doc in &rendered {
        let target = out_dir.join(&doc.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &doc.text)?;
    }

    let doc_count = rendered.len();
    let def_count = engine.registry().len();
    println!("Rendered {doc_count} documents ({def_count} definitions) to {}", out_dir.display());
    return Ok(());
}

/// Resolve the whole corpus without writing anything.
/// Lists definitions that nothing references.
///
/// # Errors
///
/// Returns the first duplicate or dangling reference error.
pub fn check() -> Result<(), Error> {
    let root = PathBuf::from(".");
    let (_, engine, _) = process_project(&root, None)?;

    let mut ref_count = 0_usize;
    for def in engine.definitions() {
        ref_count = ref_count.saturating_add(def.refs.len());
        if def.refs.is_empty() {
            println!("UNUSED  {} ({})", def.name, def.path);
        }
    }

    let def_count = engine.registry().len();
    println!("{def_count} definitions, {ref_count} references, all resolved");
    return Ok(());
}

/// Print the reverse references of one definition, one `path#anchor` per line.
///
/// # Errors
///
/// Returns processing errors, or `Error::DefinitionNotFound`.
pub fn refs(query: &str, by_id: bool) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let (_, engine, _) = process_project(&root, None)?;

    let query = if by_id {
        RefQuery::Id(query.to_string())
    } else {
        RefQuery::Name(query.to_string())
    };
    for location in engine.reverse_refs(&query)? {
        println!("{location}");
    }
    return Ok(());
}

/// JSON shape of one definition in the reverse index.
#[derive(Serialize)]
struct IndexEntry<'a> {
    aliases: &'a [String],
    id: &'a str,
    name: &'a str,
    path: &'a str,
    refs: Vec<IndexRef<'a>>,
}

/// JSON shape of one recorded reference.
#[derive(Serialize)]
struct IndexRef<'a> {
    anchor: String,
    index: Option<usize>,
    kind: defref::RefKind,
    location: String,
    text: &'a str,
}

/// Print the full reverse index as JSON.
///
/// # Errors
///
/// Returns processing errors, or `Error::Json` if serialization fails.
pub fn index() -> Result<(), Error> {
    let root = PathBuf::from(".");
    let (_, engine, _) = process_project(&root, None)?;

    let entries: Vec<IndexEntry<'_>> = engine
        .definitions()
        .map(|def| {
            let refs = def
                .refs
                .iter()
                .map(|r| {
                    let anchor = engine.anchor(r);
                    return IndexRef {
                        location: format!("{}#{anchor}", r.path),
                        anchor,
                        index: r.index,
                        kind: r.kind,
                        text: &r.name,
                    };
                })
                .collect();
            return IndexEntry {
                aliases: &def.alias,
                id: &def.id,
                name: &def.name,
                path: &def.path,
                refs,
            };
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    return Ok(());
}
