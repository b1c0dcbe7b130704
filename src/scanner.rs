use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::corpus::Document;
use crate::error::Error;

/// Scan all markdown files under `root` into documents.
/// Applies the config's include/exclude filters to control which files are read.
/// Directories in `skip_dirs` (rendered output) are pruned from the walk.
/// Documents are sorted by path, which fixes corpus processing order.
///
/// # Errors
///
/// Returns `Error::Io` if any markdown file cannot be read.
pub fn scan(root: &Path, config: &Config, skip_dirs: &[PathBuf]) -> Result<Vec<Document>, Error> {
    // Missing directories cannot hold documents yet.
    let skipped: Vec<PathBuf> = skip_dirs.iter().filter_map(|d| return std::fs::canonicalize(d).ok()).collect();
    let mut documents = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return !is_skipped_dir(e, &skipped))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return e.path().extension().is_some_and(|ext| return ext == "md"))
    {
        let md_path = entry.path();
        let relative = corpus_path(md_path.strip_prefix(root).unwrap_or(md_path));
        if !config.should_scan(&relative) {
            continue;
        }

        let text = std::fs::read_to_string(md_path)?;
        documents.push(Document { path: relative, text });
    }

    documents.sort_by(|a, b| return a.path.cmp(&b.path));
    return Ok(documents);
}

/// Whether a walked entry is one of the canonicalized skip directories.
fn is_skipped_dir(entry: &walkdir::DirEntry, skipped: &[PathBuf]) -> bool {
    if skipped.is_empty() || entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    return std::fs::canonicalize(entry.path()).is_ok_and(|p| return skipped.contains(&p));
}

/// Corpus-relative document id: components joined with `/` on every platform.
fn corpus_path(relative: &Path) -> String {
    return relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => return Some(part.to_string_lossy()),
            _ => return None,
        })
        .collect::<Vec<_>>()
        .join("/");
}
