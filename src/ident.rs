//! Identifier generators: definition ids from names, anchors for references.

use crate::types::{Definition, Reference};

/// Maps a definition's display name to its identifier when none was given.
pub type DefIdGenerator = Box<dyn Fn(&str) -> String>;

/// Maps a recorded reference to the anchor a reverse link points at.
pub type RefIdGenerator = Box<dyn Fn(&Definition, &Reference) -> String>;

/// Convert a display name to a URL-compatible slug.
/// Lowercase, non-alphanumeric runs to a single hyphen, trim edges.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // Start true to trim leading hyphens.

    for c in lowered.chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
            continue;
        }
        if prev_hyphen {
            continue;
        }
        result.push('-');
        prev_hyphen = true;
    }

    if result.ends_with('-') {
        result.pop();
    }
    return result;
}

/// Default anchor: `<defId>-ref-<n>` with `n` one-based.
/// An escaped reference recorded before any linking one gets `n = 0`.
pub fn anchor_for(def: &Definition, reference: &Reference) -> String {
    let n = reference.index.map_or(0, |i| return i.saturating_add(1));
    return format!("{}-ref-{n}", def.id);
}
