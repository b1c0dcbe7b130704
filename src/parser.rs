//! Marker recognition: splits fragment sequences around definition and
//! reference markers.
//!
//! The engine only talks to the [`MarkerParser`] trait. [`MarkerSyntax`] is the
//! grammar the CLI uses:
//!
//! ```text
//! {{def: Widget | Gadget #widget-1}}   definition, aliases, explicit id
//! {{ref: widget-1}}                    explicit reference by id
//! {{!Widget}}                          escaped reference, shown as plain text
//! Widget                               implicit reference (word bounded)
//! ```

use std::ops::Range;

use regex::Regex;

use crate::types::{Fragment, Position};

/// A definition marker as written, before registry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionMarker {
    /// Aliases in marker order.
    pub alias: Vec<String>,
    /// Explicit identifier, empty when the marker gave none.
    pub id: String,
    /// Primary name.
    pub name: String,
}

/// An explicit or escaped reference marker as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceMarker {
    /// Literal display text, resolved by name or alias.
    Escaped {
        /// Text between the delimiters, surrounding whitespace included.
        text: String,
    },
    /// Identifier of the target definition.
    Explicit {
        /// The identifier.
        id: String,
    },
}

/// A marker together with the fragment it now occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<T> {
    /// Index into [`Parsed::fragments`] of the matched slice.
    pub fragment: usize,
    /// The recognised marker.
    pub marker: T,
}

/// Result of one parsing pass: the refined fragment sequence and the matches
/// found in it, in document order. Matched fragments have `skip` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    /// Fragments after splitting around every match.
    pub fragments: Vec<Fragment>,
    /// Matches in document order.
    pub matches: Vec<Match<T>>,
}

/// Lexical grammar of markers. Implementations only classify text; they never
/// consult the registry.
pub trait MarkerParser {
    /// Find definition markers in raw text.
    fn parse_definition(&self, text: &str, position: &Position) -> Parsed<DefinitionMarker> {
        return self.parse_definition_from_fragments(vec![Fragment::open(text, position.clone())]);
    }

    /// Find definition markers in the open fragments of a sequence.
    fn parse_definition_from_fragments(&self, fragments: Vec<Fragment>) -> Parsed<DefinitionMarker>;

    /// Find explicit and escaped reference markers in the open fragments.
    fn parse_explicit_or_escaped_reference(&self, fragments: Vec<Fragment>) -> Parsed<ReferenceMarker>;

    /// Find bare occurrences of `text` in the open fragments.
    fn parse_implicit_reference(&self, fragments: Vec<Fragment>, text: &str) -> Parsed<String>;
}

/// The `{{def: ...}}` / `{{ref: ...}}` / `{{!...}}` grammar.
#[derive(Debug, Clone)]
pub struct MarkerSyntax {
    definition: Regex,
    reference: Regex,
}

impl Default for MarkerSyntax {
    fn default() -> Self {
        return Self::new();
    }
}

impl MarkerSyntax {
    /// Compile the marker patterns.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded marker regexes are invalid (compile-time invariant).
    pub fn new() -> Self {
        return Self {
            definition: Regex::new(r"\{\{def:([^{}#]*)(?:#([^{}\s]+))?\s*\}\}").expect("valid regex"),
            reference: Regex::new(r"\{\{(?:ref:\s*([^{}\s]+)\s*|!([^{}]+))\}\}").expect("valid regex"),
        };
    }

    /// Read a definition marker's capture groups. `None` when no name was given.
    fn definition_marker(&self, text: &str) -> Option<DefinitionMarker> {
        let cap = self.definition.captures(text)?;
        let mut names = cap
            .get(1)
            .map_or("", |m| return m.as_str())
            .split('|')
            .map(str::trim)
            .filter(|n| return !n.is_empty())
            .map(String::from);

        let name = names.next()?;
        let id = cap.get(2).map_or(String::new(), |m| return m.as_str().to_string());
        return Some(DefinitionMarker {
            alias: names.collect(),
            id,
            name,
        });
    }
}

impl MarkerParser for MarkerSyntax {
    fn parse_definition_from_fragments(&self, fragments: Vec<Fragment>) -> Parsed<DefinitionMarker> {
        return split_fragments(fragments, |text| {
            return self
                .definition
                .find_iter(text)
                .filter_map(|m| {
                    let marker = self.definition_marker(m.as_str())?;
                    return Some((m.range(), marker));
                })
                .collect();
        });
    }

    fn parse_explicit_or_escaped_reference(&self, fragments: Vec<Fragment>) -> Parsed<ReferenceMarker> {
        return split_fragments(fragments, |text| {
            return self
                .reference
                .captures_iter(text)
                .filter_map(|cap| {
                    let whole = cap.get(0)?;
                    if let Some(id) = cap.get(1) {
                        let marker = ReferenceMarker::Explicit { id: id.as_str().to_string() };
                        return Some((whole.range(), marker));
                    }
                    let literal = cap.get(2)?.as_str();
                    if literal.trim().is_empty() {
                        return None;
                    }
                    let marker = ReferenceMarker::Escaped { text: literal.to_string() };
                    return Some((whole.range(), marker));
                })
                .collect();
        });
    }

    fn parse_implicit_reference(&self, fragments: Vec<Fragment>, text: &str) -> Parsed<String> {
        return split_fragments(fragments, |haystack| {
            return find_word_bounded(haystack, text)
                .into_iter()
                .map(|range| return (range, text.to_string()))
                .collect();
        });
    }
}

/// Split every open fragment around the byte ranges `find` reports.
/// Ranges must be sorted and non-overlapping. Skipped fragments pass through.
fn split_fragments<T, F>(fragments: Vec<Fragment>, find: F) -> Parsed<T>
where
    F: Fn(&str) -> Vec<(Range<usize>, T)>,
{
    let mut out = Vec::with_capacity(fragments.len());
    let mut matches = Vec::new();

    for fragment in fragments {
        if fragment.skip {
            out.push(fragment);
            continue;
        }
        let found = find(fragment.text.as_str());
        if found.is_empty() {
            out.push(fragment);
            continue;
        }

        let mut cursor = 0;
        for (range, marker) in found {
            let (Some(before), Some(matched)) =
                (fragment.text.get(cursor..range.start), fragment.text.get(range.clone()))
            else {
                continue;
            };
            let before_pos = fragment.position.advance(fragment.text.get(..cursor).unwrap_or(""));
            if !before.is_empty() {
                out.push(Fragment::open(before, before_pos.clone()));
            }
            matches.push(Match { fragment: out.len(), marker });
            out.push(Fragment::matched(matched, before_pos.advance(before)));
            cursor = range.end;
        }

        let rest = fragment.text.get(cursor..).unwrap_or("");
        if !rest.is_empty() {
            let rest_pos = fragment.position.advance(fragment.text.get(..cursor).unwrap_or(""));
            out.push(Fragment::open(rest, rest_pos));
        }
    }

    return Parsed { fragments: out, matches };
}

/// Whether `c` continues a word, so a name touching it is not a separate occurrence.
fn is_word_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_';
}

/// Leftmost non-overlapping occurrences of `needle` whose neighbours are not word characters.
fn find_word_bounded(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    if needle.is_empty() {
        return found;
    }

    let mut from = 0;
    while let Some(offset) = haystack.get(from..).and_then(|h| return h.find(needle)) {
        let start = from.saturating_add(offset);
        let end = start.saturating_add(needle.len());
        let before = haystack.get(..start).and_then(|s| return s.chars().next_back());
        let after = haystack.get(end..).and_then(|s| return s.chars().next());
        let bounded = !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char);

        if bounded {
            found.push(start..end);
            from = end;
        } else {
            // Step one character past the rejected start.
            let step = haystack.get(start..).and_then(|s| return s.chars().next()).map_or(1, char::len_utf8);
            from = start.saturating_add(step);
        }
    }
    return found;
}
