/// Core domain types for defref: positions, fragments, definitions, and references.
use std::fmt;

/// Location of a fragment inside a document. One-based line and column,
/// columns counted in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// One-based column.
    pub column: u32,
    /// One-based line.
    pub line: u32,
    /// Document the position belongs to.
    pub path: String,
}

impl Position {
    /// Position of the first character of `path`.
    pub fn start(path: &str) -> Self {
        return Self {
            column: 1,
            line: 1,
            path: path.to_string(),
        };
    }

    /// The position reached after reading `text` from `self`.
    pub fn advance(&self, text: &str) -> Self {
        let newlines: u32 = text.matches('\n').count().try_into().unwrap_or(u32::MAX);
        let tail = text.rsplit('\n').next().unwrap_or("");
        let tail_chars: u32 = tail.chars().count().try_into().unwrap_or(u32::MAX);

        let (line, column) = if newlines == 0 {
            (self.line, self.column.saturating_add(tail_chars))
        } else {
            (self.line.saturating_add(newlines), tail_chars.saturating_add(1))
        };

        return Self {
            column,
            line,
            path: self.path.clone(),
        };
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}:{}:{}", self.path, self.line, self.column);
    }
}

/// A contiguous slice of document text. Once `skip` is set, no later
/// rewrite stage scans the slice again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Where the slice starts in the original document.
    pub position: Position,
    /// Whether an earlier stage already matched this slice.
    pub skip: bool,
    /// The slice content.
    pub text: String,
}

impl Fragment {
    /// An unmatched slice that later stages may still scan.
    pub fn open(text: impl Into<String>, position: Position) -> Self {
        return Self {
            position,
            skip: false,
            text: text.into(),
        };
    }

    /// A slice claimed by a stage.
    pub fn matched(text: impl Into<String>, position: Position) -> Self {
        return Self {
            position,
            skip: true,
            text: text.into(),
        };
    }
}

/// Concatenate fragment contents back into document text.
pub fn join_fragments(fragments: &[Fragment]) -> String {
    return fragments.iter().map(|f| return f.text.as_str()).collect();
}

/// Handle into the registry's definition arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefKey(pub(crate) usize);

/// One canonical concept and every place it has been referenced.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Secondary names, in marker order.
    pub alias: Vec<String>,
    /// The rendered definition slice, once the defining document is rendered.
    pub fragment: Option<Fragment>,
    /// Corpus-unique identifier.
    pub id: String,
    /// Primary display name.
    pub name: String,
    /// Document the definition was collected from.
    pub path: String,
    /// References in discovery order.
    pub refs: Vec<Reference>,
}

impl Definition {
    /// Most recently allocated linking ordinal, if any reference carried one.
    pub fn last_index(&self) -> Option<usize> {
        return self.refs.iter().rev().find_map(|r| return r.index);
    }

    /// Ordinal the next linking reference receives.
    pub fn next_index(&self) -> usize {
        return self.last_index().map_or(0, |i| return i.saturating_add(1));
    }

    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        return std::iter::once(self.name.as_str()).chain(self.alias.iter().map(String::as_str));
    }
}

/// How a reference occurrence was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// Literal text that displays the name without linking.
    Escaped,
    /// A marker naming the definition by identifier.
    Explicit,
    /// A bare occurrence of the name or an alias.
    Implicit,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RefKind::Escaped => "escaped",
            RefKind::Explicit => "explicit",
            RefKind::Implicit => "implicit",
        };
        return f.write_str(label);
    }
}

/// One occurrence pointing at a definition.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Target definition.
    pub def: DefKey,
    /// The rewritten slice at the occurrence site.
    pub fragment: Fragment,
    /// Linking ordinal. Escaped references reuse the last one and may have none.
    pub index: Option<usize>,
    /// How the occurrence was written.
    pub kind: RefKind,
    /// Literal text used at the occurrence.
    pub name: String,
    /// Document the occurrence was found in.
    pub path: String,
}

/// Reverse lookup key: an identifier or a name/alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefQuery {
    /// Look up by identifier.
    Id(String),
    /// Look up by primary name or alias.
    Name(String),
}

impl fmt::Display for RefQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            RefQuery::Id(id) => write!(f, "id `{id}`"),
            RefQuery::Name(name) => write!(f, "name `{name}`"),
        };
    }
}
