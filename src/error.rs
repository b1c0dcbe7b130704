/// Crate-level error types for defref diagnostics.
use std::fmt;

/// All errors in defref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the key, document, or reason for failure.
#[allow(clippy::error_impl_error, reason = "single crate-wide error type")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.defref.toml` parsed but holds a value that cannot be used.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// Description of the problem.
        reason: String,
    },

    /// A reference marker names a definition that is not registered.
    #[error("dangling {kind} reference `{target}` at {path}:{line}:{column}")]
    DanglingReference {
        /// One-based column of the marker.
        column: u32,
        /// Marker kind that failed to resolve.
        kind: crate::types::RefKind,
        /// One-based line of the marker.
        line: u32,
        /// Document containing the marker.
        path: String,
        /// Identifier or literal text the marker carried.
        target: String,
    },

    /// A reverse lookup found no definition for the query.
    #[error("definition not found: {query}")]
    DefinitionNotFound {
        /// The id or name that was looked up.
        query: crate::types::RefQuery,
    },

    /// A name, alias, or identifier is already registered.
    #[error("duplicate {kind} `{key}` in {path} (first defined in {first_path})")]
    DuplicateDefinition {
        /// Document that registered the key first.
        first_path: String,
        /// Which table the key collided in.
        kind: KeyKind,
        /// The colliding name, alias, or identifier.
        key: String,
        /// Document holding the second definition.
        path: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}

/// The registry table a duplicate key collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// An alias collided with a registered name or alias.
    Alias,
    /// An identifier collided with a registered identifier.
    Id,
    /// A primary name collided with a registered name or alias.
    Name,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KeyKind::Alias => "alias",
            KeyKind::Id => "id",
            KeyKind::Name => "name",
        };
        return f.write_str(label);
    }
}
