use defref::Error;
use defref::error::KeyKind;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened, why, and how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::DuplicateDefinition { first_path, kind, key, path } => {
            render_duplicate_definition(key, *kind, path, first_path)
        },
        Error::DanglingReference { column, kind, line, path, target } => {
            render_dangling_reference(&format!("{path}:{line}:{column}"), &kind.to_string(), target)
        },
        Error::DefinitionNotFound { query } => format!("\
# Error: Definition Not Found

No definition matches {query}.

## Fix

List every registered definition:

    defref index
"),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::ConfigInvalid { reason } => format!("\
# Error: Invalid Config

{reason}

## Fix

Correct the value in `.defref.toml`.
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_duplicate_definition(key: &str, kind: KeyKind, path: &str, first_path: &str) -> String {
    let what = match kind {
        KeyKind::Alias => "alias",
        KeyKind::Id => "identifier",
        KeyKind::Name => "name",
    };
    format!("\
# Error: Duplicate Definition

The {what} `{key}` in `{path}` is already defined in `{first_path}`.

Every name, alias, and identifier must be unique across the corpus.

## Fix

Rename one of the definitions, or give it an explicit id:

    {{{{def: {key} #another-id}}}}
")
}

fn render_dangling_reference(location: &str, kind: &str, target: &str) -> String {
    let hint = if kind == "escaped" {
        "Escaped references name a definition by its name or an alias."
    } else {
        "Explicit references name a definition by its identifier."
    };
    format!("\
# Error: Dangling Reference

The {kind} reference `{target}` at {location} matches no definition.

{hint}

## Fix

Add a definition for it somewhere in the corpus:

    {{{{def: {target}}}}}
")
}
