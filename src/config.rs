use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Default markup for a rendered definition.
pub const DEFAULT_DEFINITION_TEMPLATE: &str = "<dfn id=\"{id}\">{name}</dfn>";

/// Default markup for a rendered reference.
pub const DEFAULT_REFERENCE_TEMPLATE: &str = "<a id=\"{anchor}\" href=\"{def_path}#{id}\">{name}</a>";

/// Default directory rendered documents are written to.
const DEFAULT_OUTPUT: &str = "defref-out";

/// Project configuration loaded from `.defref.toml`.
/// Include/exclude patterns are path prefixes applied to markdown source files.
#[derive(Debug)]
pub struct Config {
    exclude: Vec<String>,
    include: Vec<String>,
    /// Directory rendered documents are written to, relative to the root.
    pub output: PathBuf,
    /// Markup templates for definitions and references.
    pub templates: Templates,
}

/// Markup templates with `{placeholder}` substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    /// Template for a definition site.
    pub definition: String,
    /// Template for an explicit or implicit reference site.
    pub reference: String,
}

impl Default for Templates {
    fn default() -> Self {
        return Self {
            definition: DEFAULT_DEFINITION_TEMPLATE.to_string(),
            reference: DEFAULT_REFERENCE_TEMPLATE.to_string(),
        };
    }
}

/// Raw TOML structure for `.defref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DefrefTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    output: Option<String>,
    #[serde(default)]
    templates: RawTemplates,
}

/// Raw `[templates]` table; missing keys fall back to the defaults.
#[derive(Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplates {
    definition: Option<String>,
    reference: Option<String>,
}

impl Config {
    /// Load config from `.defref.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if a value is unusable.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".defref.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::scan_everything_by_default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse `.defref.toml` content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if a value is unusable.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: DefrefTomlConfig = toml::from_str(content)?;

        let output = raw.output.unwrap_or_else(|| return DEFAULT_OUTPUT.to_string());
        let output = normalize_path(Path::new(output.trim()));
        if output.as_os_str().is_empty() {
            return Err(Error::ConfigInvalid {
                reason: "`output` must name a directory below the project root".to_string(),
            });
        }

        let defaults = Templates::default();
        let templates = Templates {
            definition: raw.templates.definition.unwrap_or(defaults.definition),
            reference: raw.templates.reference.unwrap_or(defaults.reference),
        };
        for (key, value) in [("definition", &templates.definition), ("reference", &templates.reference)] {
            if value.is_empty() {
                return Err(Error::ConfigInvalid {
                    reason: format!("`templates.{key}` must not be empty"),
                });
            }
        }

        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            output,
            templates,
        });
    }

    /// Default config that includes everything and excludes nothing.
    fn scan_everything_by_default() -> Self {
        return Self {
            exclude: Vec::new(),
            include: Vec::new(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            templates: Templates::default(),
        };
    }

    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern
    /// or lies inside the output directory.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included || Path::new(relative_path).starts_with(&self.output) {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into its parent.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(components.last(), Some(c) if !matches!(c, Component::ParentDir));
            if can_pop {
                components.pop();
            } else {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}
