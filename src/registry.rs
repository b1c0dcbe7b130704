//! Definition registry: name/alias and identifier lookup tables over an
//! arena of definitions, with corpus-wide uniqueness enforcement.

use std::collections::HashMap;

use crate::error::{Error, KeyKind};
use crate::types::{DefKey, Definition, RefQuery};

/// Owns every definition of one corpus-processing session.
/// Definitions are never removed, so a [`DefKey`] stays valid for the
/// registry's lifetime.
#[derive(Debug, Default)]
pub struct Registry {
    /// Definitions in registration order.
    defs: Vec<Definition>,
    /// Identifier to definition.
    id2def: HashMap<String, DefKey>,
    /// Primary name or alias to definition.
    name2def: HashMap<String, DefKey>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Borrow a definition by handle.
    ///
    /// # Panics
    ///
    /// Panics if `key` came from a different registry.
    pub fn get(&self, key: DefKey) -> &Definition {
        return &self.defs[key.0];
    }

    /// Mutably borrow a definition by handle.
    ///
    /// # Panics
    ///
    /// Panics if `key` came from a different registry.
    pub fn get_mut(&mut self, key: DefKey) -> &mut Definition {
        return &mut self.defs[key.0];
    }

    /// Look up by identifier.
    pub fn by_id(&self, id: &str) -> Option<DefKey> {
        return self.id2def.get(id).copied();
    }

    /// Look up by primary name or alias.
    pub fn by_name(&self, name: &str) -> Option<DefKey> {
        return self.name2def.get(name).copied();
    }

    /// Look up by either form of query.
    pub fn lookup(&self, query: &RefQuery) -> Option<DefKey> {
        return match query {
            RefQuery::Id(id) => self.by_id(id),
            RefQuery::Name(name) => self.by_name(name),
        };
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (DefKey, &Definition)> {
        return self.defs.iter().enumerate().map(|(i, d)| return (DefKey(i), d));
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        return self.defs.len();
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        return self.defs.is_empty();
    }

    /// Register a definition under its name, id, and aliases.
    ///
    /// Every key is checked before anything is inserted, so a rejected
    /// definition leaves no partial entry behind.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateDefinition` if the name, id, or any alias is
    /// already registered, or if the definition repeats one of its own names.
    pub fn insert(&mut self, def: Definition) -> Result<DefKey, Error> {
        self.check_free(&def.name, KeyKind::Name, &def.path)?;
        self.check_free_id(&def.id, &def.path)?;

        for (i, alias) in def.alias.iter().enumerate() {
            self.check_free(alias, KeyKind::Alias, &def.path)?;
            let repeated = *alias == def.name || def.alias.iter().take(i).any(|a| return a == alias);
            if repeated {
                return Err(Error::DuplicateDefinition {
                    first_path: def.path.clone(),
                    key: alias.clone(),
                    kind: KeyKind::Alias,
                    path: def.path.clone(),
                });
            }
        }

        let key = DefKey(self.defs.len());
        self.id2def.insert(def.id.clone(), key);
        for name in def.names() {
            self.name2def.insert(name.to_string(), key);
        }
        self.defs.push(def);
        return Ok(key);
    }

    /// Fail if `name` is already a registered name or alias.
    fn check_free(&self, name: &str, kind: KeyKind, path: &str) -> Result<(), Error> {
        let Some(existing) = self.by_name(name) else {
            return Ok(());
        };
        return Err(Error::DuplicateDefinition {
            first_path: self.get(existing).path.clone(),
            key: name.to_string(),
            kind,
            path: path.to_string(),
        });
    }

    /// Fail if `id` is already a registered identifier.
    fn check_free_id(&self, id: &str, path: &str) -> Result<(), Error> {
        let Some(existing) = self.by_id(id) else {
            return Ok(());
        };
        return Err(Error::DuplicateDefinition {
            first_path: self.get(existing).path.clone(),
            key: id.to_string(),
            kind: KeyKind::Id,
            path: path.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, alias: &[&str], id: &str, path: &str) -> Definition {
        return Definition {
            alias: alias.iter().map(|a| return (*a).to_string()).collect(),
            fragment: None,
            id: id.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            refs: Vec::new(),
        };
    }

    #[test]
    fn registers_all_keys() {
        let mut registry = Registry::new();
        let key = registry.insert(def("Widget", &["Gadget"], "widget", "a.md")).unwrap();
        assert_eq!(registry.by_name("Widget"), Some(key));
        assert_eq!(registry.by_name("Gadget"), Some(key));
        assert_eq!(registry.by_id("widget"), Some(key));
        assert_eq!(registry.lookup(&RefQuery::Id("widget".to_string())), Some(key));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_name_names_both_documents() {
        let mut registry = Registry::new();
        registry.insert(def("Widget", &[], "widget", "a.md")).unwrap();
        let err = registry.insert(def("Widget", &[], "other", "b.md")).unwrap_err();
        let Error::DuplicateDefinition { key, kind, path, first_path } = err else {
            panic!("expected duplicate, got {err:?}");
        };
        assert_eq!(key, "Widget");
        assert_eq!(kind, KeyKind::Name);
        assert_eq!(path, "b.md");
        assert_eq!(first_path, "a.md");
    }

    #[test]
    fn alias_colliding_with_name_fails() {
        let mut registry = Registry::new();
        registry.insert(def("Widget", &[], "widget", "a.md")).unwrap();
        let err = registry.insert(def("Gizmo", &["Widget"], "gizmo", "b.md")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { kind: KeyKind::Alias, .. }));
    }

    #[test]
    fn duplicate_id_fails() {
        let mut registry = Registry::new();
        registry.insert(def("Widget", &[], "w", "a.md")).unwrap();
        let err = registry.insert(def("Gizmo", &[], "w", "a.md")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { kind: KeyKind::Id, .. }));
    }

    #[test]
    fn repeated_alias_within_one_definition_fails() {
        let mut registry = Registry::new();
        let err = registry.insert(def("Widget", &["W", "W"], "widget", "a.md")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { kind: KeyKind::Alias, .. }));
    }

    #[test]
    fn rejected_definition_leaves_no_partial_entry() {
        let mut registry = Registry::new();
        registry.insert(def("Widget", &[], "widget", "a.md")).unwrap();
        registry.insert(def("Gizmo", &["Thing", "Widget"], "gizmo", "b.md")).unwrap_err();
        assert_eq!(registry.by_name("Gizmo"), None);
        assert_eq!(registry.by_name("Thing"), None);
        assert_eq!(registry.by_id("gizmo"), None);
        assert_eq!(registry.len(), 1);
    }
}
