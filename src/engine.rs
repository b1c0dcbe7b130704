//! The resolution engine: collects definitions into the registry, rewrites
//! documents stage by stage, and answers reverse-reference queries.

use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::error::Error;
use crate::ident::{self, DefIdGenerator, RefIdGenerator};
use crate::parser::{DefinitionMarker, MarkerParser, MarkerSyntax, ReferenceMarker};
use crate::registry::Registry;
use crate::types::{DefKey, Definition, Fragment, Position, RefKind, RefQuery, Reference, join_fragments};

/// Definitions found by [`Engine::collect_definition`] and the fragments the
/// document was split into while finding them.
#[derive(Debug)]
pub struct Collected {
    /// Registered definitions in document order.
    pub defs: Vec<DefKey>,
    /// The document split around its definition markers.
    pub fragments: Vec<Fragment>,
}

/// One corpus-processing session. Owns the registry; a new corpus needs a new engine.
pub struct Engine<P = MarkerSyntax> {
    def_id_generator: DefIdGenerator,
    parser: P,
    ref_id_generator: RefIdGenerator,
    registry: Registry,
}

/// Configures identifier generators and the marker grammar before building an [`Engine`].
pub struct EngineBuilder<P> {
    def_id_generator: Option<DefIdGenerator>,
    parser: P,
    ref_id_generator: Option<RefIdGenerator>,
}

impl<P: MarkerParser> EngineBuilder<P> {
    /// Replace the name-to-identifier function (default: [`ident::slugify`]).
    #[must_use]
    pub fn def_id_generator(mut self, generator: impl Fn(&str) -> String + 'static) -> Self {
        self.def_id_generator = Some(Box::new(generator));
        return self;
    }

    /// Replace the reference anchor function (default: [`ident::anchor_for`]).
    #[must_use]
    pub fn ref_id_generator(mut self, generator: impl Fn(&Definition, &Reference) -> String + 'static) -> Self {
        self.ref_id_generator = Some(Box::new(generator));
        return self;
    }

    /// Use a different marker grammar.
    pub fn parser<Q: MarkerParser>(self, parser: Q) -> EngineBuilder<Q> {
        return EngineBuilder {
            def_id_generator: self.def_id_generator,
            parser,
            ref_id_generator: self.ref_id_generator,
        };
    }

    /// Build an engine with an empty registry.
    pub fn build(self) -> Engine<P> {
        return Engine {
            def_id_generator: self.def_id_generator.unwrap_or_else(|| return Box::new(ident::slugify)),
            parser: self.parser,
            ref_id_generator: self.ref_id_generator.unwrap_or_else(|| return Box::new(ident::anchor_for)),
            registry: Registry::new(),
        };
    }
}

impl Default for Engine<MarkerSyntax> {
    fn default() -> Self {
        return Self::new();
    }
}

impl Engine<MarkerSyntax> {
    /// Engine with the default grammar and identifier generators.
    pub fn new() -> Self {
        return Self::builder().build();
    }

    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder<MarkerSyntax> {
        return EngineBuilder {
            def_id_generator: None,
            parser: MarkerSyntax::new(),
            ref_id_generator: None,
        };
    }
}

impl<P: MarkerParser> Engine<P> {
    /// The registry built so far.
    pub fn registry(&self) -> &Registry {
        return &self.registry;
    }

    /// Registered definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        return self.registry.iter().map(|(_, d)| return d);
    }

    /// Find a definition by identifier or by name/alias.
    pub fn definition(&self, query: &RefQuery) -> Option<&Definition> {
        return self.registry.lookup(query).map(|key| return self.registry.get(key));
    }

    /// Anchor the configured generator assigns to `reference`.
    pub fn anchor(&self, reference: &Reference) -> String {
        let def = self.registry.get(reference.def);
        return (self.ref_id_generator)(def, reference);
    }

    /// Pass one: register every definition marker in `text`.
    ///
    /// Definitions registered before a failing marker stay registered.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateDefinition` if a name, alias, or identifier
    /// is already registered.
    pub fn collect_definition(&mut self, text: &str, path: &str, position: &Position) -> Result<Collected, Error> {
        let parsed = self.parser.parse_definition(text, position);
        let mut defs = Vec::with_capacity(parsed.matches.len());

        for m in parsed.matches {
            let def = self.definition_from_marker(m.marker, path);
            debug!(name = %def.name, id = %def.id, aliases = def.alias.len(), path, "collected definition");
            defs.push(self.registry.insert(def)?);
        }

        return Ok(Collected { defs, fragments: parsed.fragments });
    }

    /// Replace every definition marker with `renderer`'s output.
    ///
    /// A marker is matched to the definition this document registered under
    /// the same name. Markers in documents that were never collected render
    /// from a throwaway definition that is not registered.
    pub fn render_definitions(
        &mut self,
        path: &str,
        fragments: Vec<Fragment>,
        renderer: impl Fn(&Definition) -> String,
    ) -> Vec<Fragment> {
        let parsed = self.parser.parse_definition_from_fragments(fragments);
        let mut fragments = parsed.fragments;

        for m in parsed.matches {
            let Some(site) = fragments.get_mut(m.fragment) else {
                continue;
            };
            let registered = self
                .registry
                .by_name(&m.marker.name)
                .filter(|key| return self.registry.get(*key).path == path);

            let rendered = match registered {
                Some(key) => {
                    let rendered = Fragment::matched(renderer(self.registry.get(key)), site.position.clone());
                    self.registry.get_mut(key).fragment = Some(rendered.clone());
                    rendered
                },
                None => {
                    let def = self.definition_from_marker(m.marker, path);
                    trace!(name = %def.name, path, "rendering uncollected definition");
                    Fragment::matched(renderer(&def), site.position.clone())
                },
            };
            *site = rendered;
        }

        return fragments;
    }

    /// Resolve explicit and escaped reference markers, in document order.
    ///
    /// Explicit markers allocate the definition's next ordinal and render
    /// through `renderer`. Escaped markers reuse the last ordinal and are
    /// replaced by their literal text.
    ///
    /// # Errors
    ///
    /// Returns `Error::DanglingReference` if an explicit marker's identifier,
    /// or an escaped marker's text, names no registered definition.
    pub fn render_explicit_refs(
        &mut self,
        path: &str,
        fragments: Vec<Fragment>,
        renderer: impl Fn(&Definition, &Reference) -> String,
    ) -> Result<Vec<Fragment>, Error> {
        let parsed = self.parser.parse_explicit_or_escaped_reference(fragments);
        let mut fragments = parsed.fragments;

        for m in parsed.matches {
            let Some(site) = fragments.get_mut(m.fragment) else {
                continue;
            };
            let (kind, target, found) = match m.marker {
                ReferenceMarker::Explicit { id } => {
                    let found = self.registry.by_id(&id);
                    (RefKind::Explicit, id, found)
                },
                ReferenceMarker::Escaped { text } => {
                    // Lookup ignores padding; the displayed text keeps it.
                    let found = self.registry.by_name(text.trim());
                    (RefKind::Escaped, text, found)
                },
            };
            let Some(key) = found else {
                return Err(Error::DanglingReference {
                    column: site.position.column,
                    kind,
                    line: site.position.line,
                    path: path.to_string(),
                    target,
                });
            };

            let name = match kind {
                RefKind::Explicit => self.registry.get(key).name.clone(),
                RefKind::Escaped | RefKind::Implicit => target,
            };
            self.record_reference(key, kind, name, path, site, &renderer);
        }

        return Ok(fragments);
    }

    /// Treat every bare occurrence of `match_text` in open fragments as an
    /// implicit reference to `def`.
    pub fn render_implicit_refs(
        &mut self,
        path: &str,
        fragments: Vec<Fragment>,
        def: DefKey,
        match_text: &str,
        renderer: impl Fn(&Definition, &Reference) -> String,
    ) -> Vec<Fragment> {
        let parsed = self.parser.parse_implicit_reference(fragments, match_text);
        let mut fragments = parsed.fragments;

        for m in parsed.matches {
            let Some(site) = fragments.get_mut(m.fragment) else {
                continue;
            };
            self.record_reference(def, RefKind::Implicit, m.marker, path, site, &renderer);
        }

        return fragments;
    }

    /// Run every rewrite stage over one document and return its fragments.
    ///
    /// # Errors
    ///
    /// Returns `Error::DanglingReference` from the explicit reference stage.
    pub fn render_fragments(
        &mut self,
        path: &str,
        text: &str,
        position: &Position,
        def_renderer: impl Fn(&Definition) -> String,
        ref_renderer: impl Fn(&Definition, &Reference) -> String,
    ) -> Result<Vec<Fragment>, Error> {
        let fragments = vec![Fragment::open(text, position.clone())];
        let fragments = self.render_definitions(path, fragments, def_renderer);
        let mut fragments = self.render_explicit_refs(path, fragments, &ref_renderer)?;

        for (key, name) in self.implicit_candidates() {
            fragments = self.render_implicit_refs(path, fragments, key, &name, &ref_renderer);
        }

        debug!(path, fragments = fragments.len(), "rendered document");
        return Ok(fragments);
    }

    /// Pass two: render one document to text.
    ///
    /// # Errors
    ///
    /// Returns `Error::DanglingReference` from the explicit reference stage.
    pub fn render_text(
        &mut self,
        path: &str,
        text: &str,
        position: &Position,
        def_renderer: impl Fn(&Definition) -> String,
        ref_renderer: impl Fn(&Definition, &Reference) -> String,
    ) -> Result<String, Error> {
        let fragments = self.render_fragments(path, text, position, def_renderer, ref_renderer)?;
        return Ok(join_fragments(&fragments));
    }

    /// Every `path#anchor` recorded against a definition, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns `Error::DefinitionNotFound` if nothing matches the query.
    pub fn reverse_refs(&self, query: &RefQuery) -> Result<Vec<String>, Error> {
        let key = self
            .registry
            .lookup(query)
            .ok_or_else(|| return Error::DefinitionNotFound { query: query.clone() })?;
        let def = self.registry.get(key);

        return Ok(def
            .refs
            .iter()
            .map(|r| return format!("{}#{}", r.path, (self.ref_id_generator)(def, r)))
            .collect());
    }

    /// Names and aliases to scan for, longest first.
    /// Equal lengths keep registration order, names before their aliases.
    fn implicit_candidates(&self) -> Vec<(DefKey, String)> {
        let mut candidates: Vec<(DefKey, String)> = self
            .registry
            .iter()
            .flat_map(|(key, def)| return def.names().map(move |n| return (key, n.to_string())))
            .collect();
        candidates.sort_by_key(|(_, name)| return Reverse(name.chars().count()));
        return candidates;
    }

    /// Build a definition from its marker, generating an id when none was given.
    fn definition_from_marker(&self, marker: DefinitionMarker, path: &str) -> Definition {
        let id = if marker.id.is_empty() {
            (self.def_id_generator)(&marker.name)
        } else {
            marker.id
        };
        return Definition {
            alias: marker.alias,
            fragment: None,
            id,
            name: marker.name,
            path: path.to_string(),
            refs: Vec::new(),
        };
    }

    /// Append a reference to `key`'s definition and rewrite `site` in place.
    /// Escaped references take the last ordinal and display their literal text.
    fn record_reference(
        &mut self,
        key: DefKey,
        kind: RefKind,
        name: String,
        path: &str,
        site: &mut Fragment,
        renderer: impl Fn(&Definition, &Reference) -> String,
    ) {
        let def = self.registry.get(key);
        let index = match kind {
            RefKind::Escaped => def.last_index(),
            RefKind::Explicit | RefKind::Implicit => Some(def.next_index()),
        };
        let mut reference = Reference {
            def: key,
            fragment: site.clone(),
            index,
            kind,
            name,
            path: path.to_string(),
        };

        let text = match kind {
            RefKind::Escaped => reference.name.clone(),
            RefKind::Explicit | RefKind::Implicit => renderer(def, &reference),
        };
        *site = Fragment::matched(text, site.position.clone());
        reference.fragment = site.clone();

        trace!(def = %def.id, %kind, index = ?reference.index, path, "recorded reference");
        self.registry.get_mut(key).refs.push(reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def_html(def: &Definition) -> String {
        return format!("<dfn id=\"{}\">{}</dfn>", def.id, def.name);
    }

    fn ref_html(def: &Definition, reference: &Reference) -> String {
        let n = reference.index.map_or(0, |i| return i + 1);
        return format!("<a href=\"#{}\" id=\"{}-ref-{n}\">{}</a>", def.id, def.id, reference.name);
    }

    fn collect(engine: &mut Engine, path: &str, text: &str) {
        engine.collect_definition(text, path, &Position::start(path)).unwrap();
    }

    fn render(engine: &mut Engine, path: &str, text: &str) -> String {
        return engine.render_text(path, text, &Position::start(path), def_html, ref_html).unwrap();
    }

    fn indices(engine: &Engine, name: &str) -> Vec<Option<usize>> {
        let def = engine.definition(&RefQuery::Name(name.to_string())).unwrap();
        return def.refs.iter().map(|r| return r.index).collect();
    }

    #[test]
    fn missing_id_is_slugified() {
        let mut engine = Engine::new();
        collect(&mut engine, "doc1", "{{def: Widget Factory}}");
        let def = engine.definition(&RefQuery::Name("Widget Factory".to_string())).unwrap();
        assert_eq!(def.id, "widget-factory");
    }

    #[test]
    fn explicit_id_is_kept() {
        let mut engine = Engine::new();
        collect(&mut engine, "doc1", "{{def: Widget #w}}");
        assert!(engine.definition(&RefQuery::Id("w".to_string())).is_some());
        assert!(engine.definition(&RefQuery::Id("widget".to_string())).is_none());
    }

    #[test]
    fn duplicate_across_documents_fails() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        let err = engine
            .collect_definition("{{def: Widget}}", "b.md", &Position::start("b.md"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { ref path, .. } if path == "b.md"));
    }

    #[test]
    fn duplicate_generated_id_fails() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        let err = engine
            .collect_definition("{{def: widget!}}", "b.md", &Position::start("b.md"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { kind: crate::error::KeyKind::Id, .. }));
    }

    #[test]
    fn widget_example() {
        let mut engine = Engine::new();
        let doc = "{{def: Widget}} is small. See {{ref: widget}}. A Widget again.";
        collect(&mut engine, "doc1", doc);
        let out = render(&mut engine, "doc1", doc);

        assert_eq!(
            out,
            "<dfn id=\"widget\">Widget</dfn> is small. \
             See <a href=\"#widget\" id=\"widget-ref-1\">Widget</a>. \
             A <a href=\"#widget\" id=\"widget-ref-2\">Widget</a> again."
        );
        assert_eq!(indices(&engine, "Widget"), vec![Some(0), Some(1)]);

        let by_name = engine.reverse_refs(&RefQuery::Name("Widget".to_string())).unwrap();
        let by_id = engine.reverse_refs(&RefQuery::Id("widget".to_string())).unwrap();
        assert_eq!(by_name, vec!["doc1#widget-ref-1", "doc1#widget-ref-2"]);
        assert_eq!(by_name, by_id);
    }

    #[test]
    fn implicit_indices_continue_across_documents() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        render(&mut engine, "a.md", "{{def: Widget}}");
        render(&mut engine, "b.md", "One Widget.");
        render(&mut engine, "c.md", "Another Widget.");
        assert_eq!(indices(&engine, "Widget"), vec![Some(0), Some(1)]);
        assert_eq!(
            engine.reverse_refs(&RefQuery::Name("Widget".to_string())).unwrap(),
            vec!["b.md#widget-ref-1", "c.md#widget-ref-2"]
        );
    }

    #[test]
    fn escaped_reuses_last_index() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        let out = render(&mut engine, "b.md", "{{ref: widget}} then {{!Widget}} then {{ref: widget}}");

        assert_eq!(indices(&engine, "Widget"), vec![Some(0), Some(0), Some(1)]);
        assert!(out.contains(" then Widget then "));
        let def = engine.definition(&RefQuery::Name("Widget".to_string())).unwrap();
        assert_eq!(def.refs[1].kind, RefKind::Escaped);
        assert_eq!(def.refs[1].name, "Widget");
    }

    #[test]
    fn escaped_before_any_link_does_not_shift_next_index() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        render(&mut engine, "b.md", "{{!Widget}} then {{ref: widget}}");

        assert_eq!(indices(&engine, "Widget"), vec![None, Some(0)]);
        assert_eq!(
            engine.reverse_refs(&RefQuery::Id("widget".to_string())).unwrap(),
            vec!["b.md#widget-ref-0", "b.md#widget-ref-1"]
        );
    }

    #[test]
    fn escaped_text_keeps_surrounding_whitespace() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        let out = render(&mut engine, "b.md", "x{{! Widget }}y");

        assert_eq!(out, "x Widget y");
        let def = engine.definition(&RefQuery::Name("Widget".to_string())).unwrap();
        assert_eq!(def.refs[0].name, " Widget ");
    }

    #[test]
    fn escaped_text_is_not_rematched_implicitly() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        let out = render(&mut engine, "b.md", "{{!Widget}}");
        assert_eq!(out, "Widget");
        assert_eq!(indices(&engine, "Widget"), vec![None]);
    }

    #[test]
    fn escaped_alias_keeps_literal_text() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget | Gadget}}");
        let out = render(&mut engine, "b.md", "a {{!Gadget}}");
        assert_eq!(out, "a Gadget");
    }

    #[test]
    fn dangling_explicit_reference_fails() {
        let mut engine = Engine::new();
        let err = engine
            .render_text("doc1", "x\n  {{ref: nope}}", &Position::start("doc1"), def_html, ref_html)
            .unwrap_err();
        let Error::DanglingReference { target, kind, line, column, .. } = err else {
            panic!("expected dangling reference, got {err:?}");
        };
        assert_eq!(target, "nope");
        assert_eq!(kind, RefKind::Explicit);
        assert_eq!((line, column), (2, 3));
    }

    #[test]
    fn dangling_escaped_reference_fails() {
        let mut engine = Engine::new();
        let err = engine
            .render_text("doc1", "{{!Nope}}", &Position::start("doc1"), def_html, ref_html)
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { kind: RefKind::Escaped, .. }));
    }

    #[test]
    fn explicit_marker_text_is_not_an_implicit_match() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: widget #widget}}");
        render(&mut engine, "b.md", "{{ref: widget}}");
        assert_eq!(indices(&engine, "widget"), vec![Some(0)]);
    }

    #[test]
    fn definition_label_is_not_an_implicit_match() {
        let mut engine = Engine::new();
        let doc = "{{def: Widget | Gadget}}";
        collect(&mut engine, "a.md", doc);
        let fragments = engine
            .render_fragments("a.md", doc, &Position::start("a.md"), def_html, ref_html)
            .unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "<dfn id=\"widget\">Widget</dfn>");
        let def = engine.definition(&RefQuery::Name("Gadget".to_string())).unwrap();
        assert!(def.refs.is_empty());
        assert_eq!(def.fragment.as_ref().map(|f| return f.text.as_str()), Some(fragments[0].text.as_str()));
    }

    #[test]
    fn longer_name_wins_overlap() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget}} {{def: Widget Factory}}");
        render(&mut engine, "b.md", "The Widget Factory makes a Widget.");

        let factory = engine.definition(&RefQuery::Name("Widget Factory".to_string())).unwrap();
        assert_eq!(factory.refs.len(), 1);
        assert_eq!(indices(&engine, "Widget"), vec![Some(0)]);
    }

    #[test]
    fn alias_occurrence_records_literal_text() {
        let mut engine = Engine::new();
        collect(&mut engine, "a.md", "{{def: Widget | Gadget}}");
        let out = render(&mut engine, "b.md", "Use a Gadget.");
        assert_eq!(out, "Use a <a href=\"#widget\" id=\"widget-ref-1\">Gadget</a>.");
        let def = engine.definition(&RefQuery::Id("widget".to_string())).unwrap();
        assert_eq!(def.refs[0].name, "Gadget");
        assert_eq!(def.refs[0].kind, RefKind::Implicit);
    }

    #[test]
    fn unknown_query_is_not_found() {
        let engine = Engine::new();
        let err = engine.reverse_refs(&RefQuery::Id("ghost".to_string())).unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
        let err = engine.reverse_refs(&RefQuery::Name("Ghost".to_string())).unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
    }

    #[test]
    fn custom_generators_are_used() {
        let mut engine = Engine::builder()
            .def_id_generator(|name| return format!("def-{}", name.len()))
            .ref_id_generator(|def, r| return format!("{}.{}", def.id, r.index.unwrap_or(99)))
            .build();
        collect(&mut engine, "a.md", "{{def: Widget}}");
        render(&mut engine, "a.md", "{{ref: def-6}} Widget");
        assert_eq!(
            engine.reverse_refs(&RefQuery::Name("Widget".to_string())).unwrap(),
            vec!["a.md#def-6.0", "a.md#def-6.1"]
        );
    }

    #[test]
    fn uncollected_definition_still_renders() {
        let mut engine = Engine::new();
        let out = render(&mut engine, "a.md", "{{def: Widget}}");
        assert_eq!(out, "<dfn id=\"widget\">Widget</dfn>");
        assert!(engine.registry().is_empty());
    }
}
