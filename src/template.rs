//! Renderer callbacks built from `{placeholder}` templates.
//!
//! Definition placeholders: `{id}`, `{name}`, `{aliases}`, `{path}`.
//! Reference placeholders: `{id}`, `{name}`, `{anchor}`, `{def_name}`,
//! `{def_path}`, `{path}`, `{index}`, `{kind}`.
//! Unknown placeholders are left as written.

use crate::ident;
use crate::types::{Definition, Reference};

/// Substitute `{key}` placeholders in a single left-to-right pass, so values
/// that contain braces are never expanded again.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (before, from_open) = rest.split_at(open);
        out.push_str(before);

        let value = from_open.find('}').and_then(|close| {
            let key = from_open.get(1..close)?;
            let (_, value) = values.iter().find(|(k, _)| return *k == key)?;
            return Some((*value, close));
        });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = from_open.get(close.saturating_add(1)..).unwrap_or("");
            },
            None => {
                out.push('{');
                rest = from_open.get(1..).unwrap_or("");
            },
        }
    }

    out.push_str(rest);
    return out;
}

/// Render a definition site.
pub fn render_definition(template: &str, def: &Definition) -> String {
    let aliases = def.alias.join(", ");
    return fill(
        template,
        &[
            ("id", def.id.as_str()),
            ("name", def.name.as_str()),
            ("aliases", aliases.as_str()),
            ("path", def.path.as_str()),
        ],
    );
}

/// Render a reference site. The anchor uses the default generator.
pub fn render_reference(template: &str, def: &Definition, reference: &Reference) -> String {
    let anchor = ident::anchor_for(def, reference);
    let index = reference.index.map_or(String::new(), |i| return i.to_string());
    let kind = reference.kind.to_string();
    return fill(
        template,
        &[
            ("anchor", anchor.as_str()),
            ("def_name", def.name.as_str()),
            ("def_path", def.path.as_str()),
            ("id", def.id.as_str()),
            ("index", index.as_str()),
            ("kind", kind.as_str()),
            ("name", reference.name.as_str()),
            ("path", reference.path.as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DEFINITION_TEMPLATE, DEFAULT_REFERENCE_TEMPLATE};
    use crate::types::{DefKey, Fragment, Position, RefKind};

    fn widget() -> Definition {
        return Definition {
            alias: vec!["Gadget".to_string(), "Gizmo".to_string()],
            fragment: None,
            id: "widget".to_string(),
            name: "Widget".to_string(),
            path: "docs/a.md".to_string(),
            refs: Vec::new(),
        };
    }

    #[test]
    fn unknown_placeholders_stay() {
        assert_eq!(fill("{a} {b} {", &[("a", "1")]), "1 {b} {");
    }

    #[test]
    fn values_are_not_reexpanded() {
        assert_eq!(fill("{a}{b}", &[("a", "{b}"), ("b", "x")]), "{b}x");
    }

    #[test]
    fn default_definition_template() {
        assert_eq!(render_definition(DEFAULT_DEFINITION_TEMPLATE, &widget()), "<dfn id=\"widget\">Widget</dfn>");
        assert_eq!(render_definition("{aliases}", &widget()), "Gadget, Gizmo");
    }

    #[test]
    fn default_reference_template() {
        let reference = Reference {
            def: DefKey(0),
            fragment: Fragment::matched("Gadget", Position::start("docs/b.md")),
            index: Some(2),
            kind: RefKind::Implicit,
            name: "Gadget".to_string(),
            path: "docs/b.md".to_string(),
        };
        assert_eq!(
            render_reference(DEFAULT_REFERENCE_TEMPLATE, &widget(), &reference),
            "<a id=\"widget-ref-3\" href=\"docs/a.md#widget\">Gadget</a>"
        );
        assert_eq!(render_reference("{kind}/{index}/{def_name}", &widget(), &reference), "implicit/2/Widget");
    }
}
