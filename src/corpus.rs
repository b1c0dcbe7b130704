//! Two-pass corpus driver: every document is collected before any is rendered,
//! so implicit references resolve against definitions from the whole corpus.

use tracing::info;

use crate::engine::Engine;
use crate::error::Error;
use crate::parser::MarkerParser;
use crate::types::{Definition, Position, Reference};

/// A source document, identified by its corpus-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Corpus-relative path, `/`-separated.
    pub path: String,
    /// Raw document text.
    pub text: String,
}

/// A document after every rewrite stage has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Corpus-relative path of the source document.
    pub path: String,
    /// Rendered text.
    pub text: String,
}

/// Pass one: register the definitions of every document, in the given order.
/// The first document to register a name, alias, or id wins.
///
/// # Errors
///
/// Returns `Error::DuplicateDefinition` on the first collision.
pub fn collect_all<P: MarkerParser>(engine: &mut Engine<P>, documents: &[Document]) -> Result<(), Error> {
    for doc in documents {
        engine.collect_definition(&doc.text, &doc.path, &Position::start(&doc.path))?;
    }
    info!(documents = documents.len(), definitions = engine.registry().len(), "collected corpus");
    return Ok(());
}

/// Pass two: render every document against the complete registry.
///
/// # Errors
///
/// Returns `Error::DanglingReference` from the first document with an
/// unresolvable marker.
pub fn render_all<P, D, R>(
    engine: &mut Engine<P>,
    documents: &[Document],
    def_renderer: D,
    ref_renderer: R,
) -> Result<Vec<RenderedDocument>, Error>
where
    P: MarkerParser,
    D: Fn(&Definition) -> String,
    R: Fn(&Definition, &Reference) -> String,
{
    let mut rendered = Vec::with_capacity(documents.len());
    for doc in documents {
        let text = engine.render_text(&doc.path, &doc.text, &Position::start(&doc.path), &def_renderer, &ref_renderer)?;
        rendered.push(RenderedDocument {
            path: doc.path.clone(),
            text,
        });
    }
    return Ok(rendered);
}

/// Run both passes over `documents`.
///
/// # Errors
///
/// Returns the first error from either pass.
pub fn process<P, D, R>(
    engine: &mut Engine<P>,
    documents: &[Document],
    def_renderer: D,
    ref_renderer: R,
) -> Result<Vec<RenderedDocument>, Error>
where
    P: MarkerParser,
    D: Fn(&Definition) -> String,
    R: Fn(&Definition, &Reference) -> String,
{
    collect_all(engine, documents)?;
    return render_all(engine, documents, def_renderer, ref_renderer);
}
