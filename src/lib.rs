//! Bidirectional cross-references for a corpus of text documents.
//!
//! Definitions establish a name (plus aliases and an identifier); every later
//! explicit, escaped, or bare occurrence of that name is rewritten through a
//! renderer callback and recorded, so each definition can list where it was
//! referenced. See [`engine::Engine`] for the core and [`corpus`] for the
//! two-pass driver.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod ident;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod template;
pub mod types;

pub use engine::{Engine, EngineBuilder};
pub use error::Error;
pub use types::{Definition, Fragment, Position, RefKind, RefQuery, Reference};
