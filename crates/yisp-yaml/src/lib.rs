//! # yisp-yaml
//!
//! The YAML document model used by yisp: parsing with source locations,
//! anchors, aliases, tags and comments, plus emitting back to YAML or JSON.
//!
//! ## Design
//!
//! Events come from `yaml-rust2`. Two things the event parser cannot give us
//! are recovered by a lexical pre-pass over the source:
//! - anchor *names* (the parser only reports numeric ids)
//! - aliases to names that are not YAML anchors, which yisp uses to refer
//!   to lambda parameters and imported symbols. Every alias is rewritten
//!   into a tagged empty scalar before parsing and turned back into
//!   [`YamlKind::Alias`] by the builder.
//!
//! ## Example
//!
//! ```rust
//! use yisp_yaml::{parse_documents, emit_documents};
//!
//! let docs = parse_documents("a: 1\n---\nb: *a\n", Some("in.yaml")).unwrap();
//! assert_eq!(docs.len(), 2);
//! assert_eq!(emit_documents(&docs), "a: 1\n---\nb: *a\n");
//! ```

mod emitter;
mod error;
mod json;
mod lexer;
mod node;
mod parser;
mod scalar;

pub use emitter::{emit, emit_documents};
pub use error::{Error, Result};
pub use json::to_json;
pub use node::{Comments, Scalar, Style, YamlEntry, YamlKind, YamlNode};
pub use parser::{parse, parse_documents, parse_file};
pub use scalar::resolve_plain;
pub use yisp_source_map::SourceInfo;
