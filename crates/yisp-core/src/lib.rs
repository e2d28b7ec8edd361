//! # yisp-core
//!
//! The yisp expression engine: YAML documents with embedded Lisp-style
//! expressions, evaluated into plain manifests.
//!
//! ## Overview
//!
//! - [`node`]: the value model every stage works on
//! - [`env`]: lexical environments with a root frame for anchors
//! - [`schema`]: types, validation, defaults and casting
//! - [`merge`]: schema-guided deep merge (strategic merge patch)
//! - [`Engine`]: evaluation, application, builtins and rendering
//!
//! ## Example
//!
//! ```rust
//! use yisp_core::{Engine, EngineOptions, Env};
//!
//! let source = "\
//! base: &base {app: web}
//! replicas: !yisp [+, 1, 2]
//! labels:
//!   <<: *base
//!   tier: front
//! ";
//! let mut engine = Engine::new(EngineOptions::default());
//! let result = engine.run(source, &Env::new(), Some("app.yaml")).unwrap();
//! let documents = engine.render(result).unwrap();
//! assert_eq!(
//!     yisp_yaml::emit_documents(&documents),
//!     "base: {app: web}\nreplicas: 3\nlabels:\n  app: web\n  tier: front\n"
//! );
//! ```

mod apply;
pub mod builtins;
pub mod engine;
pub mod env;
pub mod error;
pub mod eval;
pub mod merge;
pub mod node;
pub mod parse;
pub mod provider;
pub mod registry;
pub mod render;
pub mod schema;

pub use builtins::Builtin;
pub use engine::{Engine, EngineOptions};
pub use env::{Env, UndefinedSymbol};
pub use error::{EvaluationError, Result};
pub use eval::Mode;
pub use merge::deep_merge;
pub use node::{Attr, Kind, Lambda, Native, Node, Param, Value};
pub use provider::{OpenApiSchemaProvider, SchemaProvider, StaticSchemaProvider};
pub use registry::{Operator, OperatorRegistry};
pub use schema::Schema;
