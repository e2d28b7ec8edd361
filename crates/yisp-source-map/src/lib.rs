//! Source locations for yisp
//!
//! Every value the evaluator produces can be traced back to the place in a
//! YAML file it came from. This crate holds the two types that make that
//! possible:
//! - [`SourceInfo`]: a single position (file, offset, line, column, length)
//! - [`SourceContext`]: the registry of loaded files used to render excerpts
//!
//! # Example
//!
//! ```rust
//! use yisp_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! ctx.add_file("main.yaml", "kind: Pod\n");
//!
//! let info = SourceInfo::new(Some("main.yaml".into()), 6, 1, 7, 3);
//! assert_eq!(ctx.snippet(&info), Some("Pod".to_string()));
//! ```

pub mod context;
pub mod source_info;

pub use context::{FileId, SourceContext, SourceFile};
pub use source_info::SourceInfo;
