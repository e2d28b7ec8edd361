//! Evaluation errors.
//!
//! Every failure in the engine surfaces as an [`EvaluationError`]. Errors
//! chain: an outer error records where a failure was observed (a call, an
//! import, a cast) and points at the error that caused it. The innermost
//! error is the root cause.

use std::fmt::Display;
use thiserror::Error;
use yisp_source_map::{SourceContext, SourceInfo};

use crate::node::Node;
use crate::schema::{SchemaError, ValidationError};

pub type Result<T> = std::result::Result<T, EvaluationError>;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvaluationError {
    pub message: String,
    pub location: Option<SourceInfo>,
    #[source]
    pub parent: Option<Box<EvaluationError>>,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>, location: Option<&SourceInfo>) -> Self {
        Self {
            message: message.into(),
            location: location.cloned(),
            parent: None,
        }
    }

    /// An error attributed to a node.
    pub fn at(node: &Node, message: impl Into<String>) -> Self {
        Self::new(message, node.location())
    }

    /// An error caused by a failure from outside the engine. The cause's
    /// message becomes part of this one and the chain ends here.
    pub fn foreign(
        message: impl Display,
        cause: impl Display,
        location: Option<&SourceInfo>,
    ) -> Self {
        Self::new(format!("{}: {}", message, cause), location)
    }

    /// A failed validation, reported where the offending value was and
    /// wrapped with `message` at `location`.
    pub fn validation(
        message: impl Into<String>,
        cause: ValidationError,
        location: Option<&SourceInfo>,
    ) -> Self {
        let at = cause.location.as_ref().or(location);
        Self::new(cause.to_string(), at).wrap(message, location)
    }

    pub fn schema(cause: SchemaError, location: Option<&SourceInfo>) -> Self {
        let at = cause.location().or(location).cloned();
        Self::new(cause.to_string(), at.as_ref())
    }

    /// Wrap this error in an outer one.
    pub fn wrap(self, message: impl Into<String>, location: Option<&SourceInfo>) -> Self {
        Self {
            message: message.into(),
            location: location.cloned(),
            parent: Some(Box::new(self)),
        }
    }

    /// The innermost error of the chain.
    pub fn root_cause(&self) -> &EvaluationError {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent;
        }
        current
    }

    /// The chain from the root cause outward.
    pub fn chain(&self) -> Vec<&EvaluationError> {
        let mut levels = vec![self];
        let mut current = self;
        while let Some(parent) = &current.parent {
            levels.push(parent);
            current = parent;
        }
        levels.reverse();
        levels
    }

    /// One line per level, from the root cause outward.
    pub fn traceback(&self) -> String {
        let mut out = String::new();
        for level in self.chain() {
            out.push_str("  ");
            out.push_str(&level.message);
            if let Some(location) = &level.location {
                out.push_str(&format!(" at {}", location));
            }
            out.push('\n');
        }
        out
    }

    /// Render the root cause with a source excerpt, followed by the
    /// traceback.
    pub fn render(&self, ctx: &SourceContext) -> String {
        let root = self.root_cause();
        let mut out = match root.location.as_ref().and_then(|loc| excerpt(root, loc, ctx)) {
            Some(excerpt) => excerpt,
            None => format!("Error: {}\n", root.message),
        };
        out.push_str("Traceback:\n");
        out.push_str(&self.traceback());
        out
    }
}

fn excerpt(error: &EvaluationError, location: &SourceInfo, ctx: &SourceContext) -> Option<String> {
    use ariadne::{Color, Config, Label, Report, ReportKind, Source};

    let file = ctx.file_for(location)?;
    let length = file.content.chars().count();
    let start = location.offset.min(length);
    let end = location.end_offset().max(start + 1).min(length.max(start));
    let span = start..end;

    let report = Report::build(ReportKind::Error, file.path.clone(), start)
        .with_config(Config::default().with_color(false))
        .with_message(&error.message)
        .with_label(
            Label::new((file.path.clone(), span))
                .with_message(&error.message)
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    report
        .write((file.path.clone(), Source::from(file.content.as_str())), &mut output)
        .ok()?;
    String::from_utf8(output).ok()
}

impl From<yisp_yaml::Error> for EvaluationError {
    fn from(err: yisp_yaml::Error) -> Self {
        EvaluationError::new(err.to_string(), err.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn loc(line: usize, col: usize, offset: usize, len: usize) -> SourceInfo {
        SourceInfo::new(Some(Arc::from("main.yaml")), offset, line, col, len)
    }

    #[test]
    fn test_chain_and_root_cause() {
        let err = EvaluationError::new("undefined symbol: x", Some(&loc(3, 5, 20, 2)))
            .wrap("in call to +", Some(&loc(3, 1, 16, 10)))
            .wrap("in lambda body", None);

        assert_eq!(err.root_cause().message, "undefined symbol: x");
        let messages: Vec<_> = err.chain().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["undefined symbol: x", "in call to +", "in lambda body"]
        );
    }

    #[test]
    fn test_traceback_lines() {
        let err = EvaluationError::new("division by zero", Some(&loc(2, 7, 9, 1)))
            .wrap("in call to /", Some(&loc(2, 3, 5, 9)));
        assert_eq!(
            err.traceback(),
            "  division by zero at main.yaml:2:7\n  in call to / at main.yaml:2:3\n"
        );
    }

    #[test]
    fn test_foreign_cause_folds_message() {
        let err = EvaluationError::foreign("failed to read lib.yaml", "No such file", None);
        assert_eq!(err.message, "failed to read lib.yaml: No such file");
        assert!(err.parent.is_none());
    }

    #[test]
    fn test_render_with_source() {
        let mut ctx = SourceContext::new();
        ctx.add_file("main.yaml", "a: 1\nb: !yisp [/, 1, 0]\n");
        let err = EvaluationError::new("division by zero", Some(&loc(2, 4, 8, 14)))
            .wrap("in call to /", Some(&loc(2, 4, 8, 14)));

        let text = err.render(&ctx);
        assert!(text.contains("division by zero"));
        assert!(text.contains("b: !yisp [/, 1, 0]"));
        assert!(text.contains("Traceback:\n  division by zero at main.yaml:2:4\n"));
        assert!(text.ends_with("  in call to / at main.yaml:2:4\n"));
    }

    #[test]
    fn test_render_without_source() {
        let err = EvaluationError::new("unknown function: frob", None);
        assert_eq!(
            err.render(&SourceContext::new()),
            "Error: unknown function: frob\nTraceback:\n  unknown function: frob\n"
        );
    }
}
