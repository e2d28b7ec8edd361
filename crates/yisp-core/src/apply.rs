//! Function application.

use std::rc::Rc;

use tracing::trace;

use crate::builtins::Builtin;
use crate::engine::Engine;
use crate::env::Env;
use crate::error::{EvaluationError, Result};
use crate::eval::Mode;
use crate::node::{Lambda, Node, Value};
use crate::schema::validate;

impl Engine {
    /// Apply `callee` to already evaluated `args`.
    ///
    /// Lambdas run in a child of their closure. Strings name a builtin, or
    /// with a dot, a registered `module.name` operator.
    pub fn apply(&mut self, callee: &Node, args: Vec<Node>, env: &Env, mode: Mode) -> Result<Node> {
        match &callee.value {
            Value::Lambda(lambda) => self.call_lambda(lambda.clone(), callee, args, mode),
            Value::String(name) => match name.split_once('.') {
                Some((module, function)) => {
                    let Some(operator) = self.registry.get(module, function) else {
                        return Err(EvaluationError::at(
                            callee,
                            format!("unknown function: {}", name),
                        ));
                    };
                    trace!(module, function, "calling operator");
                    operator.call(self, env, mode, args)
                }
                None => match Builtin::from_name(name) {
                    Some(builtin) => builtin.call(self, env, mode, args, callee.location()),
                    None => Err(EvaluationError::at(
                        callee,
                        format!("unknown function: {}", name),
                    )),
                },
            },
            _ => Err(EvaluationError::at(
                callee,
                format!("cannot apply {}", callee.type_name()),
            )),
        }
    }

    fn call_lambda(
        &mut self,
        lambda: Rc<Lambda>,
        callee: &Node,
        args: Vec<Node>,
        mode: Mode,
    ) -> Result<Node> {
        if args.len() != lambda.params.len() {
            return Err(EvaluationError::at(
                callee,
                format!(
                    "lambda expects {} arguments, got {}",
                    lambda.params.len(),
                    args.len()
                ),
            ));
        }

        let scope = lambda.closure.create_child();
        for (param, mut arg) in lambda.params.iter().zip(args) {
            if let Some(schema) = &param.schema {
                validate(&mut arg, schema, false).map_err(|err| {
                    EvaluationError::validation(
                        format!(
                            "argument {} does not satisfy type {}",
                            param.name,
                            schema.name()
                        ),
                        err,
                        arg.location(),
                    )
                })?;
            }
            scope.set(param.name.clone(), arg);
        }

        let mut result = self.eval(lambda.body.clone(), &scope, mode)?;
        if let Some(returns) = &lambda.returns {
            validate(&mut result, returns, false).map_err(|err| {
                EvaluationError::validation(
                    format!("result does not satisfy return type {}", returns.name()),
                    err,
                    result.location(),
                )
            })?;
        }
        Ok(result)
    }
}
