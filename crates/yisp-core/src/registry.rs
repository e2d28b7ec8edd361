//! Library operators.
//!
//! A call whose head is a dotted name such as `str.upper` dispatches to the
//! operator registered for module `str` and name `upper`. Operators receive
//! their arguments already evaluated, plus the engine for re-entrant
//! evaluation, application and option lookup.

use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::Engine;
use crate::env::Env;
use crate::error::Result;
use crate::eval::Mode;
use crate::node::Node;

pub trait Operator {
    fn call(&self, engine: &mut Engine, env: &Env, mode: Mode, args: Vec<Node>) -> Result<Node>;
}

impl<F> Operator for F
where
    F: Fn(&mut Engine, &Env, Mode, Vec<Node>) -> Result<Node>,
{
    fn call(&self, engine: &mut Engine, env: &Env, mode: Mode, args: Vec<Node>) -> Result<Node> {
        self(engine, env, mode, args)
    }
}

#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<(String, String), Rc<dyn Operator>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operator` as `module.name`, replacing any previous one.
    pub fn register(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        operator: impl Operator + 'static,
    ) {
        self.operators
            .insert((module.into(), name.into()), Rc::new(operator));
    }

    pub fn get(&self, module: &str, name: &str) -> Option<Rc<dyn Operator>> {
        self.operators
            .get(&(module.to_string(), name.to_string()))
            .cloned()
    }

    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.get(module, name).is_some()
    }

    /// Registered operators as `module.name`, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .operators
            .keys()
            .map(|(module, name)| format!("{}.{}", module, name))
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}
