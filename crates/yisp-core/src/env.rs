//! Lexical environments.
//!
//! An [`Env`] is a handle onto a chain of frames plus the root frame of the
//! current run. Frames are shared between handles, so a binding made
//! through one handle is visible through every other handle onto the same
//! frame. Lambdas capture a snapshot instead, which copies the current
//! frame. The root handle survives snapshots: anchors bound while a lambda
//! runs still land in the run's root, and a name a snapshot does not hold is
//! looked up in the live root.

use crate::node::{Node, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("undefined symbol: {0}")]
pub struct UndefinedSymbol(pub String);

#[derive(Debug, Default)]
struct Frame {
    vars: IndexMap<String, Node>,
    parent: Option<Rc<RefCell<Frame>>>,
}

pub struct Env {
    frame: Rc<RefCell<Frame>>,
    root: Rc<RefCell<Frame>>,
}

impl Env {
    /// A new root environment with no bindings.
    pub fn new() -> Self {
        let frame = Rc::new(RefCell::new(Frame::default()));
        Env {
            root: frame.clone(),
            frame,
        }
    }

    /// A new empty frame whose parent is this one.
    pub fn create_child(&self) -> Env {
        let frame = Frame {
            vars: IndexMap::new(),
            parent: Some(self.frame.clone()),
        };
        Env {
            frame: Rc::new(RefCell::new(frame)),
            root: self.root.clone(),
        }
    }

    /// Copy the current frame's bindings into a new frame with the same
    /// parent. Later bindings in either frame are not seen by the other.
    /// The copy keeps this environment's root.
    pub fn snapshot(&self) -> Env {
        let frame = self.frame.borrow();
        let copy = Frame {
            vars: frame.vars.clone(),
            parent: frame.parent.clone(),
        };
        Env {
            frame: Rc::new(RefCell::new(copy)),
            root: self.root.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        Rc::ptr_eq(&self.frame, &self.root)
    }

    /// The outermost environment.
    pub fn root(&self) -> Env {
        Env {
            frame: self.root.clone(),
            root: self.root.clone(),
        }
    }

    /// Bind `name` in the current frame.
    pub fn set(&self, name: impl Into<String>, value: Node) {
        self.frame.borrow_mut().vars.insert(name.into(), value);
    }

    /// Look up `key`, searching the current frame, then its ancestors, then
    /// the root if the chain did not reach it.
    ///
    /// A key that is not bound as a whole is split on `.`: the first
    /// segment is looked up as a name and each further segment indexes
    /// into a map.
    pub fn get(&self, key: &str) -> Result<Node, UndefinedSymbol> {
        if let Some(node) = self.lookup(key) {
            return Ok(node);
        }

        let mut segments = key.split('.');
        let first = segments.next().unwrap_or(key);
        let mut current = match self.lookup(first) {
            Some(node) if key.contains('.') => node,
            _ => return Err(UndefinedSymbol(key.to_string())),
        };
        for segment in segments {
            current = match &current.value {
                Value::Map(map) => map
                    .get(segment)
                    .cloned()
                    .ok_or_else(|| UndefinedSymbol(key.to_string()))?,
                _ => return Err(UndefinedSymbol(key.to_string())),
            };
        }
        Ok(current)
    }

    fn lookup(&self, name: &str) -> Option<Node> {
        let mut frame = Some(self.frame.clone());
        let mut searched_root = false;
        while let Some(current) = frame {
            searched_root |= Rc::ptr_eq(&current, &self.root);
            frame = {
                let f = current.borrow();
                if let Some(node) = f.vars.get(name) {
                    return Some(node.clone());
                }
                f.parent.clone()
            };
        }
        if searched_root {
            return None;
        }
        self.root.borrow().vars.get(name).cloned()
    }

    /// Bindings of the current frame, in definition order.
    pub fn bindings(&self) -> IndexMap<String, Node> {
        self.frame.borrow().vars.clone()
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl Clone for Env {
    /// Same as [`Env::snapshot`].
    fn clone(&self) -> Self {
        self.snapshot()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames can reach themselves through lambda closures, so only the
        // names are shown.
        let names: Vec<String> = self.frame.borrow().vars.keys().cloned().collect();
        f.debug_struct("Env")
            .field("vars", &names)
            .field("is_root", &self.is_root())
            .finish()
    }
}
