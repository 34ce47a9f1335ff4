//! Environment chain for the tree-walking interpreter.
//!
//! Mirrors `til/tree_walk.py`'s `Environment` class: each frame is a flat
//! string-keyed map plus an optional parent. `ijo X` (unspecified scope)
//! resolves/assigns through the nearest frame that already binds `X`,
//! falling back to creating it locally; `ijo lili X` is always local;
//! `ijo suli X` always walks to the root frame. Paragraph calls build
//! their frame as a child of the *caller's current* frame (not the
//! paragraph's declaration site) — confirmed by both `til/tree_walk.py`
//! and `tin/virtual_machine.py` constructing `Environment(env)` from the
//! call-site environment, and neither's `Paragraph` representation
//! storing a defining environment at all. Scope is therefore dynamic, not
//! lexical.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

pub struct Frame {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    pub fn root() -> Self {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A new frame whose parent is `self` — used both for a paragraph
    /// call's fresh frame and is otherwise the only way frames nest.
    pub fn child(&self) -> Self {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    fn root_frame(&self) -> &Env {
        let mut current = self;
        loop {
            match &current.0.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.vars.borrow().get(name).cloned()
    }

    pub fn set_local(&self, name: &str, value: Value) {
        self.0.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.root_frame().get_local(name)
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.root_frame().set_local(name, value);
    }

    /// Walk from this frame upward, returning the value bound in the
    /// nearest frame that has it.
    pub fn get_first(&self, name: &str) -> Option<Value> {
        let mut current = self;
        loop {
            if let Some(v) = current.0.vars.borrow().get(name) {
                return Some(v.clone());
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Assign into the nearest frame that already binds `name`; if none
    /// does, create the binding in the current (innermost) frame.
    pub fn set_first(&self, name: &str, value: Value) {
        let mut current = self;
        loop {
            if current.0.vars.borrow().contains_key(name) {
                current.0.vars.borrow_mut().insert(name.to_string(), value);
                return;
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.set_local(name, value);
    }
}
