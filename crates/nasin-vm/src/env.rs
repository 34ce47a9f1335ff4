//! Environment chain for the VM, identical in shape to
//! `nasin_runtime::env` but keyed by the compiler's `u32` identifier
//! indices instead of names — the VM never sees a variable's source name,
//! only the index [`nasin_bytecode::compiler`] assigned it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

struct Frame {
    vars: RefCell<HashMap<u32, Value>>,
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

    /// A fresh frame child of `self` — every `pali` call builds one of
    /// these from the *caller's current* environment, per the dynamic
    /// scoping rule `tin/virtual_machine.py`'s `Environment(env)` follows.
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

    pub fn get_local(&self, id: u32) -> Option<Value> {
        self.0.vars.borrow().get(&id).cloned()
    }

    pub fn set_local(&self, id: u32, value: Value) {
        self.0.vars.borrow_mut().insert(id, value);
    }

    pub fn get_global(&self, id: u32) -> Option<Value> {
        self.root_frame().get_local(id)
    }

    pub fn set_global(&self, id: u32, value: Value) {
        self.root_frame().set_local(id, value);
    }

    pub fn get_first(&self, id: u32) -> Option<Value> {
        let mut current = self;
        loop {
            if let Some(v) = current.0.vars.borrow().get(&id) {
                return Some(v.clone());
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    pub fn set_first(&self, id: u32, value: Value) {
        let mut current = self;
        loop {
            if current.0.vars.borrow().contains_key(&id) {
                current.0.vars.borrow_mut().insert(id, value);
                return;
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.set_local(id, value);
    }
}
