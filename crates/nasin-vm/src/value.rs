//! Runtime value model for the bytecode VM.
//!
//! Deliberately independent of `nasin_syntax`/`nasin_runtime`: the VM never
//! touches the AST, so a callable is just the index of its compiled body in
//! [`crate::vm::Vm`]'s paragraph table (`tin/virtual_machine.py`'s
//! `Paragraph(id)` wrapper), not an `Rc<ast::Paragraph>`.

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Write};
use std::rc::Rc;

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct Key(pub Value);

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key(value)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            _ => self.0 == other.0,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::None => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::Table(t) => {
                4u8.hash(state);
                Rc::as_ptr(t).hash(state);
            }
            Value::File(f) => {
                5u8.hash(state);
                Rc::as_ptr(f).hash(state);
            }
            Value::Paragraph(id) => {
                6u8.hash(state);
                id.hash(state);
            }
        }
    }
}

/// Insertion order matters here even though spec.md §3 calls it
/// "irrelevant" for lookup: the CLI's `Program exited with <value>`
/// trailer renders a returned table with Python's `str(dict)`, which
/// prints entries in insertion order, so the backing map has to preserve
/// it too.
#[derive(Debug, Default)]
pub struct Table {
    pub entries: IndexMap<Key, Value>,
}

#[derive(Debug)]
pub enum FileMode {
    Read(BufReader<File>),
    Write(File),
}

#[derive(Debug)]
pub struct FileHandle {
    pub mode: Option<FileMode>,
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<String>),
    Table(Rc<RefCell<Table>>),
    File(Rc<RefCell<FileHandle>>),
    /// Index of the paragraph's compiled body, matching `Paragraph.id` in
    /// `tin/virtual_machine.py` — the VM never needs more than that.
    Paragraph(u32),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", represent_owned(self))
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    pub fn negate(&self) -> Value {
        match self {
            Value::Bool(b) => Value::Bool(!b),
            Value::Int(i) => Value::Int(-i),
            _ => Value::None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.entries.len() == b.entries.len()
                    && a.entries.iter().all(|(k, v)| b.entries.get(k) == Some(v))
            }
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            (Value::Paragraph(a), Value::Paragraph(b)) => a == b,
            _ => false,
        }
    }
}

/// `sitelen`'s display form (`represent()` in `tin/virtual_machine.py`):
/// every non-string value prints as a fixed bracketed tag.
pub fn represent_owned(value: &Value) -> String {
    match value {
        Value::None => "[ala]".to_string(),
        Value::Bool(true) => "[lon]".to_string(),
        Value::Bool(false) => "[lon ala]".to_string(),
        Value::Int(_) => "[nanpa]".to_string(),
        Value::Str(s) => (**s).clone(),
        Value::Table(_) => "[kulupu]".to_string(),
        Value::File(_) => "[lipu]".to_string(),
        Value::Paragraph(_) => "[pali]".to_string(),
    }
}

/// `Program exited with <value>` trailer, mirroring Python's default
/// `str()`: a top-level string prints with no quoting
/// (`virtual_machine.py:286`'s `print('Program exited with', data[-1])`);
/// anything nested inside a table goes through [`python_repr`] instead,
/// matching `str(dict)`'s own use of `repr()` on its entries.
pub fn debug_repr(value: &Value) -> String {
    match value {
        Value::Str(s) => (**s).clone(),
        other => python_repr(other),
    }
}

/// Python's `repr()` rendering, used for every value nested inside a
/// table by [`debug_repr`]: strings are single-quoted (`'x'`, not `"x"`),
/// and a table's entries print in insertion order rather than sorted,
/// since `dict` preserves the order keys were first inserted.
fn python_repr(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Str(s) => python_repr_str(s),
        Value::Table(t) => {
            let t = t.borrow();
            let parts: Vec<String> = t
                .entries
                .iter()
                .map(|(k, v)| format!("{}: {}", python_repr(&k.0), python_repr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::File(_) => "<file>".to_string(),
        Value::Paragraph(_) => "<paragraph>".to_string(),
    }
}

fn python_repr_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub fn is_open_readable(handle: &Rc<RefCell<FileHandle>>) -> bool {
    matches!(handle.borrow().mode, Some(FileMode::Read(_)))
}

pub fn is_open_writable(handle: &Rc<RefCell<FileHandle>>) -> bool {
    matches!(handle.borrow().mode, Some(FileMode::Write(_)))
}

pub fn close(handle: &Rc<RefCell<FileHandle>>) {
    handle.borrow_mut().mode = None;
}

/// One line, terminator included, matching `str.readline()`.
pub fn read_line(handle: &Rc<RefCell<FileHandle>>) -> String {
    let mut h = handle.borrow_mut();
    if let Some(FileMode::Read(reader)) = &mut h.mode {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(_) => line,
            Err(_) => String::new(),
        }
    } else {
        String::new()
    }
}

pub fn write_text(handle: &Rc<RefCell<FileHandle>>, text: &str) {
    let mut h = handle.borrow_mut();
    if let Some(FileMode::Write(file)) = &mut h.mode {
        let _ = write!(file, "{text}");
    }
}
