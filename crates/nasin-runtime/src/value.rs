//! Runtime value model for the tree-walking interpreter.
//!
//! Grounded in `til/tree_walk.py`: a table is a plain integer-or-string
//! keyed dictionary, a paragraph value carries its own defining AST plus
//! nothing else (closures are not lexical, see [`crate::walk`]), and file
//! handles wrap a read or write mode only — `til`'s `Environment`-scoped
//! file objects map onto [`FileHandle`] here.

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Write};
use std::rc::Rc;

use indexmap::IndexMap;

use nasin_syntax::ast;

/// A table key: spec's data model says a table maps "value to value", so
/// any runtime value is a legal key, not just ints and strings (`til`'s
/// `dict()` backing allows the same as long as the key is hashable —
/// Python would raise on an unhashable key like a nested dict, which
/// spec's "runtime type fallbacks ... MUST NOT raise" rules out; this
/// normalizes `Key` equality/hash to tag-then-payload ("tag the kind,
/// hash the payload", spec §9) so every `Value` is hashable, at the cost
/// of keying aggregate values (`Table`, `File`, `Paragraph`) by identity
/// rather than by structure — the only plausible use of those as a key is
/// re-indexing with the very value you just inserted.
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
            (Value::Paragraph(a), Value::Paragraph(b)) => Rc::ptr_eq(a, b),
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
            Value::Paragraph(p) => {
                6u8.hash(state);
                Rc::as_ptr(p).hash(state);
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

impl FileHandle {
    pub fn closed() -> Self {
        FileHandle { mode: None }
    }
}

#[derive(Clone)]
pub enum Value {
    None,
    /// `lon` always evaluates to `Bool(true)`; `Bool(false)` only ever
    /// arises at runtime, from negating a truth value or from a failed
    /// `li`/`suli`/`lili` test — there is no `false` literal in the
    /// grammar. Kept as its own variant (not folded into `Int`) so that
    /// `lon li nanpa wan` compares unequal by type, per spec.
    Bool(bool),
    Int(i64),
    Str(Rc<String>),
    Table(Rc<RefCell<Table>>),
    File(Rc<RefCell<FileHandle>>),
    Paragraph(Rc<ast::Paragraph>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", represent(self))
    }
}

impl Value {
    /// A sentence's guard condition is skipped when it evaluates to `None`
    /// or `Bool(false)`; anything else, including `Bool(true)` and every
    /// non-boolean value, passes.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "truth",
            Value::Int(_) => "number",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
            Value::File(_) => "file",
            Value::Paragraph(_) => "paragraph",
        }
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
    /// Structural equality, matching `til/tree_walk.py`'s `li` operator:
    /// tables compare by recursive entry equality, not identity.
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
            (Value::Paragraph(a), Value::Paragraph(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The `sitelen` display form, matching `represent()` in both
/// `til/tree_walk.py` and `tin/virtual_machine.py` (the two agree, down to
/// the exact bracket spellings). Every non-string value prints as a fixed
/// bracketed tag rather than its contents — notably `Int` always prints as
/// the literal `[nanpa]`, never the digits, which is the source's own
/// behaviour, not a Rust-port simplification.
pub fn represent(value: &Value) -> &'static str {
    match value {
        Value::None => "[ala]",
        Value::Bool(true) => "[lon]",
        Value::Bool(false) => "[lon ala]",
        Value::Int(_) => "[nanpa]",
        Value::Str(_) => unreachable!("callers special-case Str to avoid an allocation"),
        Value::Table(_) => "[kulupu]",
        Value::File(_) => "[lipu]",
        Value::Paragraph(_) => "[pali]",
    }
}

/// Renders any value for `sitelen`, handling the one variant (`Str`) whose
/// printed form is its own content rather than a fixed tag.
pub fn represent_owned(value: &Value) -> String {
    match value {
        Value::Str(s) => (**s).clone(),
        other => represent(other).to_string(),
    }
}

/// The CLI's `Program exited with <value>` trailer (spec §4.5, §6).
/// Neither source CLI uses `represent()` for this line — it prints the
/// interpreter's own value via Python's default `str()`, so a top-level
/// string prints with no quoting (`til_cli.py`'s `f'Program exited with
/// {ans}'`, `virtual_machine.py:286`'s `print('Program exited with',
/// data[-1])`); anything nested inside a table is rendered with
/// [`python_repr`] instead, matching `str(dict)`'s own use of `repr()` on
/// its entries.
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

/// `sitelen` into an open writable file handle. No-op (not an error) on a
/// closed or read-mode handle, matching the `lukin`/`sitelen` fallback
/// rule of always degrading rather than raising (spec §7).
pub fn write_text(handle: &Rc<RefCell<FileHandle>>, text: &str) {
    let mut h = handle.borrow_mut();
    if let Some(FileMode::Write(file)) = &mut h.mode {
        let _ = write!(file, "{text}");
    }
}

/// `lukin` from an open readable file handle: one line, terminator
/// included, exactly as `str.readline()` does in the Python original.
/// `None` means the handle isn't an open reader (caller falls back to
/// stdin); EOF is a `Some(String::new())`.
pub fn read_line(handle: &Rc<RefCell<FileHandle>>) -> Option<String> {
    let mut h = handle.borrow_mut();
    match &mut h.mode {
        Some(FileMode::Read(reader)) => {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(_) => Some(line),
                Err(_) => Some(String::new()),
            }
        }
        _ => None,
    }
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
