//! Tree-walking interpreter: `walk(expr, current_paragraph, env) -> value`.
//!
//! Grounded directly in `til/tree_walk.py`'s `walk()` — every match arm
//! here has a corresponding `case` there. `pana` is implemented as a Rust
//! `Result::Err` carrying the return value rather than `til`'s
//! `ReturnError` exception, per the "replacing non-local control flow for
//! `pana`" design note: a normal control-flow value, not an error type,
//! even though it rides on `?`.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read as _, Write as _};
use std::rc::Rc;

use rand::Rng;

use nasin_syntax::ast::{self, AssignTarget, BinOp, CmpOp, Expr, Literal, Scope, Sentence, Verb};

use crate::env::Env;
use crate::value::{self, FileHandle, FileMode, Value};

/// Carries a `pana` value out of the sentence loop it returned from, up to
/// the paragraph invocation that catches it. Never surfaces past a single
/// `pali` call — the grammar only ever lets `pana` stand as a whole
/// sentence body, so it never nests inside an arithmetic expression.
struct Return(Value);

type WalkResult = Result<Value, Return>;

/// Entry point used by the CLI (`-w`) and by test scenarios: invoke the
/// root paragraph with a single argument value (the program's argv
/// table), exactly as both source CLIs do by wrapping the root AST in a
/// synthetic `pali` call.
pub fn walk_program(root: &Rc<ast::Paragraph>, program_args: Value) -> Value {
    call_paragraph(root, vec![program_args], &Env::root())
}

fn call_paragraph(paragraph: &Rc<ast::Paragraph>, args: Vec<Value>, caller_env: &Env) -> Value {
    log::trace!(
        "calling paragraph with {} argument(s), {} formal(s)",
        args.len(),
        paragraph.arguments.len()
    );
    let env = caller_env.child();
    for (i, name) in paragraph.arguments.iter().enumerate() {
        env.set_local(name, args.get(i).cloned().unwrap_or(Value::None));
    }
    match run_sentences(&paragraph.sentences, Some(paragraph), &env) {
        Ok(()) => Value::None,
        Err(Return(value)) => value,
    }
}

fn run_sentences(
    sentences: &[Sentence],
    current: Option<&Rc<ast::Paragraph>>,
    env: &Env,
) -> Result<(), Return> {
    for sentence in sentences {
        run_sentence(sentence, current, env)?;
    }
    Ok(())
}

fn run_sentence(sentence: &Sentence, current: Option<&Rc<ast::Paragraph>>, env: &Env) -> Result<(), Return> {
    for cond in &sentence.conditions {
        if !walk_expr(cond, current, env)?.is_truthy() {
            return Ok(());
        }
    }
    let result = walk_expr(&sentence.expr, current, env)?;
    match &sentence.assignment {
        None => {}
        Some(AssignTarget::Variable(scope, name)) => assign_scope(*scope, name, result, env),
        Some(AssignTarget::Table(table_expr, index_expr)) => {
            let table_val = walk_expr(table_expr, current, env)?;
            let index_val = walk_expr(index_expr, current, env)?;
            if let Value::Table(table) = table_val {
                table
                    .borrow_mut()
                    .entries
                    .insert(value::Key::from(index_val), result);
            }
        }
    }
    Ok(())
}

fn assign_scope(scope: Scope, name: &str, value: Value, env: &Env) {
    match scope {
        Scope::Local => env.set_local(name, value),
        Scope::Global => env.set_global(name, value),
        Scope::Unspecified => env.set_first(name, value),
    }
}

fn walk_expr(expr: &Expr, current: Option<&Rc<ast::Paragraph>>, env: &Env) -> WalkResult {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Variable(Scope::Local, name) => Ok(env.get_local(name).unwrap_or(Value::None)),
        Expr::Variable(Scope::Global, name) => Ok(env.get_global(name).unwrap_or(Value::None)),
        Expr::Variable(Scope::Unspecified, name) => Ok(env.get_first(name).unwrap_or(Value::None)),
        Expr::Random => Ok(Value::Int(rand::thread_rng().gen_range(0..256))),
        Expr::Recursive => Ok(current
            .map(|p| Value::Paragraph(p.clone()))
            .unwrap_or(Value::None)),
        Expr::Negate(inner) => Ok(walk_expr(inner, current, env)?.negate()),
        Expr::Bin(BinOp::Equal, left, right) => {
            let l = walk_expr(left, current, env)?;
            let r = walk_expr(right, current, env)?;
            Ok(Value::Bool(l == r))
        }
        Expr::Bin(BinOp::Concat, left, right) => {
            let l = walk_expr(left, current, env)?;
            let r = walk_expr(right, current, env)?;
            Ok(concat(l, r))
        }
        Expr::Bin(BinOp::Index, left, right) => {
            let l = walk_expr(left, current, env)?;
            let r = walk_expr(right, current, env)?;
            Ok(index(l, r))
        }
        Expr::Comparison(CmpOp::GreaterThanZero, inner) => {
            Ok(match walk_expr(inner, current, env)? {
                Value::Int(n) => Value::Bool(n > 0),
                _ => Value::Bool(false),
            })
        }
        Expr::Comparison(CmpOp::LessThanZero, inner) => Ok(match walk_expr(inner, current, env)? {
            Value::Int(n) => Value::Bool(n < 0),
            _ => Value::Bool(false),
        }),
        Expr::Verb { verb, first, args } => walk_verb(*verb, first.as_deref(), args, current, env),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::None => Value::None,
        Literal::Truth => Value::Bool(true),
        Literal::Int(n) => Value::Int(*n),
        Literal::Str(s) => Value::Str(Rc::new(s.clone())),
        Literal::EmptyTable => Value::Table(Rc::new(RefCell::new(value::Table::default()))),
        Literal::Paragraph(p) => Value::Paragraph(p.clone()),
    }
}

fn concat(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::Str(a), Value::Str(b)) => Value::Str(Rc::new(format!("{a}{b}"))),
        _ => Value::None,
    }
}

fn index(container: Value, key: Value) -> Value {
    match container {
        Value::Table(table) => table
            .borrow()
            .entries
            .get(&value::Key::from(key))
            .cloned()
            .unwrap_or(Value::None),
        Value::Str(s) => match key {
            Value::Int(i) if i >= 0 => s
                .chars()
                .nth(i as usize)
                .map(|c| Value::Str(Rc::new(c.to_string())))
                .unwrap_or(Value::None),
            _ => Value::None,
        },
        _ => Value::None,
    }
}

fn walk_verb(
    verb: Verb,
    first: Option<&Expr>,
    args: &[Expr],
    current: Option<&Rc<ast::Paragraph>>,
    env: &Env,
) -> WalkResult {
    let first_val = match first {
        Some(e) => walk_expr(e, current, env)?,
        None => Value::None,
    };
    let mut arg_vals = Vec::with_capacity(args.len());
    for a in args {
        arg_vals.push(walk_expr(a, current, env)?);
    }

    match verb {
        Verb::Return => Err(Return(first_val)),
        Verb::Call => Ok(match first_val {
            Value::Paragraph(p) => call_paragraph(&p, arg_vals, env),
            _ => Value::None,
        }),
        Verb::Read => Ok(builtin_read(&first_val)),
        Verb::Write => {
            builtin_write(&first_val, arg_vals.first());
            Ok(Value::None)
        }
        Verb::Slice => Ok(builtin_slice(&first_val, &arg_vals)),
        Verb::Open => Ok(builtin_open(&first_val, arg_vals.first())),
        Verb::Close => {
            if let Value::File(handle) = &first_val {
                value::close(handle);
            }
            Ok(Value::None)
        }
    }
}

fn builtin_read(first: &Value) -> Value {
    if let Value::File(handle) = first {
        if value::is_open_readable(handle) {
            let line = value::read_line(handle).unwrap_or_default();
            return Value::Str(Rc::new(line));
        }
    }
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => Value::Str(Rc::new(String::new())),
        Ok(_) => Value::Str(Rc::new(line)),
    }
}

fn builtin_write(first: &Value, dest: Option<&Value>) {
    let text = value::represent_owned(first);
    if let Some(Value::File(handle)) = dest {
        if value::is_open_writable(handle) {
            value::write_text(handle, &text);
            return;
        }
    }
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn as_int(v: Option<&Value>) -> Option<i64> {
    match v {
        Some(Value::Int(n)) => Some(*n),
        _ => None,
    }
}

/// Shared by the walker and the VM (spec requires bit-identical slicing):
/// missing or non-integer bounds default to `0`/`len`; `stop` is clamped
/// to be at least `start` before being clamped into range.
pub fn clamp_slice(s: &str, start: Option<i64>, stop: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let clamp = |v: i64| v.clamp(0, len);
    let start = clamp(start.unwrap_or(0));
    let stop = clamp(stop.unwrap_or(len).max(start));
    chars[start as usize..stop as usize].iter().collect()
}

fn builtin_slice(first: &Value, args: &[Value]) -> Value {
    match first {
        Value::Str(s) => {
            let start = as_int(args.first());
            let stop = as_int(args.get(1));
            Value::Str(Rc::new(clamp_slice(s, start, stop)))
        }
        _ => Value::None,
    }
}

fn builtin_open(first: &Value, mode: Option<&Value>) -> Value {
    let path = match first {
        Value::Str(s) => s,
        _ => return Value::None,
    };
    let write_mode = matches!(mode, Some(Value::Str(s)) if s.as_str() == "sitelen");
    if write_mode {
        match File::create(path.as_str()) {
            Ok(file) => Value::File(Rc::new(RefCell::new(FileHandle {
                mode: Some(FileMode::Write(file)),
            }))),
            Err(_) => Value::None,
        }
    } else {
        match File::open(path.as_str()) {
            Ok(file) => Value::File(Rc::new(RefCell::new(FileHandle {
                mode: Some(FileMode::Read(BufReader::new(file))),
            }))),
            Err(_) => Value::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasin_syntax::parse;

    fn run(src: &str) -> Value {
        let paragraph = parse(src).unwrap();
        walk_program(&Rc::new(paragraph), Value::Table(Rc::new(RefCell::new(value::Table::default()))))
    }

    #[test]
    fn empty_program_returns_none() {
        assert!(matches!(run("pali sin li pini"), Value::None));
    }

    #[test]
    fn arithmetic_and_return() {
        let src = "ijo B li nanpa wan en nanpa tu. ijo C li ijo B en nanpa wan. pana e ijo C. pali sin li pini";
        assert!(matches!(run(src), Value::Int(4)));
    }

    #[test]
    fn truth_and_one_are_distinct() {
        let src = "pana e lon li nanpa wan. pali sin li pini";
        assert_eq!(run(src), Value::Bool(false));
    }

    #[test]
    fn table_assignment_and_index() {
        let src = "ijo T li kulupu. ijo T pi nanpa ala li nimi \"x\". pana e ijo T pi nanpa ala. pali sin li pini";
        match run(src) {
            Value::Str(s) => assert_eq!(*s, "x"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn slice_clamps_out_of_range_bounds() {
        assert_eq!(clamp_slice("hello", Some(-5), Some(100)), "hello");
        assert_eq!(clamp_slice("hello", Some(2), Some(1)), "");
        assert_eq!(clamp_slice("hello", None, None), "hello");
    }

    #[test]
    fn recursive_countdown_counts_to_argument() {
        // pali ni(N, K) recurses with (N-1, K+1) until N is 0, then returns
        // K — a counter built purely from argument-passing, since a `pali`
        // call can only stand as a whole sentence body and can't be
        // combined arithmetically with its result (spec's "tail-less
        // recursion"): the accumulator has to travel as a parameter.
        let src = "\
pali ni li kepeken e ijo N e ijo K.\n\
ijo N li nanpa ala la o pana e ijo K.\n\
ijo R li pali e pali ni kepeken ijo N en nanpa wan ala kepeken ijo K en nanpa wan.\n\
o pana e ijo R.\n\
pali sin li pini";
        let paragraph = Rc::new(parse(src).unwrap());
        let result = call_paragraph(&paragraph, vec![Value::Int(10), Value::Int(0)], &Env::root());
        assert!(matches!(result, Value::Int(10)));
    }
}
