//! Two-pass compiler: [`Dictionary::collect`] walks the AST once to assign
//! every identifier and paragraph literal a stable index, then
//! [`compile`] walks it again to emit bytes, using those indices for every
//! fixed-width operand. Grounded throughout in `tin/compiler.py`'s
//! `make_dictionary` / `compile_ast` / `compiler` functions — the opcode
//! choices, operand order and the reversed-argument push order for verb
//! calls all mirror that file line for line.

use std::collections::HashMap;
use std::rc::Rc;

use nasin_syntax::ast::{self, AssignTarget, BinOp, CmpOp, Expr, Literal, Scope, Sentence, Verb};

use crate::error::CompileError;
use crate::format::{self, byte_width, minimal_be, op, Header, Module};

/// Assigns a stable 0-based index to every identifier and every paragraph
/// literal reachable from the root paragraph, in the same pre-order the
/// emitter will later walk the tree. Paragraphs register themselves before
/// recursing into their own bodies, so a paragraph's index is always lower
/// than any paragraph nested inside it — matching `make_dictionary`'s
/// `Paragraph` case, which adds `ast` to `dictionary.pars` before visiting
/// `arguments`/`sentences`.
struct Dictionary {
    var_order: Vec<String>,
    var_index: HashMap<String, u32>,
    par_order: Vec<Rc<ast::Paragraph>>,
    par_index: HashMap<usize, u32>,
}

impl Dictionary {
    fn new() -> Self {
        Dictionary {
            var_order: Vec::new(),
            var_index: HashMap::new(),
            par_order: Vec::new(),
            par_index: HashMap::new(),
        }
    }

    fn register_var(&mut self, name: &str) -> u32 {
        if let Some(&i) = self.var_index.get(name) {
            return i;
        }
        let i = self.var_order.len() as u32;
        self.var_index.insert(name.to_string(), i);
        self.var_order.push(name.to_string());
        i
    }

    fn var_of(&self, name: &str) -> u32 {
        self.var_index[name]
    }

    fn register_paragraph(&mut self, p: &Rc<ast::Paragraph>) -> u32 {
        let key = Rc::as_ptr(p) as usize;
        if let Some(&i) = self.par_index.get(&key) {
            return i;
        }
        let i = self.par_order.len() as u32;
        self.par_index.insert(key, i);
        self.par_order.push(Rc::clone(p));
        i
    }

    fn par_of(&self, p: &Rc<ast::Paragraph>) -> u32 {
        self.par_index[&(Rc::as_ptr(p) as usize)]
    }

    fn var_len(&self) -> u8 {
        byte_width(self.var_order.len() as u64)
    }

    /// At least 1 byte, matching `compiler`'s `max(get_var_len(dictionary.pars), 1)`
    /// — the root paragraph always occupies index 0, so this is never
    /// actually reached in practice, but the source keeps the floor.
    fn par_len(&self) -> u8 {
        byte_width(self.par_order.len() as u64).max(1)
    }

    fn collect(root: &Rc<ast::Paragraph>) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.collect_paragraph(root);
        dict
    }

    fn collect_paragraph(&mut self, p: &Rc<ast::Paragraph>) {
        self.register_paragraph(p);
        for arg in &p.arguments {
            self.register_var(arg);
        }
        for sentence in &p.sentences {
            self.collect_sentence(sentence);
        }
    }

    fn collect_sentence(&mut self, s: &Sentence) {
        for cond in &s.conditions {
            self.collect_expr(cond);
        }
        if let Some(target) = &s.assignment {
            self.collect_assign_target(target);
        }
        self.collect_expr(&s.expr);
    }

    fn collect_assign_target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Variable(_, name) => {
                self.register_var(name);
            }
            AssignTarget::Table(table, index) => {
                self.collect_expr(table);
                self.collect_expr(index);
            }
        }
    }

    fn collect_expr(&mut self, e: &Expr) {
        match e {
            Expr::Literal(Literal::Paragraph(p)) => self.collect_paragraph(p),
            Expr::Literal(_) => {}
            Expr::Variable(_, name) => {
                self.register_var(name);
            }
            Expr::Random | Expr::Recursive => {}
            Expr::Negate(inner) => self.collect_expr(inner),
            Expr::Bin(_, l, r) => {
                self.collect_expr(l);
                self.collect_expr(r);
            }
            Expr::Comparison(_, inner) => self.collect_expr(inner),
            Expr::Verb { first, args, .. } => {
                if let Some(first) = first {
                    self.collect_expr(first);
                }
                for arg in args {
                    self.collect_expr(arg);
                }
            }
        }
    }
}

/// Big-endian, left-padded to `width`, erroring if the value needs more
/// bytes than the 3-bit length field can name (see [`CompileError`]).
fn fixed_be(what: &'static str, n: u64, width: u8) -> Result<Vec<u8>, CompileError> {
    let minimal = minimal_be(n);
    if minimal.len() > width as usize {
        return Err(CompileError::ImmediateTooLarge {
            what,
            bytes: minimal.len(),
        });
    }
    let mut out = vec![0u8; width as usize - minimal.len()];
    out.extend(minimal);
    Ok(out)
}

/// A length-prefixed immediate: `[COMMAND | lencode | NNN] ++ length_bytes ++ payload`.
fn lencoded(lencode: u8, payload: &[u8], what: &'static str) -> Result<Vec<u8>, CompileError> {
    let len_bytes = minimal_be(payload.len() as u64);
    if len_bytes.len() > format::LENGTH_MASK as usize {
        return Err(CompileError::ImmediateTooLarge {
            what,
            bytes: len_bytes.len(),
        });
    }
    let mut out = vec![lencode | len_bytes.len() as u8];
    out.extend(len_bytes);
    out.extend(payload);
    Ok(out)
}

fn compile_expr(e: &Expr, dict: &Dictionary) -> Result<Vec<u8>, CompileError> {
    Ok(match e {
        Expr::Literal(Literal::None) => vec![op::PUSH_NONE],
        Expr::Literal(Literal::Truth) => vec![op::PUSH_TRUTH],
        Expr::Literal(Literal::EmptyTable) => vec![op::PUSH_TABLE],
        Expr::Literal(Literal::Int(n)) => {
            lencoded(format::LEN_INT, &minimal_be(*n as u64), "integer literal")?
        }
        Expr::Literal(Literal::Str(s)) => {
            lencoded(format::LEN_STR, s.as_bytes(), "string literal")?
        }
        Expr::Literal(Literal::Paragraph(p)) => {
            let mut out = vec![op::PUSH_PARAGRAPH];
            out.extend(fixed_be(
                "paragraph reference",
                dict.par_of(p) as u64,
                dict.par_len(),
            )?);
            out
        }
        Expr::Variable(scope, name) => {
            let opcode = match scope {
                Scope::Unspecified => op::PUSH_VAR_FIRST,
                Scope::Local => op::PUSH_VAR_LOCAL,
                Scope::Global => op::PUSH_VAR_GLOBAL,
            };
            let mut out = vec![opcode];
            out.extend(fixed_be(
                "variable reference",
                dict.var_of(name) as u64,
                dict.var_len(),
            )?);
            out
        }
        Expr::Random => vec![op::PUSH_RANDOM],
        Expr::Recursive => vec![op::PUSH_RECURSIVE],
        Expr::Negate(inner) => {
            let mut out = compile_expr(inner, dict)?;
            out.push(op::NEGATE);
            out
        }
        Expr::Bin(kind, l, r) => {
            let mut out = compile_expr(l, dict)?;
            out.extend(compile_expr(r, dict)?);
            out.push(match kind {
                BinOp::Concat => op::EN,
                BinOp::Index => op::PI,
                BinOp::Equal => op::LI,
            });
            out
        }
        Expr::Comparison(kind, inner) => {
            let mut out = compile_expr(inner, dict)?;
            out.push(match kind {
                CmpOp::GreaterThanZero => op::SULI,
                CmpOp::LessThanZero => op::LILI,
            });
            out
        }
        Expr::Verb { verb, first, args } => {
            let mut out = Vec::new();
            for arg in args.iter().rev() {
                out.extend(compile_expr(arg, dict)?);
            }
            match first {
                Some(first) => out.extend(compile_expr(first, dict)?),
                None => out.push(op::PUSH_NONE),
            }
            out.push(match verb {
                Verb::Call => op::PALI,
                Verb::Return => op::PANA,
                Verb::Read => op::LUKIN,
                Verb::Write => op::SITELEN,
                Verb::Slice => op::KIPISI,
                Verb::Open => op::OPEN,
                Verb::Close => op::PINI,
            });
            out
        }
    })
}

fn compile_sentence(s: &Sentence, dict: &Dictionary) -> Result<Vec<u8>, CompileError> {
    let mut compiled_conditions = Vec::with_capacity(s.conditions.len());
    for cond in &s.conditions {
        compiled_conditions.push(compile_expr(cond, dict)?);
    }

    let mut compiled = compile_expr(&s.expr, dict)?;
    match &s.assignment {
        Some(AssignTarget::Table(table, index)) => {
            compiled.extend(compile_expr(table, dict)?);
            compiled.extend(compile_expr(index, dict)?);
            compiled.push(op::TABLE_SET);
        }
        Some(AssignTarget::Variable(scope, name)) => {
            let opcode = match scope {
                Scope::Unspecified => op::ASSIGN_FIRST,
                Scope::Local => op::ASSIGN_LOCAL,
                Scope::Global => op::ASSIGN_GLOBAL,
            };
            compiled.push(opcode);
            compiled.extend(fixed_be(
                "assignment target",
                dict.var_of(name) as u64,
                dict.var_len(),
            )?);
        }
        None => compiled.push(op::DISCARD),
    }

    // Conditions are prepended in reverse, each guarding everything already
    // built, with a jump-if-false-or-none distance equal to that suffix's
    // length — exactly `compiler.py`'s `Sentence` case.
    for cond in compiled_conditions.into_iter().rev() {
        let distance = minimal_be(compiled.len() as u64);
        if distance.len() > format::LENGTH_MASK as usize {
            return Err(CompileError::ImmediateTooLarge {
                what: "conditional jump distance",
                bytes: distance.len(),
            });
        }
        let mut guarded = cond;
        guarded.push(format::LEN_JEZ | distance.len() as u8);
        guarded.extend(distance);
        guarded.extend(compiled);
        compiled = guarded;
    }

    Ok(compiled)
}

fn compile_paragraph_body(p: &ast::Paragraph, dict: &Dictionary) -> Result<Vec<u8>, CompileError> {
    let mut compiled = Vec::new();
    for arg in &p.arguments {
        compiled.push(op::ASSIGN_LOCAL);
        compiled.extend(fixed_be("argument binding", dict.var_of(arg) as u64, dict.var_len())?);
    }
    compiled.push(op::CLEAR);
    for sentence in &p.sentences {
        compiled.extend(compile_sentence(sentence, dict)?);
    }
    // Every paragraph falls off the end into an implicit `o pana e [ala]`,
    // matching `compiler.py` appending a synthetic return sentence.
    let implicit_return = Sentence {
        conditions: vec![],
        assignment: None,
        expr: Expr::Verb {
            verb: Verb::Return,
            first: None,
            args: vec![],
        },
    };
    compiled.extend(compile_sentence(&implicit_return, dict)?);
    Ok(compiled)
}

/// Compiles a whole program, rooted at `root`, into a self-contained
/// [`Module`]. The root paragraph always lands at index 0 (it is the first
/// thing [`Dictionary::collect`] registers), so a VM loading this module
/// starts execution at `paragraph_code(0)`.
pub fn compile(root: &Rc<ast::Paragraph>) -> Result<Module, CompileError> {
    let dict = Dictionary::collect(root);
    let var_len = dict.var_len();
    let par_len = dict.par_len();
    log::trace!(
        "dictionary: {} identifier(s), {} paragraph(s)",
        dict.var_order.len(),
        dict.par_order.len()
    );

    let mut code = Vec::new();
    let mut addresses = Vec::with_capacity(dict.par_order.len());
    for p in &dict.par_order {
        addresses.push(code.len() as u64);
        code.extend(compile_paragraph_body(p, &dict)?);
    }
    let adr_len = byte_width(code.len() as u64);

    Ok(Module {
        header: Header {
            version: format::VERSION,
            var_len,
            adr_len,
            par_len,
            paragraph_addresses: addresses,
        },
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasin_syntax::parse;

    #[test]
    fn compiles_trivial_paragraph() {
        let ast = Rc::new(parse("o pana e ala.\npali sin li pini").unwrap());
        let module = compile(&ast).unwrap();
        assert_eq!(module.paragraph_count(), 1);
        assert!(!module.paragraph_code(0).is_empty());
    }

    #[test]
    fn nested_paragraph_literal_gets_its_own_index() {
        let src = "\
ijo X li pali sin.\n\
o pana.\n\
pali sin li pini.\n\
o pana e ijo X.\n\
pali sin li pini";
        let ast = Rc::new(parse(src).unwrap());
        let module = compile(&ast).unwrap();
        assert_eq!(module.paragraph_count(), 2);
    }

    #[test]
    fn assignment_roundtrips_through_the_dictionary() {
        let src = "ijo N li nanpa wan.\no pana e ijo N.\npali sin li pini";
        let ast = Rc::new(parse(src).unwrap());
        let module = compile(&ast).unwrap();
        // assign-local + its 1-byte index, clear, push-int + push-var-local + return + discard
        assert!(module.paragraph_code(0).len() > 4);
    }
}
