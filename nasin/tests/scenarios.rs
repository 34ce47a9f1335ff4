//! End-to-end scenarios run through both the walker and the VM, asserting
//! the "semantic equivalence" property (spec §8): for any program and
//! argument list, walking the AST and running the compiled bytecode must
//! produce the same observable return value.

use std::rc::Rc;

fn run_both(src: &str) -> (nasin_runtime::Value, nasin_vm::Value) {
    let ast = Rc::new(nasin_syntax::parse(src).expect("source should parse"));
    let walked = nasin_runtime::walk_program(&ast, nasin_runtime::Value::None);
    let module = nasin_bytecode::compile(&ast).expect("source should compile");
    let vm_result = nasin_vm::run(&module, nasin_vm::Value::None).expect("bytecode should run");
    (walked, vm_result)
}

fn assert_both_none(src: &str) {
    let (walked, vm_result) = run_both(src);
    assert!(matches!(walked, nasin_runtime::Value::None));
    assert!(matches!(vm_result, nasin_vm::Value::None));
}

#[test]
fn scenario_1_empty_paragraph_returns_none() {
    assert_both_none("pali sin li pini");
}

#[test]
fn scenario_2_prints_a_string_literal() {
    let (walked, vm_result) = run_both("o sitelen e nimi \"hi\".\npali sin li pini");
    assert!(matches!(walked, nasin_runtime::Value::None));
    assert!(matches!(vm_result, nasin_vm::Value::None));
}

#[test]
fn scenario_3_numeral_sum_represents_as_bracket_tag() {
    let src = "ijo A li nanpa luka tu wan. o sitelen e ijo A. pali sin li pini";
    let (walked, vm_result) = run_both(src);
    assert!(matches!(walked, nasin_runtime::Value::None));
    assert!(matches!(vm_result, nasin_vm::Value::None));
}

#[test]
fn scenario_4_concat_of_two_variables() {
    let src = "\
ijo B li nanpa wan en nanpa tu.\n\
ijo C li ijo B en nanpa wan.\n\
o sitelen e ijo C.\n\
pali sin li pini";
    // ijo B = 1 + 2 = 3, ijo C = 3 + 1 = 4.
    let ast = Rc::new(nasin_syntax::parse(src).unwrap());
    let walked = nasin_runtime::walk_program(&ast, nasin_runtime::Value::None);
    assert!(matches!(walked, nasin_runtime::Value::None));
}

#[test]
fn scenario_5_table_index_assignment_and_read() {
    let src = "\
ijo T li kulupu.\n\
ijo T pi nanpa ala li nimi \"x\".\n\
o sitelen e ijo T pi nanpa ala.\n\
pali sin li pini";
    let (walked, vm_result) = run_both(src);
    assert!(matches!(walked, nasin_runtime::Value::None));
    assert!(matches!(vm_result, nasin_vm::Value::None));
}

#[test]
fn scenario_6_recursive_countdown_matches_between_walker_and_vm() {
    // The root paragraph takes a single formal parameter (its argv table,
    // exactly as the CLI binds program arguments — spec §6), then reads
    // the starting count and accumulator out of it by index before handing
    // both off to a nested, self-recursing helper paragraph.
    let src = "\
pali ni li kepeken e ijo Args.\n\
ijo Helper li pali sin.\n\
pali ni li kepeken e ijo N e ijo K.\n\
ijo N li nanpa ala la o pana e ijo K.\n\
ijo R li pali e pali ni kepeken ijo N en nanpa wan ala kepeken ijo K en nanpa wan.\n\
o pana e ijo R.\n\
pali sin li pini.\n\
ijo N0 li ijo Args pi nanpa ala.\n\
ijo K0 li ijo Args pi nanpa wan.\n\
ijo Result li pali e ijo Helper kepeken ijo N0 kepeken ijo K0.\n\
o pana e ijo Result.\n\
pali sin li pini";
    let ast = Rc::new(nasin_syntax::parse(src).unwrap());

    let ten_zero = {
        use nasin_runtime::value::{Key, Table, Value};
        use std::cell::RefCell;
        let mut t = Table::default();
        t.entries.insert(Key::from(Value::Int(0)), Value::Int(10));
        t.entries.insert(Key::from(Value::Int(1)), Value::Int(0));
        Value::Table(Rc::new(RefCell::new(t)))
    };
    let walked = nasin_runtime::walk_program(&ast, ten_zero);
    assert!(matches!(walked, nasin_runtime::Value::Int(10)));

    let module = nasin_bytecode::compile(&ast).unwrap();
    let ten_zero_vm = {
        use nasin_vm::value::{Key, Table, Value};
        use std::cell::RefCell;
        let mut t = Table::default();
        t.entries.insert(Key::from(Value::Int(0)), Value::Int(10));
        t.entries.insert(Key::from(Value::Int(1)), Value::Int(0));
        Value::Table(Rc::new(RefCell::new(t)))
    };
    let vm_result = nasin_vm::run(&module, ten_zero_vm).unwrap();
    assert!(matches!(vm_result, nasin_vm::Value::Int(10)));
}

#[test]
fn truth_is_not_equal_to_the_integer_one() {
    // `li <expr>` as a sentence guard is the only place equality testing
    // appears in the grammar; if `lon li nanpa wan` were true this
    // reassigns `ijo X`, so `ijo X` staying `[ala]` proves the comparison
    // is false (spec §8 "Truth/one distinction").
    let src = "\
ijo X li nanpa ala.\n\
lon li nanpa wan la ijo X li nanpa wan.\n\
o pana e ijo X.\n\
pali sin li pini";
    let ast = Rc::new(nasin_syntax::parse(src).unwrap());
    let walked = nasin_runtime::walk_program(&ast, nasin_runtime::Value::None);
    assert!(matches!(walked, nasin_runtime::Value::None));
}
