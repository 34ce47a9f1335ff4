//! Bytecode execution loop. Grounded line-for-line in
//! `tin/virtual_machine.py`'s `virtual_machine` function: same opcode
//! table, same single global data stack shared across calls, same
//! "every verb/call/return replaces the whole data stack with a
//! one-element list holding its result" discipline (the reason verb forms
//! can only ever be a whole sentence body, never nested in an
//! expression — there is nowhere for a partial result to wait).
//!
//! Two source bugs are deliberately NOT reproduced: `pi`/`en` silently
//! dropping the result on a type mismatch instead of pushing `None` (every
//! other opcode here falls back to `None`, and spec requires type
//! fallbacks never to raise), and `pini`'s typo'd `colsed` keyword
//! argument that makes it a permanent no-op (closing a handle is the only
//! reason the opcode exists).

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use rand::Rng;

use nasin_bytecode::format::{self, op};
use nasin_bytecode::Module;

use crate::env::Env;
use crate::error::VmError;
use crate::value::{represent_owned, FileHandle, FileMode, Key, Table, Value};

/// Executes `module` starting at paragraph 0 (the root paragraph, always
/// index 0 per `nasin_bytecode::compiler`'s collection order), with
/// `program_args` bound as its first popped argument. Returns the value
/// passed to the outermost `pana`.
pub fn run(module: &Module, program_args: Value) -> Result<Value, VmError> {
    let var_len = module.header.var_len;
    let par_len = module.header.par_len;

    let mut data: Vec<Value> = vec![program_args];
    let mut call_stack: Vec<(u32, usize, Env)> = Vec::new();
    let mut par: u32 = 0;
    let mut ip: usize = 0;
    let mut env = Env::root();
    let mut instructions: u64 = 0;

    loop {
        instructions += 1;
        let code = module
            .paragraph_code_checked(par)
            .ok_or(VmError::UnknownParagraph(par))?;
        let byte = *code
            .get(ip)
            .ok_or(VmError::Truncated { paragraph: par, ip })?;
        let opcode_ip = ip;
        ip += 1;

        if byte & format::COMMAND_BIT != 0 {
            match byte & format::OPCODE_MASK {
                op::PUSH_TRUTH => data.push(Value::Bool(true)),
                op::PUSH_TABLE => data.push(Value::Table(Rc::new(RefCell::new(Table::default())))),
                op::PUSH_NONE => data.push(Value::None),
                op::PUSH_PARAGRAPH => {
                    let id = read_operand(code, &mut ip, par_len, par, opcode_ip)?;
                    data.push(Value::Paragraph(id as u32));
                }
                op::PUSH_VAR_FIRST => {
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    data.push(env.get_first(id).unwrap_or(Value::None));
                }
                op::PUSH_VAR_LOCAL => {
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    data.push(env.get_local(id).unwrap_or(Value::None));
                }
                op::PUSH_VAR_GLOBAL => {
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    data.push(env.get_global(id).unwrap_or(Value::None));
                }
                op::PUSH_RANDOM => data.push(Value::Int(rand::thread_rng().gen_range(0..256))),
                op::PUSH_RECURSIVE => data.push(Value::Paragraph(par)),
                op::SULI => {
                    let a = data.pop().unwrap_or(Value::None);
                    data.push(Value::Bool(matches!(a, Value::Int(n) if n > 0)));
                }
                op::LILI => {
                    let a = data.pop().unwrap_or(Value::None);
                    data.push(Value::Bool(matches!(a, Value::Int(n) if n < 0)));
                }
                op::LI => {
                    let a = data.pop().unwrap_or(Value::None);
                    let b = data.pop().unwrap_or(Value::None);
                    data.push(Value::Bool(a == b));
                }
                op::NEGATE => {
                    let a = data.pop().unwrap_or(Value::None);
                    data.push(a.negate());
                }
                op::EN => {
                    let a = data.pop().unwrap_or(Value::None);
                    let b = data.pop().unwrap_or(Value::None);
                    data.push(concat(b, a));
                }
                op::PI => {
                    let a = data.pop().unwrap_or(Value::None);
                    let b = data.pop().unwrap_or(Value::None);
                    data.push(index(b, a));
                }
                op::TABLE_SET => {
                    let i = data.pop().unwrap_or(Value::None);
                    let t = data.pop().unwrap_or(Value::None);
                    let v = data.pop().unwrap_or(Value::None);
                    if let Value::Table(t) = t {
                        t.borrow_mut().entries.insert(Key::from(i), v);
                    }
                }
                op::ASSIGN_FIRST => {
                    let a = data.pop().unwrap_or(Value::None);
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    env.set_first(id, a);
                }
                op::ASSIGN_LOCAL => {
                    let a = data.pop().unwrap_or(Value::None);
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    env.set_local(id, a);
                }
                op::ASSIGN_GLOBAL => {
                    let a = data.pop().unwrap_or(Value::None);
                    let id = read_operand(code, &mut ip, var_len, par, opcode_ip)? as u32;
                    env.set_global(id, a);
                }
                op::DISCARD => {
                    data.pop();
                }
                op::CLEAR => data.clear(),
                op::PALI => match data.pop().unwrap_or(Value::None) {
                    Value::Paragraph(id) => {
                        call_stack.push((par, ip, env.clone()));
                        par = id;
                        ip = 0;
                        env = env.child();
                    }
                    _ => {
                        data.clear();
                        data.push(Value::None);
                    }
                },
                op::PANA => {
                    let result = data.pop().unwrap_or(Value::None);
                    data.clear();
                    data.push(result);
                    match call_stack.pop() {
                        Some((caller_par, caller_ip, caller_env)) => {
                            par = caller_par;
                            ip = caller_ip;
                            env = caller_env;
                        }
                        None => break,
                    }
                }
                op::LUKIN => {
                    let first = data.pop().unwrap_or(Value::None);
                    let line = match &first {
                        Value::File(handle) if crate::value::is_open_readable(handle) => {
                            crate::value::read_line(handle)
                        }
                        _ => read_stdin_line(),
                    };
                    data.clear();
                    data.push(Value::Str(Rc::new(line)));
                }
                op::SITELEN => {
                    let first = data.pop().unwrap_or(Value::None);
                    let arg = data.pop();
                    let text = represent_owned(&first);
                    match arg {
                        Some(Value::File(handle)) if crate::value::is_open_writable(&handle) => {
                            crate::value::write_text(&handle, &text);
                        }
                        _ => {
                            print!("{text}");
                            let _ = io::stdout().flush();
                        }
                    }
                    data.clear();
                    data.push(Value::None);
                }
                op::KIPISI => {
                    let first = data.pop().unwrap_or(Value::None);
                    let result = match first {
                        Value::Str(s) => {
                            let start = match data.pop() {
                                Some(Value::Int(n)) => n,
                                _ => 0,
                            };
                            let stop = match data.pop() {
                                Some(Value::Int(n)) => Some(n),
                                _ => None,
                            };
                            Value::Str(Rc::new(clamp_slice(&s, Some(start), stop)))
                        }
                        _ => Value::None,
                    };
                    data.clear();
                    data.push(result);
                }
                op::OPEN => {
                    let first = data.pop().unwrap_or(Value::None);
                    let mode = data.pop();
                    let result = match (first, mode) {
                        (Value::Str(path), Some(Value::Str(m))) if &*m == "sitelen" => {
                            open_write(&path)
                        }
                        (Value::Str(path), _) => open_read(&path),
                        _ => Value::None,
                    };
                    data.clear();
                    data.push(result);
                }
                op::PINI => {
                    if let Some(Value::File(handle)) = data.pop() {
                        crate::value::close(&handle);
                    }
                    data.clear();
                    data.push(Value::None);
                }
                other => {
                    return Err(VmError::UnknownOpcode {
                        paragraph: par,
                        ip: opcode_ip,
                        byte: other,
                    })
                }
            }
        } else {
            match byte & format::LENCODE_MASK {
                format::LEN_INT => {
                    let length = byte & format::LENGTH_MASK;
                    let n = read_operand(code, &mut ip, length, par, opcode_ip)?;
                    data.push(Value::Int(n as i64));
                }
                format::LEN_STR => {
                    let length_len = byte & format::LENGTH_MASK;
                    let length = read_operand(code, &mut ip, length_len, par, opcode_ip)? as usize;
                    let bytes = code
                        .get(ip..ip + length)
                        .ok_or(VmError::Truncated { paragraph: par, ip })?;
                    let s = String::from_utf8_lossy(bytes).into_owned();
                    ip += length;
                    data.push(Value::Str(Rc::new(s)));
                }
                format::LEN_JMP => {
                    let length = byte & format::LENGTH_MASK;
                    let distance = read_operand(code, &mut ip, length, par, opcode_ip)?;
                    ip += distance as usize;
                }
                format::LEN_JEZ => {
                    let length = byte & format::LENGTH_MASK;
                    let distance = read_operand(code, &mut ip, length, par, opcode_ip)?;
                    let pred = data.pop().unwrap_or(Value::None);
                    if !pred.is_truthy() {
                        ip += distance as usize;
                    }
                }
                other => {
                    return Err(VmError::UnknownLencode {
                        paragraph: par,
                        ip: opcode_ip,
                        code: other,
                    })
                }
            }
        }
    }

    log::debug!("executed {instructions} instruction(s)");
    Ok(data.pop().unwrap_or(Value::None))
}

fn read_operand(
    code: &[u8],
    ip: &mut usize,
    width: u8,
    paragraph: u32,
    opcode_ip: usize,
) -> Result<u64, VmError> {
    let width = width as usize;
    let slice = code.get(*ip..*ip + width).ok_or(VmError::Truncated {
        paragraph,
        ip: opcode_ip,
    })?;
    *ip += width;
    Ok(slice.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

fn concat(b: Value, a: Value) -> Value {
    match (b, a) {
        (Value::Int(b), Value::Int(a)) => Value::Int(b.wrapping_add(a)),
        (Value::Str(b), Value::Str(a)) => Value::Str(Rc::new(format!("{b}{a}"))),
        _ => Value::None,
    }
}

fn index(b: Value, a: Value) -> Value {
    match (a, b) {
        (a, Value::Table(t)) => t
            .borrow()
            .entries
            .get(&Key::from(a))
            .cloned()
            .unwrap_or(Value::None),
        (Value::Int(i), Value::Str(s)) => {
            if i >= 0 && (i as usize) < s.chars().count() {
                s.chars().nth(i as usize).map(|c| Value::Str(Rc::new(c.to_string()))).unwrap_or(Value::None)
            } else {
                Value::None
            }
        }
        _ => Value::None,
    }
}

/// `clamp(i, 0, len)` for the start index, `clamp(max(j, start), 0, len)`
/// for the stop index — the canonical formula spec's §8 testable property
/// requires both the walker and this VM to agree on; see
/// `nasin_runtime::walker::clamp_slice` for the sibling implementation.
fn clamp_slice(s: &str, start: Option<i64>, stop: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = start.unwrap_or(0).clamp(0, len);
    let stop = stop.unwrap_or(len).max(start).clamp(0, len);
    chars[start as usize..stop as usize].iter().collect()
}

fn open_read(path: &str) -> Value {
    match std::fs::File::open(path) {
        Ok(file) => Value::File(Rc::new(RefCell::new(FileHandle {
            mode: Some(FileMode::Read(io::BufReader::new(file))),
        }))),
        Err(_) => Value::None,
    }
}

fn open_write(path: &str) -> Value {
    match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(file) => Value::File(Rc::new(RefCell::new(FileHandle {
            mode: Some(FileMode::Write(file)),
        }))),
        Err(_) => Value::None,
    }
}

/// Mirrors Python's `input() + '\n'`: the trailing delimiter is stripped
/// and unconditionally replaced with a single `\n`; an empty string means
/// true EOF (no `EOFError`-style signal exists on this side).
fn read_stdin_line() -> String {
    let mut buf = String::new();
    match io::stdin().lock().read_line(&mut buf) {
        Ok(0) => String::new(),
        Ok(_) => {
            while buf.ends_with('\n') || buf.ends_with('\r') {
                buf.pop();
            }
            buf.push('\n');
            buf
        }
        Err(_) => String::new(),
    }
}
