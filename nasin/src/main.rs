//! Command-line driver for Nasin: parse a source file, optionally walk it
//! with the tree-walking interpreter, optionally compile it (or load an
//! already-compiled file) and run it on the stack VM.
//!
//! Out of scope per spec.md §1 ("external collaborators"), but still
//! implemented here rather than left a stub, since §6 fully specifies its
//! flags and §9's resolved open question requires `-r` actually run a
//! program instead of the Python original's `raise NotImplementedError()`.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use nasin_bytecode::Module;

/// Parser, tree-walking interpreter and bytecode VM for Nasin.
#[derive(Parser, Debug)]
#[command(name = "nasin", version, about)]
struct Cli {
    /// Source file to parse.
    #[arg(short = 's', value_name = "PATH")]
    source: Option<PathBuf>,

    /// Bytecode file: read from it when no `-s` is given, otherwise write
    /// the compiled program to it.
    #[arg(short = 'b', value_name = "PATH")]
    bytecode: Option<PathBuf>,

    /// Walk the source with the tree-walking interpreter (requires `-s`).
    #[arg(short = 'w')]
    walk: bool,

    /// Compile-and-run the source, or execute the bytecode file (requires
    /// `-s` or `-b`).
    #[arg(short = 'r')]
    run: bool,

    /// Everything after `--` is delivered to the program as its argv table.
    #[arg(last = true)]
    program_args: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.walk && cli.run {
        bail!("-w and -r cannot be combined");
    }
    if cli.walk && cli.source.is_none() {
        bail!("-w requires -s");
    }
    if cli.run && cli.source.is_none() && cli.bytecode.is_none() {
        bail!("-r requires -s or -b");
    }

    match &cli.source {
        Some(source_path) => run_from_source(&cli, source_path),
        None => match &cli.bytecode {
            Some(bytecode_path) => run_from_bytecode(&cli, bytecode_path),
            None => bail!("nothing to do: pass -s or -b"),
        },
    }
}

fn run_from_source(cli: &Cli, source_path: &PathBuf) -> Result<()> {
    let source = fs::read_to_string(source_path)
        .with_context(|| format!("reading {}", source_path.display()))?;
    let ast = nasin_syntax::parse(&source).map_err(|e| anyhow::anyhow!("{e}"))?;
    let ast = Rc::new(ast);

    let module = if cli.bytecode.is_some() || cli.run {
        let module = nasin_bytecode::compile(&ast).context("compiling bytecode")?;
        log::debug!(
            "compiled {} paragraph(s), var_len={} adr_len={} par_len={}",
            module.paragraph_count(),
            module.header.var_len,
            module.header.adr_len,
            module.header.par_len
        );
        Some(module)
    } else {
        None
    };

    if let Some(bytecode_path) = &cli.bytecode {
        let module = module.as_ref().expect("compiled above when -b is set");
        fs::write(bytecode_path, module.encode())
            .with_context(|| format!("writing {}", bytecode_path.display()))?;
    }

    if cli.walk {
        let args = runtime_args_table(&cli.program_args);
        let result = nasin_runtime::walk_program(&ast, args);
        println!("Program exited with {}", nasin_runtime::value::debug_repr(&result));
    } else if cli.run {
        let module = module.as_ref().expect("compiled above when -r is set");
        let args = vm_args_table(&cli.program_args);
        let result = nasin_vm::run(module, args).context("running bytecode")?;
        println!("Program exited with {}", nasin_vm::value::debug_repr(&result));
    }

    Ok(())
}

fn run_from_bytecode(cli: &Cli, bytecode_path: &PathBuf) -> Result<()> {
    let bytes = fs::read(bytecode_path)
        .with_context(|| format!("reading {}", bytecode_path.display()))?;
    let module = Module::decode(&bytes).map_err(|e| anyhow::anyhow!("{e}"))?;
    log::debug!(
        "loaded {} paragraph(s), var_len={} adr_len={} par_len={}",
        module.paragraph_count(),
        module.header.var_len,
        module.header.adr_len,
        module.header.par_len
    );

    if cli.run {
        let args = vm_args_table(&cli.program_args);
        let result = nasin_vm::run(&module, args).context("running bytecode")?;
        println!("Program exited with {}", nasin_vm::value::debug_repr(&result));
    }

    Ok(())
}

/// The table bound as the root paragraph's first formal parameter: 0-based
/// integer keys, string values (spec §6).
fn runtime_args_table(args: &[String]) -> nasin_runtime::Value {
    use nasin_runtime::value::{Key, Table, Value};
    use std::cell::RefCell;

    let mut table = Table::default();
    for (i, arg) in args.iter().enumerate() {
        table.entries.insert(
            Key::from(Value::Int(i as i64)),
            Value::Str(Rc::new(arg.clone())),
        );
    }
    Value::Table(Rc::new(RefCell::new(table)))
}

fn vm_args_table(args: &[String]) -> nasin_vm::Value {
    use nasin_vm::value::{Key, Table, Value};
    use std::cell::RefCell;

    let mut table = Table::default();
    for (i, arg) in args.iter().enumerate() {
        table.entries.insert(
            Key::from(Value::Int(i as i64)),
            Value::Str(Rc::new(arg.clone())),
        );
    }
    Value::Table(Rc::new(RefCell::new(table)))
}
