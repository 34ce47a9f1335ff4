//! Binary bytecode format and compiler for the Nasin language (spec §4.4).
//!
//! [`format`] defines the self-describing wire format shared by the
//! compiler and the VM; [`compiler`] turns a parsed [`nasin_syntax::ast::Paragraph`]
//! into a [`format::Module`] ready to [`format::Module::encode`].

pub mod compiler;
pub mod error;
pub mod format;

pub use compiler::compile;
pub use error::CompileError;
pub use format::{FormatError, Header, Module};
