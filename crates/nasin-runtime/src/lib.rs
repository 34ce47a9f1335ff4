//! Value model, environments and tree-walking interpreter for Nasin.

pub mod env;
pub mod value;
pub mod walker;

pub use env::Env;
pub use value::Value;
pub use walker::walk_program;
