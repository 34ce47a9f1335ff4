use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A literal string/int, jump distance or table length overflowed the
    /// 3-bit `NNN` field (max 7 bytes, so at most a 2^56-1 magnitude). No
    /// grammatical literal in the language can reach this in practice, but
    /// `tin/compiler.py` asserts the same bound rather than assuming it.
    #[error("{what} encodes to {bytes} bytes, more than the 7-byte immediate field holds")]
    ImmediateTooLarge { what: &'static str, bytes: usize },
}
