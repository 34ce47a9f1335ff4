use thiserror::Error;

/// Faults a malformed or out-of-range bytecode file can trigger. The
/// source VM (`tin/virtual_machine.py`) has no equivalent — it just raises
/// an uncaught `ValueError` and crashes the Python process. Spec's
/// fallback rule ("runtime type fallbacks must not raise") only covers
/// *program*-level type mismatches, which this VM handles by falling back
/// to `None` exactly as the source does; these errors are reserved for
/// bytecode that could not have come from this crate's own compiler.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("paragraph {paragraph} ip {ip}: unknown opcode 0x{byte:02x}")]
    UnknownOpcode { paragraph: u32, ip: usize, byte: u8 },
    #[error("paragraph {paragraph} ip {ip}: truncated instruction")]
    Truncated { paragraph: u32, ip: usize },
    #[error("paragraph {paragraph} ip {ip}: unknown lencode 0x{code:02x}")]
    UnknownLencode { paragraph: u32, ip: usize, code: u8 },
    #[error("paragraph index {0} out of range")]
    UnknownParagraph(u32),
}
