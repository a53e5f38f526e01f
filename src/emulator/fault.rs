use thiserror::Error;

/// Something a program did that real hardware would not define.
///
/// Faults never stop the emulator: the offending effect is skipped,
/// the fault is logged and the next cycle runs as usual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown opcode {opcode:#06x} at {pc:#05x}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("return with an empty call stack at {pc:#05x}")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds at {address:#06x}")]
    MemoryOutOfBounds { address: usize },

    #[error("program counter {pc:#06x} is outside of memory")]
    ProgramCounterOutOfBounds { pc: u16 },

    #[error("program is too large ({size} bytes), at most {max} bytes fit")]
    RomTooLarge { size: usize, max: usize },
}
