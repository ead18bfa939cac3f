use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

/// Failures raised by the A64 simulator itself.
///
/// These surface configuration or programming errors in the simulated code's
/// surroundings (missing mappings, instructions outside the supported subset).
/// Exceptions that the simulated program handles on its own never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("memory fault: addr={addr:#x} len={len}")]
    MemoryFault { addr: u64, len: usize },

    #[error("mapping {base:#x}+{len:#x} overlaps an existing region")]
    MapOverlap { base: u64, len: u64 },

    #[error("unallocated or unsupported encoding {word:#010x} at pc={pc:#x}")]
    Unallocated { pc: u64, word: u32 },

    #[error("brk #{imm:#x} at pc={pc:#x}")]
    Breakpoint { pc: u64, imm: u16 },

    #[error("misaligned pc {pc:#x}")]
    MisalignedPc { pc: u64 },

    #[error("misaligned stack pointer {sp:#x} used as a base register")]
    MisalignedSp { sp: u64 },
}
