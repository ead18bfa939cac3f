//! Fixed register roles and frame geometry of the target invoke ABI.
//!
//! Everything that names a register by number goes through this table: the
//! marshaller, the interceptor's native adapters and the facade's result
//! extraction.

use std::ops::RangeInclusive;

/// `ArtMethod*` of the callee on entry.
pub const METHOD_REG: u8 = 0;
/// Integer/reference return value, and first runtime-service argument.
pub const RETURN_REG: u8 = 0;
/// Floating-point return value (`s0`/`d0`).
pub const FP_RETURN_REG: u8 = 0;
/// `JValue*` result slot handed through by the invoke stub.
pub const RESULT_PTR_REG: u8 = 4;
/// Shorty string pointer handed through by the invoke stub.
pub const SHORTY_PTR_REG: u8 = 5;
/// Holds the current execution-context (thread) pointer.
pub const SELF_REG: u8 = 19;
/// Marking register: non-zero while the collector is marking.
pub const MR_REG: u8 = 20;
pub const FP_REG: u8 = 29;
pub const LR_REG: u8 = 30;
pub const SP_REG: u8 = 31;

/// Callee-saved registers above x19/x20 that the invoke frame preserves.
pub const CALLEE_SAVED_TAIL: RangeInclusive<u8> = 20..=28;

/// x0 carries the method, so integer arguments start at x1.
pub const FIRST_GPR_ARG: u8 = 1;
pub const FIRST_FPR_ARG: u8 = 0;
/// Eight argument registers per class (x0-x7, d0-d7).
pub const ARG_REGS_PER_CLASS: u8 = 8;

/// Runtime-service argument registers, in order.
pub const RUNTIME_ARG_REGS: [u8; 2] = [0, 1];

pub const X_REG_SIZE: u64 = 8;
/// Argument buffers are packed in 32-bit virtual-register words.
pub const VREG_SIZE: u64 = 4;
pub const STACK_ALIGNMENT: u64 = 16;

/// x4, x5, x19..x28, SP, LR and FP.
pub const SAVED_REG_COUNT: usize = 15;
pub const SAVED_REGS_SIZE: u64 = X_REG_SIZE * SAVED_REG_COUNT as u64;

/// Instruction sets a code simulator could be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionSet {
    Arm,
    Arm64,
    Riscv64,
    X86,
    X86_64,
}

/// The simulator is only built and tested for 64-bit hosts.
pub const HOST_IS_64_BIT: bool = cfg!(target_pointer_width = "64");

pub const fn align_down(value: u64, alignment: u64) -> u64 {
    value & !(alignment - 1)
}
