#![forbid(unsafe_code)]

//! Instruction-level A64 (ARM64) simulator.
//!
//! The crate is centered on [`interp::Simulator`], which owns the architectural
//! register file ([`state::CpuState`]) and a sparse little-endian memory
//! ([`mem::SparseMemory`]) holding code, literal pools and the simulated stack.
//!
//! Every indirect branch (`BR`, `BLR`) is offered to a [`hook::BranchHook`]
//! before it executes. Embedders use this seam to service selected branch
//! targets on the host instead of simulating them.

mod error;

pub mod config;
pub mod decode;
pub mod encode;
pub mod hook;
pub mod interp;
pub mod mem;
pub mod state;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use hook::{BranchHook, BranchKind, BranchSite, HookAction, NoHook};
pub use interp::{RunStats, Simulator, StepExit};
pub use mem::{SimBus, SparseMemory};
pub use state::{CpuState, Nzcv, Reg31, END_OF_SIM_ADDRESS};
