#![forbid(unsafe_code)]

//! Call bridge between a managed runtime and the A64 simulator.
//!
//! [`CodeSimulatorArm64`] enters compiled A64 methods the way the runtime's
//! native invoke stub would: it lays out the stub's frame on the simulated
//! stack, loads argument registers from the argument buffer and reads the
//! return value back once the method returns. While a method runs, the
//! [`RuntimeInterceptor`] services branches into a small set of runtime entry
//! points (suspend checks and allocations) on the host. A
//! [`SimulationPolicy`] decides which methods are simulated at all.

pub mod abi;
pub mod config;
pub mod entrypoints;
mod error;
pub mod facade;
pub mod intercept;
pub mod marshal;
pub mod policy;
pub mod runtime;
pub mod shorty;

pub use abi::InstructionSet;
pub use config::BridgeConfig;
pub use entrypoints::{InterceptEntry, InterceptionTable, NativeCall, RuntimeService};
pub use error::{BridgeError, Result};
pub use facade::{create_code_simulator, CodeSimulator, CodeSimulatorArm64, InvokeOutcome};
pub use intercept::RuntimeInterceptor;
pub use marshal::{extract_result, pack_arguments, InvokeFrame, SavedFrame};
pub use policy::SimulationPolicy;
pub use runtime::{
    AllocArrayFn, AllocObjectFn, ExecutionContext, JValue, MethodHandle, MirrorClass,
    MirrorObject, QuickEntryPoints, TestSuspendFn,
};
pub use shorty::{RegClass, Shorty, ShortyType};
