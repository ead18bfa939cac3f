use a64_sim::SimError;
use thiserror::Error;

use crate::abi::InstructionSet;
use crate::entrypoints::RuntimeService;
use crate::shorty::RegClass;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failures of the call bridge.
///
/// None of these are recoverable: they are precondition violations (bad
/// configuration, methods without compiled code, signatures the marshaller
/// cannot express) and the embedding is expected to abort on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("code simulation is not available for {0:?}")]
    UnsupportedIsa(InstructionSet),

    #[error("the A64 simulator requires a 64-bit host")]
    UnsupportedHost,

    #[error("invalid shorty {shorty:?}: {reason}")]
    InvalidShorty {
        shorty: String,
        reason: &'static str,
    },

    #[error("no compiled code available for {method}")]
    NoCompiledCode { method: String },

    #[error(
        "argument {index} needs a {class:?} register past the budget; stack-passed arguments are not supported"
    )]
    RegisterSpill { index: usize, class: RegClass },

    #[error("argument buffer holds {available} words but the signature needs at least {needed}")]
    ArgumentBufferTooShort { needed: usize, available: usize },

    #[error("entry points {first:?} and {second:?} share address {addr:#x}")]
    DuplicateEntryPoint {
        first: RuntimeService,
        second: RuntimeService,
        addr: u64,
    },

    #[error(transparent)]
    Sim(#[from] SimError),
}
