//! Runtime services reachable from simulated code, and the native adapters
//! that call them.

use a64_sim::{BranchKind, CpuState};

use crate::abi::{RETURN_REG, RUNTIME_ARG_REGS};
use crate::error::{BridgeError, Result};
use crate::runtime::{
    AllocArrayFn, AllocObjectFn, MirrorClass, QuickEntryPoints, TestSuspendFn,
};
use crate::shorty::ShortyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeService {
    TestSuspend,
    AllocObjectInitialized,
    AllocArrayResolved8,
    AllocArrayResolved16,
    AllocArrayResolved32,
    AllocArrayResolved64,
}

impl RuntimeService {
    pub const ALL: [RuntimeService; 6] = [
        RuntimeService::TestSuspend,
        RuntimeService::AllocObjectInitialized,
        RuntimeService::AllocArrayResolved8,
        RuntimeService::AllocArrayResolved16,
        RuntimeService::AllocArrayResolved32,
        RuntimeService::AllocArrayResolved64,
    ];

    /// How compiled code reaches this service.
    ///
    /// The suspend check is a tail jump out of a thunk (`LDR x16, [..]; BR
    /// x16`) so it returns through LR; allocations are direct `BLR` calls.
    pub fn branch_kind(self) -> BranchKind {
        match self {
            RuntimeService::TestSuspend => BranchKind::Br,
            _ => BranchKind::Blr,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuntimeService::TestSuspend => "pTestSuspend",
            RuntimeService::AllocObjectInitialized => "pAllocObjectInitialized",
            RuntimeService::AllocArrayResolved8 => "pAllocArrayResolved8",
            RuntimeService::AllocArrayResolved16 => "pAllocArrayResolved16",
            RuntimeService::AllocArrayResolved32 => "pAllocArrayResolved32",
            RuntimeService::AllocArrayResolved64 => "pAllocArrayResolved64",
        }
    }
}

/// A host function together with the shape it is called with.
#[derive(Debug, Clone, Copy)]
pub enum NativeCall {
    /// `() -> ()`
    Void0(TestSuspendFn),
    /// `(class) -> object`
    Ref1(AllocObjectFn),
    /// `(class, i32) -> object`
    RefInt2(AllocArrayFn),
}

impl NativeCall {
    pub fn address(&self) -> u64 {
        match *self {
            NativeCall::Void0(f) => f as usize as u64,
            NativeCall::Ref1(f) => f as usize as u64,
            NativeCall::RefInt2(f) => f as usize as u64,
        }
    }

    pub fn params(&self) -> &'static [ShortyType] {
        match self {
            NativeCall::Void0(_) => &[],
            NativeCall::Ref1(_) => &[ShortyType::Reference],
            NativeCall::RefInt2(_) => &[ShortyType::Reference, ShortyType::Int],
        }
    }

    pub fn returns(&self) -> ShortyType {
        match self {
            NativeCall::Void0(_) => ShortyType::Void,
            NativeCall::Ref1(_) | NativeCall::RefInt2(_) => ShortyType::Reference,
        }
    }

    /// Read arguments from the runtime-call registers, call the host function
    /// and write any result back into x0.
    pub fn invoke(&self, state: &mut CpuState) {
        let [arg0, arg1] = RUNTIME_ARG_REGS;
        match *self {
            NativeCall::Void0(f) => f(),
            NativeCall::Ref1(f) => {
                let class = state.x(arg0) as usize as *mut MirrorClass;
                let obj = f(class);
                state.set_x(RETURN_REG, obj as usize as u64);
            }
            NativeCall::RefInt2(f) => {
                let class = state.x(arg0) as usize as *mut MirrorClass;
                let length = state.w(arg1) as i32;
                let obj = f(class, length);
                state.set_x(RETURN_REG, obj as usize as u64);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterceptEntry {
    pub service: RuntimeService,
    pub call: NativeCall,
}

impl InterceptEntry {
    pub fn address(&self) -> u64 {
        self.call.address()
    }
}

/// Branch-target addresses the interceptor services on the host.
#[derive(Debug, Clone)]
pub struct InterceptionTable {
    entries: Vec<InterceptEntry>,
}

impl InterceptionTable {
    /// Build the table, rejecting entry-point tables where two services share
    /// an address (a branch target must identify exactly one service).
    pub fn new(points: &QuickEntryPoints) -> Result<Self> {
        let entries = vec![
            InterceptEntry {
                service: RuntimeService::TestSuspend,
                call: NativeCall::Void0(points.test_suspend),
            },
            InterceptEntry {
                service: RuntimeService::AllocObjectInitialized,
                call: NativeCall::Ref1(points.alloc_object_initialized),
            },
            InterceptEntry {
                service: RuntimeService::AllocArrayResolved8,
                call: NativeCall::RefInt2(points.alloc_array_resolved8),
            },
            InterceptEntry {
                service: RuntimeService::AllocArrayResolved16,
                call: NativeCall::RefInt2(points.alloc_array_resolved16),
            },
            InterceptEntry {
                service: RuntimeService::AllocArrayResolved32,
                call: NativeCall::RefInt2(points.alloc_array_resolved32),
            },
            InterceptEntry {
                service: RuntimeService::AllocArrayResolved64,
                call: NativeCall::RefInt2(points.alloc_array_resolved64),
            },
        ];

        for (i, first) in entries.iter().enumerate() {
            if let Some(second) = entries[i + 1..]
                .iter()
                .find(|e| e.address() == first.address())
            {
                return Err(BridgeError::DuplicateEntryPoint {
                    first: first.service,
                    second: second.service,
                    addr: first.address(),
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, target: u64) -> Option<&InterceptEntry> {
        self.entries.iter().find(|e| e.address() == target)
    }

    pub fn address_of(&self, service: RuntimeService) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.service == service)
            .map(InterceptEntry::address)
    }

    pub fn entries(&self) -> &[InterceptEntry] {
        &self.entries
    }
}
