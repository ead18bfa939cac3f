use a64_sim::{BranchHook, BranchKind, BranchSite, CpuState, HookAction};

use crate::entrypoints::InterceptionTable;

/// Branch hook that services runtime entry points on the host.
///
/// A `BR` to the suspend check calls the native function and returns to LR,
/// as the thunk's caller expects. A `BLR` to an allocation service calls the
/// native function, places the result in x0 and resumes after the `BLR`.
/// Every other branch executes normally.
#[derive(Debug, Clone)]
pub struct RuntimeInterceptor {
    table: InterceptionTable,
    intercepted: u64,
}

impl RuntimeInterceptor {
    pub fn new(table: InterceptionTable) -> Self {
        Self {
            table,
            intercepted: 0,
        }
    }

    pub fn table(&self) -> &InterceptionTable {
        &self.table
    }

    /// Total runtime calls serviced since construction.
    pub fn intercepted(&self) -> u64 {
        self.intercepted
    }
}

impl BranchHook for RuntimeInterceptor {
    fn on_branch(&mut self, site: BranchSite, state: &mut CpuState) -> HookAction {
        let Some(entry) = self.table.lookup(site.target) else {
            return HookAction::Decline;
        };
        if entry.service.branch_kind() != site.kind {
            return HookAction::Decline;
        }

        let resume = match site.kind {
            BranchKind::Br => state.lr(),
            BranchKind::Blr => site.next_pc,
            BranchKind::Ret => return HookAction::Decline,
        };

        tracing::debug!(
            service = entry.service.name(),
            pc = format_args!("{:#x}", site.pc),
            resume = format_args!("{:#x}", resume),
            "servicing runtime call"
        );
        entry.call.invoke(state);
        self.intercepted += 1;
        HookAction::Redirect(resume)
    }
}
