//! Interception seam for indirect branches.
//!
//! The interpreter offers every `BR`/`BLR` to a [`BranchHook`] before executing
//! it. The hook either declines, in which case the branch executes with its
//! architectural semantics, or takes over and names where simulation resumes.

use crate::state::CpuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// `BR Xn`: indirect jump, LR untouched.
    Br,
    /// `BLR Xn`: indirect call, LR receives the next instruction address.
    Blr,
    /// `RET Xn`: never offered to a hook.
    Ret,
}

/// An indirect branch that is about to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchSite {
    pub kind: BranchKind,
    /// Address of the branch instruction itself.
    pub pc: u64,
    /// Value of the target register.
    pub target: u64,
    /// Address of the instruction following the branch.
    pub next_pc: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Execute the branch normally.
    Decline,
    /// The branch was handled; continue simulation at this address.
    Redirect(u64),
}

pub trait BranchHook {
    fn on_branch(&mut self, site: BranchSite, state: &mut CpuState) -> HookAction;
}

/// Hook that never intercepts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl BranchHook for NoHook {
    fn on_branch(&mut self, _site: BranchSite, _state: &mut CpuState) -> HookAction {
        HookAction::Decline
    }
}

impl<H: BranchHook + ?Sized> BranchHook for &mut H {
    fn on_branch(&mut self, site: BranchSite, state: &mut CpuState) -> HookAction {
        (**self).on_branch(site, state)
    }
}
