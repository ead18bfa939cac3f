#![allow(dead_code)]

use std::cell::Cell;

use a64_bridge::{
    BridgeConfig, CodeSimulatorArm64, ExecutionContext, MethodHandle, MirrorClass, MirrorObject,
    QuickEntryPoints, RuntimeService,
};
use a64_sim::encode::Assembler;
use anyhow::{Context, Result};

pub const CODE_BASE: u64 = 0x40_0000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

thread_local! {
    static SUSPENDS: Cell<u32> = const { Cell::new(0) };
    static ALLOCATED: Cell<i64> = const { Cell::new(0) };
}

pub fn suspend_checks() -> u32 {
    SUSPENDS.with(Cell::take)
}

/// Total array elements allocated on this thread.
pub fn allocated_elements() -> i64 {
    ALLOCATED.with(Cell::take)
}

extern "C" fn test_suspend() {
    SUSPENDS.with(|n| n.set(n.get() + 1));
}

extern "C" fn alloc_object(class: *mut MirrorClass) -> *mut MirrorObject {
    (class as usize | 0x1) as *mut MirrorObject
}

fn alloc_array(shift: u32, class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    ALLOCATED.with(|n| n.set(n.get() + i64::from(length)));
    ((class as usize) << shift) as *mut MirrorObject
}

extern "C" fn alloc_array8(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(0, class, length)
}

extern "C" fn alloc_array16(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(1, class, length)
}

extern "C" fn alloc_array32(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(2, class, length)
}

extern "C" fn alloc_array64(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(3, class, length)
}

pub fn entry_points() -> QuickEntryPoints {
    QuickEntryPoints {
        test_suspend,
        alloc_object_initialized: alloc_object,
        alloc_array_resolved8: alloc_array8,
        alloc_array_resolved16: alloc_array16,
        alloc_array_resolved32: alloc_array32,
        alloc_array_resolved64: alloc_array64,
    }
}

pub struct Method {
    pub name: &'static str,
}

impl MethodHandle for Method {
    fn address(&self) -> u64 {
        self as *const Self as usize as u64
    }

    fn pretty_method(&self) -> String {
        self.name.to_string()
    }

    fn quick_code(&self) -> Option<u64> {
        Some(CODE_BASE)
    }
}

pub struct Thread;

impl ExecutionContext for Thread {
    fn address(&self) -> u64 {
        self as *const Self as usize as u64
    }

    fn is_gc_marking(&self) -> bool {
        false
    }
}

pub fn bridge(config: BridgeConfig) -> Result<CodeSimulatorArm64> {
    CodeSimulatorArm64::new(config, &entry_points()).context("create code simulator")
}

pub fn service(bridge: &CodeSimulatorArm64, service: RuntimeService) -> Result<u64> {
    bridge
        .interceptor()
        .table()
        .address_of(service)
        .with_context(|| format!("no address for {}", service.name()))
}

pub fn load(bridge: &mut CodeSimulatorArm64, asm: Assembler) -> Result<()> {
    bridge
        .simulator_mut()
        .mem_mut()
        .map_with(CODE_BASE, &asm.finish())
        .context("map compiled code")
}
