#![allow(dead_code)]

use std::cell::RefCell;

use a64_bridge::{
    BridgeConfig, CodeSimulatorArm64, ExecutionContext, MethodHandle, MirrorClass, MirrorObject,
    QuickEntryPoints, RuntimeService,
};
use a64_sim::encode::Assembler;

pub const CODE_BASE: u64 = 0x10_0000;
pub const DATA_BASE: u64 = 0x20_0000;
pub const DATA_SIZE: u64 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCall {
    Suspend,
    AllocObject { class: u64 },
    AllocArray { width: u32, class: u64, length: i32 },
}

thread_local! {
    static CALLS: RefCell<Vec<RuntimeCall>> = const { RefCell::new(Vec::new()) };
}

fn record(call: RuntimeCall) {
    CALLS.with(|calls| calls.borrow_mut().push(call));
}

/// Drain the runtime calls made on this thread.
pub fn take_calls() -> Vec<RuntimeCall> {
    CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
}

/// Fake object address an allocation returns.
pub fn object_for(class: u64, width: u32, length: i32) -> u64 {
    class + 0x1_0000 * u64::from(width) + length as u64
}

extern "C" fn test_suspend() {
    record(RuntimeCall::Suspend);
}

extern "C" fn alloc_object_initialized(class: *mut MirrorClass) -> *mut MirrorObject {
    let class = class as usize as u64;
    record(RuntimeCall::AllocObject { class });
    object_for(class, 0, 0) as usize as *mut MirrorObject
}

fn alloc_array(width: u32, class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    let class = class as usize as u64;
    record(RuntimeCall::AllocArray {
        width,
        class,
        length,
    });
    object_for(class, width, length) as usize as *mut MirrorObject
}

extern "C" fn alloc_array_resolved8(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(8, class, length)
}

extern "C" fn alloc_array_resolved16(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(16, class, length)
}

extern "C" fn alloc_array_resolved32(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(32, class, length)
}

extern "C" fn alloc_array_resolved64(class: *mut MirrorClass, length: i32) -> *mut MirrorObject {
    alloc_array(64, class, length)
}

pub fn entry_points() -> QuickEntryPoints {
    QuickEntryPoints {
        test_suspend,
        alloc_object_initialized,
        alloc_array_resolved8,
        alloc_array_resolved16,
        alloc_array_resolved32,
        alloc_array_resolved64,
    }
}

pub struct TestMethod {
    pub name: String,
    pub code: Option<u64>,
    pub native: bool,
}

impl TestMethod {
    pub fn compiled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            code: Some(CODE_BASE),
            native: false,
        }
    }
}

impl MethodHandle for TestMethod {
    fn address(&self) -> u64 {
        self as *const Self as usize as u64
    }

    fn pretty_method(&self) -> String {
        self.name.clone()
    }

    fn quick_code(&self) -> Option<u64> {
        self.code
    }

    fn is_native(&self) -> bool {
        self.native
    }
}

pub struct TestThread {
    pub marking: bool,
}

impl ExecutionContext for TestThread {
    fn address(&self) -> u64 {
        self as *const Self as usize as u64
    }

    fn is_gc_marking(&self) -> bool {
        self.marking
    }
}

/// A bridge with a scratch data page mapped at [`DATA_BASE`].
pub fn new_bridge() -> CodeSimulatorArm64 {
    let mut bridge = CodeSimulatorArm64::new(BridgeConfig::default(), &entry_points())
        .expect("create bridge");
    bridge
        .simulator_mut()
        .mem_mut()
        .map(DATA_BASE, DATA_SIZE)
        .expect("map data");
    bridge
}

/// Map assembled code at [`CODE_BASE`].
pub fn load_code(bridge: &mut CodeSimulatorArm64, asm: Assembler) {
    bridge
        .simulator_mut()
        .mem_mut()
        .map_with(CODE_BASE, &asm.finish())
        .expect("map code");
}

pub fn service_addr(bridge: &CodeSimulatorArm64, service: RuntimeService) -> u64 {
    bridge
        .interceptor()
        .table()
        .address_of(service)
        .expect("service address")
}

pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
