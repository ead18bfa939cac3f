//! Types the bridge consumes from the managed runtime.
//!
//! The bridge never looks inside a method, thread, class or object. It only
//! needs their addresses to hand through registers, plus the handful of
//! queries below.

/// A compiled managed method.
pub trait MethodHandle {
    /// Address stored into x0 (the callee's method pointer).
    fn address(&self) -> u64;

    /// Human-readable fully-qualified name, e.g. `other.TestByte.testDotProdSimple`.
    fn pretty_method(&self) -> String;

    /// Entry address of the method's compiled A64 code in simulated memory.
    fn quick_code(&self) -> Option<u64>;

    fn is_abstract(&self) -> bool {
        false
    }

    fn is_native(&self) -> bool {
        false
    }
}

/// The runtime thread a simulated call executes on behalf of.
pub trait ExecutionContext {
    /// Address stored into the self register.
    fn address(&self) -> u64;

    /// Whether the concurrent collector is currently marking.
    fn is_gc_marking(&self) -> bool;
}

/// Untyped 64-bit return-value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JValue {
    raw: u64,
}

impl JValue {
    pub fn from_raw(raw: u64) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }

    pub fn set_j(&mut self, v: i64) {
        self.raw = v as u64;
    }

    pub fn j(&self) -> i64 {
        self.raw as i64
    }

    pub fn set_i(&mut self, v: i32) {
        self.raw = u64::from(v as u32);
    }

    pub fn i(&self) -> i32 {
        self.raw as u32 as i32
    }

    pub fn set_z(&mut self, v: bool) {
        self.raw = u64::from(v);
    }

    pub fn z(&self) -> bool {
        self.raw as u8 != 0
    }

    pub fn set_f(&mut self, v: f32) {
        self.raw = u64::from(v.to_bits());
    }

    pub fn f(&self) -> f32 {
        f32::from_bits(self.raw as u32)
    }

    pub fn set_d(&mut self, v: f64) {
        self.raw = v.to_bits();
    }

    pub fn d(&self) -> f64 {
        f64::from_bits(self.raw)
    }
}

/// Opaque runtime class.
#[repr(C)]
pub struct MirrorClass {
    _opaque: [u8; 0],
}

/// Opaque runtime object.
#[repr(C)]
pub struct MirrorObject {
    _opaque: [u8; 0],
}

pub type TestSuspendFn = extern "C" fn();
pub type AllocObjectFn = extern "C" fn(*mut MirrorClass) -> *mut MirrorObject;
pub type AllocArrayFn = extern "C" fn(*mut MirrorClass, i32) -> *mut MirrorObject;

/// The runtime's quick entry-point table, restricted to the services that
/// simulated code may branch to.
#[derive(Debug, Clone, Copy)]
pub struct QuickEntryPoints {
    pub test_suspend: TestSuspendFn,
    pub alloc_object_initialized: AllocObjectFn,
    pub alloc_array_resolved8: AllocArrayFn,
    pub alloc_array_resolved16: AllocArrayFn,
    pub alloc_array_resolved32: AllocArrayFn,
    pub alloc_array_resolved64: AllocArrayFn,
}
