use bitflags::bitflags;

/// Return address installed in LR by [`CpuState::reset`].
///
/// `Simulator::run_from` stops as soon as the PC reaches this value, so a
/// `RET` from the outermost simulated frame ends the run.
pub const END_OF_SIM_ADDRESS: u64 = 0;

pub const NUM_X_REGS: usize = 31;
pub const NUM_V_REGS: usize = 32;
pub const LINK_REG: u8 = 30;
pub const FRAME_REG: u8 = 29;
pub const ZR_OR_SP: u8 = 31;

bitflags! {
    /// The NZCV condition flags, in their PSTATE bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Nzcv: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
    }
}

/// How register number 31 is interpreted by an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg31 {
    ZeroRegister,
    StackPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq = 0,
    Ne = 1,
    Hs = 2,
    Lo = 3,
    Mi = 4,
    Pl = 5,
    Vs = 6,
    Vc = 7,
    Hi = 8,
    Ls = 9,
    Ge = 10,
    Lt = 11,
    Gt = 12,
    Le = 13,
    Al = 14,
    Nv = 15,
}

impl Cond {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0 => Cond::Eq,
            1 => Cond::Ne,
            2 => Cond::Hs,
            3 => Cond::Lo,
            4 => Cond::Mi,
            5 => Cond::Pl,
            6 => Cond::Vs,
            7 => Cond::Vc,
            8 => Cond::Hi,
            9 => Cond::Ls,
            10 => Cond::Ge,
            11 => Cond::Lt,
            12 => Cond::Gt,
            13 => Cond::Le,
            14 => Cond::Al,
            _ => Cond::Nv,
        }
    }
}

/// Architectural A64 register file.
///
/// Only the state the interpreter models is kept here: general registers,
/// SP, PC, NZCV and the 128-bit vector registers. Everything is plain data so
/// two states can be compared with `==`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    x: [u64; NUM_X_REGS],
    sp: u64,
    pc: u64,
    nzcv: Nzcv,
    v: [u128; NUM_V_REGS],
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CpuState {
    pub fn new(stack_top: u64) -> Self {
        let mut state = Self {
            x: [0; NUM_X_REGS],
            sp: 0,
            pc: 0,
            nzcv: Nzcv::empty(),
            v: [0; NUM_V_REGS],
        };
        state.reset(stack_top);
        state
    }

    /// Clear all registers and flags back to the baseline a fresh run starts from.
    pub fn reset(&mut self, stack_top: u64) {
        self.x = [0; NUM_X_REGS];
        self.v = [0; NUM_V_REGS];
        self.nzcv = Nzcv::empty();
        self.pc = 0;
        self.sp = stack_top;
        self.x[LINK_REG as usize] = END_OF_SIM_ADDRESS;
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u64 {
        self.sp
    }

    pub fn set_sp(&mut self, sp: u64) {
        self.sp = sp;
    }

    pub fn lr(&self) -> u64 {
        self.x[LINK_REG as usize]
    }

    pub fn set_lr(&mut self, lr: u64) {
        self.x[LINK_REG as usize] = lr;
    }

    pub fn fp(&self) -> u64 {
        self.x[FRAME_REG as usize]
    }

    pub fn nzcv(&self) -> Nzcv {
        self.nzcv
    }

    pub fn set_nzcv(&mut self, nzcv: Nzcv) {
        self.nzcv = nzcv;
    }

    pub fn reg(&self, n: u8, r31: Reg31) -> u64 {
        match (n, r31) {
            (ZR_OR_SP, Reg31::StackPointer) => self.sp,
            (ZR_OR_SP, Reg31::ZeroRegister) => 0,
            _ => self.x[usize::from(n)],
        }
    }

    pub fn set_reg(&mut self, n: u8, val: u64, r31: Reg31) {
        match (n, r31) {
            (ZR_OR_SP, Reg31::StackPointer) => self.sp = val,
            (ZR_OR_SP, Reg31::ZeroRegister) => {}
            _ => self.x[usize::from(n)] = val,
        }
    }

    /// Read `Xn`, with register 31 reading as zero.
    pub fn x(&self, n: u8) -> u64 {
        self.reg(n, Reg31::ZeroRegister)
    }

    pub fn set_x(&mut self, n: u8, val: u64) {
        self.set_reg(n, val, Reg31::ZeroRegister);
    }

    pub fn w(&self, n: u8) -> u32 {
        self.x(n) as u32
    }

    /// Writes to a W register clear the upper 32 bits of the X register.
    pub fn set_w(&mut self, n: u8, val: u32) {
        self.set_x(n, u64::from(val));
    }

    pub fn q(&self, n: u8) -> u128 {
        self.v[usize::from(n)]
    }

    pub fn set_q(&mut self, n: u8, val: u128) {
        self.v[usize::from(n)] = val;
    }

    pub fn d_bits(&self, n: u8) -> u64 {
        self.v[usize::from(n)] as u64
    }

    /// Scalar writes zero the remainder of the vector register.
    pub fn set_d_bits(&mut self, n: u8, bits: u64) {
        self.v[usize::from(n)] = u128::from(bits);
    }

    pub fn s_bits(&self, n: u8) -> u32 {
        self.v[usize::from(n)] as u32
    }

    pub fn set_s_bits(&mut self, n: u8, bits: u32) {
        self.v[usize::from(n)] = u128::from(bits);
    }

    pub fn d(&self, n: u8) -> f64 {
        f64::from_bits(self.d_bits(n))
    }

    pub fn set_d(&mut self, n: u8, val: f64) {
        self.set_d_bits(n, val.to_bits());
    }

    pub fn s(&self, n: u8) -> f32 {
        f32::from_bits(self.s_bits(n))
    }

    pub fn set_s(&mut self, n: u8, val: f32) {
        self.set_s_bits(n, val.to_bits());
    }

    pub fn condition_holds(&self, cond: Cond) -> bool {
        let n = self.nzcv.contains(Nzcv::N);
        let z = self.nzcv.contains(Nzcv::Z);
        let c = self.nzcv.contains(Nzcv::C);
        let v = self.nzcv.contains(Nzcv::V);
        match cond {
            Cond::Eq => z,
            Cond::Ne => !z,
            Cond::Hs => c,
            Cond::Lo => !c,
            Cond::Mi => n,
            Cond::Pl => !n,
            Cond::Vs => v,
            Cond::Vc => !v,
            Cond::Hi => c && !z,
            Cond::Ls => !(c && !z),
            Cond::Ge => n == v,
            Cond::Lt => n != v,
            Cond::Gt => !z && n == v,
            Cond::Le => !(!z && n == v),
            Cond::Al | Cond::Nv => true,
        }
    }
}
