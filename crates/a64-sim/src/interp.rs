use crate::config::SimConfig;
use crate::decode::{decode, FpOp, Inst, LiteralKind, LogicOp, MovOp, PairMode, Shift};
use crate::error::{Result, SimError};
use crate::hook::{BranchHook, BranchKind, BranchSite, HookAction};
use crate::mem::{SimBus, SparseMemory};
use crate::state::{CpuState, Nzcv, Reg31, END_OF_SIM_ADDRESS, ZR_OR_SP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepExit {
    Continue,
    /// A branch hook took over an indirect branch.
    Intercepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub instructions: u64,
    pub interceptions: u64,
}

/// A64 interpreter: architectural state plus the memory it runs against.
#[derive(Debug, Clone)]
pub struct Simulator {
    state: CpuState,
    mem: SparseMemory,
    config: SimConfig,
}

impl Simulator {
    /// Create a simulator with its stack region mapped and state reset.
    pub fn new(config: SimConfig) -> Result<Self> {
        let mut mem = SparseMemory::new();
        mem.map(config.stack_base, config.stack_size as u64)?;
        Ok(Self {
            state: CpuState::new(config.stack_top()),
            mem,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stack_top(&self) -> u64 {
        self.config.stack_top()
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn mem(&self) -> &SparseMemory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut SparseMemory {
        &mut self.mem
    }

    /// Split borrow used by callers that write registers and stack together.
    pub fn parts_mut(&mut self) -> (&mut CpuState, &mut SparseMemory) {
        (&mut self.state, &mut self.mem)
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.config.trace = trace;
    }

    /// Return every register and flag to the post-construction baseline.
    pub fn reset_state(&mut self) {
        self.state.reset(self.config.stack_top());
    }

    /// Run from `entry` until control returns to [`END_OF_SIM_ADDRESS`].
    pub fn run_from(&mut self, entry: u64, hook: &mut dyn BranchHook) -> Result<RunStats> {
        self.state.set_pc(entry);
        self.run(hook)
    }

    pub fn run(&mut self, hook: &mut dyn BranchHook) -> Result<RunStats> {
        let mut stats = RunStats::default();
        while self.state.pc() != END_OF_SIM_ADDRESS {
            match self.step(hook)? {
                StepExit::Continue => {}
                StepExit::Intercepted => stats.interceptions += 1,
            }
            stats.instructions += 1;
        }
        Ok(stats)
    }

    pub fn step(&mut self, hook: &mut dyn BranchHook) -> Result<StepExit> {
        let pc = self.state.pc();
        if pc % 4 != 0 {
            return Err(SimError::MisalignedPc { pc });
        }
        let word = self.mem.fetch_u32(pc)?;
        let inst = decode(word).ok_or(SimError::Unallocated { pc, word })?;
        if self.config.trace {
            tracing::trace!("{pc:#018x}  {word:08x}  {inst:?}");
        }
        self.exec(pc, inst, hook)
    }

    fn exec(&mut self, pc: u64, inst: Inst, hook: &mut dyn BranchHook) -> Result<StepExit> {
        let next_pc = pc.wrapping_add(4);
        let st = &mut self.state;
        match inst {
            Inst::Nop => {}
            Inst::Brk { imm } => return Err(SimError::Breakpoint { pc, imm }),
            Inst::MovWide {
                sf,
                op,
                shift,
                imm16,
                rd,
            } => {
                let imm = u64::from(imm16) << shift;
                let value = match op {
                    MovOp::Zero => imm,
                    MovOp::Not => !imm,
                    MovOp::Keep => (st.x(rd) & !(0xFFFF_u64 << shift)) | imm,
                };
                write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
            }
            Inst::AddSubImm {
                sf,
                sub,
                set_flags,
                imm,
                rn,
                rd,
            } => {
                let lhs = st.reg(rn, Reg31::StackPointer);
                let (value, flags) = add_sub(lhs, imm, sub, sf);
                if set_flags {
                    st.set_nzcv(flags);
                    write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
                } else {
                    write_gpr(st, rd, sf, value, Reg31::StackPointer);
                }
            }
            Inst::AddSubReg {
                sf,
                sub,
                set_flags,
                shift,
                amount,
                rm,
                rn,
                rd,
            } => {
                let rhs = shift_reg(st.x(rm), shift, amount, sf);
                let (value, flags) = add_sub(st.x(rn), rhs, sub, sf);
                if set_flags {
                    st.set_nzcv(flags);
                }
                write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
            }
            Inst::LogicReg {
                sf,
                op,
                invert,
                shift,
                amount,
                rm,
                rn,
                rd,
            } => {
                let mut rhs = shift_reg(st.x(rm), shift, amount, sf);
                if invert {
                    rhs = !rhs;
                }
                let lhs = st.x(rn);
                let value = truncate(
                    match op {
                        LogicOp::And | LogicOp::Ands => lhs & rhs,
                        LogicOp::Orr => lhs | rhs,
                        LogicOp::Eor => lhs ^ rhs,
                    },
                    sf,
                );
                if op == LogicOp::Ands {
                    st.set_nzcv(nz_flags(value, sf));
                }
                write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
            }
            Inst::MulAdd {
                sf,
                sub,
                rm,
                ra,
                rn,
                rd,
            } => {
                let product = st.x(rn).wrapping_mul(st.x(rm));
                let acc = st.x(ra);
                let value = if sub {
                    acc.wrapping_sub(product)
                } else {
                    acc.wrapping_add(product)
                };
                write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
            }
            Inst::Div {
                sf,
                signed,
                rm,
                rn,
                rd,
            } => {
                let value = divide(st.x(rn), st.x(rm), signed, sf);
                write_gpr(st, rd, sf, value, Reg31::ZeroRegister);
            }
            Inst::LoadStore {
                size,
                fp,
                load,
                offset,
                rn,
                rt,
            } => {
                let addr = base_address(st, rn)?.wrapping_add(offset);
                transfer(st, &mut self.mem, addr, size, fp, load, rt)?;
            }
            Inst::LoadLiteral { kind, offset, rt } => {
                let addr = pc.wrapping_add_signed(offset);
                match kind {
                    LiteralKind::W => st.set_w(rt, self.mem.read_u32(addr)?),
                    LiteralKind::X => st.set_x(rt, self.mem.read_u64(addr)?),
                    LiteralKind::D => st.set_d_bits(rt, self.mem.read_u64(addr)?),
                }
            }
            Inst::LoadStorePair {
                size,
                load,
                mode,
                offset,
                rt2,
                rn,
                rt,
            } => {
                let base = base_address(st, rn)?;
                let updated = base.wrapping_add_signed(offset);
                let addr = match mode {
                    PairMode::PostIndex => base,
                    PairMode::Offset | PairMode::PreIndex => updated,
                };
                transfer(st, &mut self.mem, addr, size, false, load, rt)?;
                transfer(
                    st,
                    &mut self.mem,
                    addr.wrapping_add(u64::from(size)),
                    size,
                    false,
                    load,
                    rt2,
                )?;
                if mode != PairMode::Offset {
                    st.set_reg(rn, updated, Reg31::StackPointer);
                }
            }
            Inst::Branch { link, offset } => {
                if link {
                    st.set_lr(next_pc);
                }
                st.set_pc(pc.wrapping_add_signed(offset));
                return Ok(StepExit::Continue);
            }
            Inst::BranchCond { cond, offset } => {
                let target = if st.condition_holds(cond) {
                    pc.wrapping_add_signed(offset)
                } else {
                    next_pc
                };
                st.set_pc(target);
                return Ok(StepExit::Continue);
            }
            Inst::CompareBranch {
                sf,
                nonzero,
                offset,
                rt,
            } => {
                let value = truncate(st.x(rt), sf);
                let taken = (value != 0) == nonzero;
                st.set_pc(if taken {
                    pc.wrapping_add_signed(offset)
                } else {
                    next_pc
                });
                return Ok(StepExit::Continue);
            }
            Inst::BranchReg { kind, rn } => {
                let target = st.x(rn);
                if kind != BranchKind::Ret {
                    let site = BranchSite {
                        kind,
                        pc,
                        target,
                        next_pc,
                    };
                    if let HookAction::Redirect(resume) = hook.on_branch(site, st) {
                        st.set_pc(resume);
                        return Ok(StepExit::Intercepted);
                    }
                }
                if kind == BranchKind::Blr {
                    st.set_lr(next_pc);
                }
                st.set_pc(target);
                return Ok(StepExit::Continue);
            }
            Inst::FmovToFp { double, rn, rd } => {
                if double {
                    st.set_d_bits(rd, st.x(rn));
                } else {
                    st.set_s_bits(rd, st.w(rn));
                }
            }
            Inst::FmovFromFp { double, rn, rd } => {
                if double {
                    st.set_x(rd, st.d_bits(rn));
                } else {
                    st.set_w(rd, st.s_bits(rn));
                }
            }
            Inst::Scvtf { sf, double, rn, rd } => {
                let value = if sf {
                    st.x(rn) as i64
                } else {
                    i64::from(st.w(rn) as i32)
                };
                if double {
                    st.set_d(rd, value as f64);
                } else {
                    st.set_s(rd, value as f32);
                }
            }
            Inst::Fcvtzs { sf, double, rn, rd } => {
                let value = if double {
                    st.d(rn)
                } else {
                    f64::from(st.s(rn))
                };
                // Float-to-int `as` casts saturate and map NaN to zero, as FCVTZS does.
                if sf {
                    st.set_x(rd, value as i64 as u64);
                } else {
                    st.set_w(rd, value as i32 as u32);
                }
            }
            Inst::FpMove { double, rn, rd } => {
                if double {
                    st.set_d_bits(rd, st.d_bits(rn));
                } else {
                    st.set_s_bits(rd, st.s_bits(rn));
                }
            }
            Inst::FpConvert { to_double, rn, rd } => {
                if to_double {
                    st.set_d(rd, f64::from(st.s(rn)));
                } else {
                    st.set_s(rd, st.d(rn) as f32);
                }
            }
            Inst::FpArith {
                double,
                op,
                rm,
                rn,
                rd,
            } => {
                if double {
                    let value = fp_arith(st.d(rn), st.d(rm), op);
                    st.set_d(rd, value);
                } else {
                    let value = fp_arith(f64::from(st.s(rn)), f64::from(st.s(rm)), op);
                    st.set_s(rd, value as f32);
                }
            }
        }
        st.set_pc(next_pc);
        Ok(StepExit::Continue)
    }
}

fn base_address(st: &CpuState, rn: u8) -> Result<u64> {
    let base = st.reg(rn, Reg31::StackPointer);
    if rn == ZR_OR_SP && base % 16 != 0 {
        return Err(SimError::MisalignedSp { sp: base });
    }
    Ok(base)
}

fn transfer(
    st: &mut CpuState,
    mem: &mut SparseMemory,
    addr: u64,
    size: u8,
    fp: bool,
    load: bool,
    rt: u8,
) -> Result<()> {
    match (fp, load, size) {
        (false, true, 1) => st.set_x(rt, u64::from(mem.read_u8(addr)?)),
        (false, true, 2) => st.set_x(rt, u64::from(mem.read_u16(addr)?)),
        (false, true, 4) => st.set_x(rt, u64::from(mem.read_u32(addr)?)),
        (false, true, _) => st.set_x(rt, mem.read_u64(addr)?),
        (false, false, 1) => mem.write_u8(addr, st.x(rt) as u8)?,
        (false, false, 2) => mem.write_u16(addr, st.x(rt) as u16)?,
        (false, false, 4) => mem.write_u32(addr, st.w(rt))?,
        (false, false, _) => mem.write_u64(addr, st.x(rt))?,
        (true, true, 4) => st.set_s_bits(rt, mem.read_u32(addr)?),
        (true, true, _) => st.set_d_bits(rt, mem.read_u64(addr)?),
        (true, false, 4) => mem.write_u32(addr, st.s_bits(rt))?,
        (true, false, _) => mem.write_u64(addr, st.d_bits(rt))?,
    }
    Ok(())
}

fn write_gpr(st: &mut CpuState, rd: u8, sf: bool, value: u64, r31: Reg31) {
    st.set_reg(rd, truncate(value, sf), r31);
}

#[inline]
fn truncate(value: u64, sf: bool) -> u64 {
    if sf {
        value
    } else {
        value & 0xFFFF_FFFF
    }
}

fn nz_flags(value: u64, sf: bool) -> Nzcv {
    let sign_bit = if sf { 63 } else { 31 };
    let mut flags = Nzcv::empty();
    flags.set(Nzcv::N, (value >> sign_bit) & 1 != 0);
    flags.set(Nzcv::Z, truncate(value, sf) == 0);
    flags
}

/// `AddWithCarry` from the Arm ARM; subtraction is `x + !y + 1`.
fn add_sub(x: u64, y: u64, sub: bool, sf: bool) -> (u64, Nzcv) {
    let (y, carry_in) = if sub { (!y, 1u64) } else { (y, 0u64) };
    if sf {
        let (partial, c1) = x.overflowing_add(y);
        let (result, c2) = partial.overflowing_add(carry_in);
        let mut flags = nz_flags(result, true);
        flags.set(Nzcv::C, c1 || c2);
        flags.set(Nzcv::V, ((x ^ result) & (y ^ result)) >> 63 != 0);
        (result, flags)
    } else {
        let (x, y) = (x as u32, y as u32);
        let (partial, c1) = x.overflowing_add(y);
        let (result, c2) = partial.overflowing_add(carry_in as u32);
        let mut flags = nz_flags(u64::from(result), false);
        flags.set(Nzcv::C, c1 || c2);
        flags.set(Nzcv::V, ((x ^ result) & (y ^ result)) >> 31 != 0);
        (u64::from(result), flags)
    }
}

fn shift_reg(value: u64, shift: Shift, amount: u8, sf: bool) -> u64 {
    let amount = u32::from(amount);
    if sf {
        match shift {
            Shift::Lsl => value << amount,
            Shift::Lsr => value >> amount,
            Shift::Asr => ((value as i64) >> amount) as u64,
            Shift::Ror => value.rotate_right(amount),
        }
    } else {
        let value = value as u32;
        u64::from(match shift {
            Shift::Lsl => value << amount,
            Shift::Lsr => value >> amount,
            Shift::Asr => ((value as i32) >> amount) as u32,
            Shift::Ror => value.rotate_right(amount),
        })
    }
}

/// Division by zero yields zero on A64; `MIN / -1` wraps.
fn divide(n: u64, m: u64, signed: bool, sf: bool) -> u64 {
    match (signed, sf) {
        (_, true) if m == 0 => 0,
        (_, false) if m as u32 == 0 => 0,
        (false, true) => n / m,
        (false, false) => u64::from(n as u32 / m as u32),
        (true, true) => (n as i64).wrapping_div(m as i64) as u64,
        (true, false) => u64::from((n as i32).wrapping_div(m as i32) as u32),
    }
}

fn fp_arith(a: f64, b: f64, op: FpOp) -> f64 {
    match op {
        FpOp::Add => a + b,
        FpOp::Sub => a - b,
        FpOp::Mul => a * b,
        FpOp::Div => a / b,
    }
}
