//! Invoke-stub frame construction and result extraction.
//!
//! Mirrors what the runtime's native invoke stub does before it enters
//! compiled code. The frame built below the caller's SP looks like this
//! (addresses grow upwards):
//!
//! ```text
//!   saved_sp ->  +-------------------------+
//!                | x28 .. x20, x19 (self)  |
//!                | SP' (= saved_sp)        |  saved-frame record,
//!                | x5 (shorty), x4 (result)|  15 x 8 bytes
//!                | LR', FP'                | <- FP
//!                +-------------------------+
//!                | argument words          |
//!                | null method slot        | <- SP (16-byte aligned)
//!                +-------------------------+
//! ```

use a64_sim::{CpuState, SimBus, Simulator};

use crate::abi::{
    align_down, ARG_REGS_PER_CLASS, CALLEE_SAVED_TAIL, FIRST_FPR_ARG, FIRST_GPR_ARG, FP_REG,
    FP_RETURN_REG, LR_REG, METHOD_REG, MR_REG, RESULT_PTR_REG, RETURN_REG, SAVED_REGS_SIZE,
    SAVED_REG_COUNT, SELF_REG, SHORTY_PTR_REG, STACK_ALIGNMENT, VREG_SIZE, X_REG_SIZE,
};
use crate::error::{BridgeError, Result};
use crate::runtime::JValue;
use crate::shorty::{RegClass, Shorty, ShortyType};

/// Host handles placed into fixed registers for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeFrame {
    pub method: u64,
    pub result: u64,
    pub shorty: u64,
    pub context: u64,
    /// Marking-register value, when read barriers are in use.
    pub gc_marking: Option<bool>,
}

/// The callee-saved record the invoke stub leaves at FP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedFrame {
    pub fp: u64,
    pub lr: u64,
    pub result: u64,
    pub shorty: u64,
    pub sp: u64,
    pub context: u64,
    pub callee_saved: [u64; 9],
}

impl SavedFrame {
    pub fn capture(state: &CpuState, saved_sp: u64) -> Self {
        let mut callee_saved = [0u64; 9];
        for (slot, reg) in callee_saved.iter_mut().zip(CALLEE_SAVED_TAIL) {
            *slot = state.x(reg);
        }
        Self {
            fp: state.x(FP_REG),
            lr: state.x(LR_REG),
            result: state.x(RESULT_PTR_REG),
            shorty: state.x(SHORTY_PTR_REG),
            sp: saved_sp,
            context: state.x(SELF_REG),
            callee_saved,
        }
    }

    pub fn slots(&self) -> [u64; SAVED_REG_COUNT] {
        let mut out = [0u64; SAVED_REG_COUNT];
        out[..6].copy_from_slice(&[
            self.fp,
            self.lr,
            self.result,
            self.shorty,
            self.sp,
            self.context,
        ]);
        out[6..].copy_from_slice(&self.callee_saved);
        out
    }

    pub fn write<B: SimBus + ?Sized>(&self, bus: &mut B, base: u64) -> Result<()> {
        for (i, value) in self.slots().into_iter().enumerate() {
            bus.write_u64(base + i as u64 * X_REG_SIZE, value)?;
        }
        Ok(())
    }

    pub fn read<B: SimBus + ?Sized>(bus: &B, base: u64) -> Result<Self> {
        let mut slots = [0u64; SAVED_REG_COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = bus.read_u64(base + i as u64 * X_REG_SIZE)?;
        }
        let mut callee_saved = [0u64; 9];
        callee_saved.copy_from_slice(&slots[6..]);
        Ok(Self {
            fp: slots[0],
            lr: slots[1],
            result: slots[2],
            shorty: slots[3],
            sp: slots[4],
            context: slots[5],
            callee_saved,
        })
    }
}

/// Sequential reader over the 32-bit argument buffer.
struct ArgCursor<'a> {
    words: &'a [u32],
    pos: usize,
    needed: usize,
}

impl<'a> ArgCursor<'a> {
    fn new(words: &'a [u32], needed: usize) -> Self {
        Self {
            words,
            pos: 0,
            needed,
        }
    }

    fn word(&mut self) -> Result<u32> {
        let w = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(BridgeError::ArgumentBufferTooShort {
                needed: self.needed,
                available: self.words.len(),
            })?;
        self.pos += 1;
        Ok(w)
    }

    /// Two consecutive words, low word first.
    fn wide(&mut self) -> Result<u64> {
        let lo = self.word()?;
        let hi = self.word()?;
        Ok(u64::from(lo) | (u64::from(hi) << 32))
    }
}

/// Build the invoke frame and load the argument registers.
///
/// Returns the SP value at entry, which the caller restores after the run.
/// On error SP is already back at that value; other registers and the
/// stack below it may have been written.
pub fn pack_arguments(
    sim: &mut Simulator,
    frame: &InvokeFrame,
    shorty: &Shorty,
    args: &[u32],
    is_static: bool,
) -> Result<u64> {
    let saved_sp = sim.state().sp();
    if let Err(err) = build_frame(sim, frame, shorty, args, is_static, saved_sp) {
        sim.state_mut().set_sp(saved_sp);
        return Err(err);
    }
    Ok(saved_sp)
}

fn build_frame(
    sim: &mut Simulator,
    frame: &InvokeFrame,
    shorty: &Shorty,
    args: &[u32],
    is_static: bool,
    saved_sp: u64,
) -> Result<()> {
    let (st, mem) = sim.parts_mut();

    st.set_x(METHOD_REG, frame.method);
    st.set_x(SELF_REG, frame.context);
    st.set_x(RESULT_PTR_REG, frame.result);
    st.set_x(SHORTY_PTR_REG, frame.shorty);

    let args_bytes = args.len() as u64 * VREG_SIZE;
    let frame_size = SAVED_REGS_SIZE + X_REG_SIZE + args_bytes;
    let new_sp = align_down(saved_sp.wrapping_sub(frame_size), STACK_ALIGNMENT);
    st.set_sp(new_sp);

    mem.write_u64(new_sp, 0)?;
    let arg_bytes: Vec<u8> = args.iter().flat_map(|w| w.to_le_bytes()).collect();
    mem.write_bytes(new_sp + X_REG_SIZE, &arg_bytes)?;

    let record = saved_sp.wrapping_sub(SAVED_REGS_SIZE);
    SavedFrame::capture(st, saved_sp).write(mem, record)?;
    st.set_x(FP_REG, record);

    let mut cursor = ArgCursor::new(args, shorty.arg_words(is_static));
    let mut gpr = FIRST_GPR_ARG;
    let mut fpr = FIRST_FPR_ARG;

    if !is_static {
        st.set_w(gpr, cursor.word()?);
        gpr += 1;
    }

    for (index, &ty) in shorty.params().iter().enumerate() {
        let class = match ty.reg_class() {
            Some(class) => class,
            None => continue,
        };
        let next = match class {
            RegClass::Integer => &mut gpr,
            RegClass::Float => &mut fpr,
        };
        if *next >= ARG_REGS_PER_CLASS {
            return Err(BridgeError::RegisterSpill { index, class });
        }
        let reg = *next;
        *next += 1;

        match ty {
            ShortyType::Double => st.set_d_bits(reg, cursor.wide()?),
            ShortyType::Float => st.set_s_bits(reg, cursor.word()?),
            ShortyType::Long => st.set_x(reg, cursor.wide()?),
            _ => st.set_w(reg, cursor.word()?),
        }
    }

    if let Some(marking) = frame.gc_marking {
        st.set_w(MR_REG, u32::from(marking));
    }

    Ok(())
}

/// Read the return value for `ret`. Void reads nothing.
pub fn extract_result(state: &CpuState, ret: ShortyType) -> Option<JValue> {
    let mut value = JValue::default();
    match ret {
        ShortyType::Void => return None,
        ShortyType::Double => value.set_d(state.d(FP_RETURN_REG)),
        ShortyType::Float => value.set_f(state.s(FP_RETURN_REG)),
        // The full 64-bit register is stored whatever the declared width.
        _ => value.set_j(state.x(RETURN_REG) as i64),
    }
    Some(value)
}
