//! A64 instruction encoders.
//!
//! Register arguments are raw register numbers (`31` is `sp`/`xzr` depending on
//! the instruction). Byte offsets must be multiples of the access size; the
//! encoders mask them into their immediate fields without further checks.

use crate::state::Cond;

pub const NOP: u32 = 0xD503_201F;

#[inline]
fn rd_rn(rd: u8, rn: u8) -> u32 {
    (u32::from(rn & 0x1F) << 5) | u32::from(rd & 0x1F)
}

#[inline]
fn rd_rn_rm(rd: u8, rn: u8, rm: u8) -> u32 {
    (u32::from(rm & 0x1F) << 16) | rd_rn(rd, rn)
}

pub fn movz_x(rd: u8, imm16: u16, shift: u8) -> u32 {
    0xD280_0000 | (u32::from(shift / 16) << 21) | (u32::from(imm16) << 5) | u32::from(rd)
}

pub fn movk_x(rd: u8, imm16: u16, shift: u8) -> u32 {
    0xF280_0000 | (u32::from(shift / 16) << 21) | (u32::from(imm16) << 5) | u32::from(rd)
}

pub fn movn_x(rd: u8, imm16: u16, shift: u8) -> u32 {
    0x9280_0000 | (u32::from(shift / 16) << 21) | (u32::from(imm16) << 5) | u32::from(rd)
}

pub fn movz_w(rd: u8, imm16: u16) -> u32 {
    0x5280_0000 | (u32::from(imm16) << 5) | u32::from(rd)
}

/// MOVZ followed by one MOVK per remaining non-zero halfword.
pub fn mov_imm64(rd: u8, value: u64) -> Vec<u32> {
    let parts = [
        (value & 0xFFFF) as u16,
        ((value >> 16) & 0xFFFF) as u16,
        ((value >> 32) & 0xFFFF) as u16,
        ((value >> 48) & 0xFFFF) as u16,
    ];
    let first = parts.iter().position(|p| *p != 0).unwrap_or(0);
    let mut words = vec![movz_x(rd, parts[first], (first * 16) as u8)];
    for (i, part) in parts.iter().enumerate().skip(first + 1) {
        if *part != 0 {
            words.push(movk_x(rd, *part, (i * 16) as u8));
        }
    }
    words
}

pub fn add_x_imm(rd: u8, rn: u8, imm12: u16) -> u32 {
    0x9100_0000 | (u32::from(imm12 & 0xFFF) << 10) | rd_rn(rd, rn)
}

pub fn sub_x_imm(rd: u8, rn: u8, imm12: u16) -> u32 {
    0xD100_0000 | (u32::from(imm12 & 0xFFF) << 10) | rd_rn(rd, rn)
}

pub fn add_w_imm(rd: u8, rn: u8, imm12: u16) -> u32 {
    0x1100_0000 | (u32::from(imm12 & 0xFFF) << 10) | rd_rn(rd, rn)
}

pub fn subs_x_imm(rd: u8, rn: u8, imm12: u16) -> u32 {
    0xF100_0000 | (u32::from(imm12 & 0xFFF) << 10) | rd_rn(rd, rn)
}

pub fn cmp_x_imm(rn: u8, imm12: u16) -> u32 {
    subs_x_imm(31, rn, imm12)
}

/// `mov xd, sp` / `mov sp, xn`.
pub fn mov_sp(rd: u8, rn: u8) -> u32 {
    add_x_imm(rd, rn, 0)
}

pub fn add_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0x8B00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn add_w(rd: u8, rn: u8, rm: u8) -> u32 {
    0x0B00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn sub_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0xCB00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn subs_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0xEB00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn cmp_x(rn: u8, rm: u8) -> u32 {
    subs_x(31, rn, rm)
}

pub fn lsl_x_add(rd: u8, rn: u8, rm: u8, amount: u8) -> u32 {
    add_x(rd, rn, rm) | (u32::from(amount & 0x3F) << 10)
}

pub fn and_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0x8A00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn orr_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0xAA00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn eor_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0xCA00_0000 | rd_rn_rm(rd, rn, rm)
}

pub fn bic_x(rd: u8, rn: u8, rm: u8) -> u32 {
    and_x(rd, rn, rm) | (1 << 21)
}

pub fn orn_x(rd: u8, rn: u8, rm: u8) -> u32 {
    orr_x(rd, rn, rm) | (1 << 21)
}

pub fn mov_x(rd: u8, rm: u8) -> u32 {
    orr_x(rd, 31, rm)
}

pub fn mov_w(rd: u8, rm: u8) -> u32 {
    0x2A00_0000 | rd_rn_rm(rd, 31, rm)
}

pub fn madd_x(rd: u8, rn: u8, rm: u8, ra: u8) -> u32 {
    0x9B00_0000 | (u32::from(ra & 0x1F) << 10) | rd_rn_rm(rd, rn, rm)
}

pub fn mul_x(rd: u8, rn: u8, rm: u8) -> u32 {
    madd_x(rd, rn, rm, 31)
}

pub fn mul_w(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1B00_7C00 | rd_rn_rm(rd, rn, rm)
}

pub fn udiv_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0x9AC0_0800 | rd_rn_rm(rd, rn, rm)
}

pub fn sdiv_x(rd: u8, rn: u8, rm: u8) -> u32 {
    0x9AC0_0C00 | rd_rn_rm(rd, rn, rm)
}

fn ls_unsigned(base: u32, rt: u8, rn: u8, offset: u32, scale: u32) -> u32 {
    base | (((offset / scale) & 0xFFF) << 10) | rd_rn(rt, rn)
}

pub fn ldr_x(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xF940_0000, rt, rn, offset, 8)
}

pub fn str_x(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xF900_0000, rt, rn, offset, 8)
}

pub fn ldr_w(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xB940_0000, rt, rn, offset, 4)
}

pub fn str_w(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xB900_0000, rt, rn, offset, 4)
}

pub fn ldrb(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0x3940_0000, rt, rn, offset, 1)
}

pub fn strb(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0x3900_0000, rt, rn, offset, 1)
}

pub fn ldr_d(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xFD40_0000, rt, rn, offset, 8)
}

pub fn str_d(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xFD00_0000, rt, rn, offset, 8)
}

pub fn ldr_s(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xBD40_0000, rt, rn, offset, 4)
}

pub fn str_s(rt: u8, rn: u8, offset: u32) -> u32 {
    ls_unsigned(0xBD00_0000, rt, rn, offset, 4)
}

/// PC-relative `ldr xt, <label>`, `offset` in bytes from this instruction.
pub fn ldr_x_literal(rt: u8, offset: i32) -> u32 {
    0x5800_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | u32::from(rt & 0x1F)
}

pub fn ldr_w_literal(rt: u8, offset: i32) -> u32 {
    0x1800_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | u32::from(rt & 0x1F)
}

pub fn ldr_d_literal(rt: u8, offset: i32) -> u32 {
    0x5C00_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | u32::from(rt & 0x1F)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Post,
    Offset,
    Pre,
}

impl Index {
    fn bits(self) -> u32 {
        match self {
            Index::Post => 1 << 23,
            Index::Offset => 2 << 23,
            Index::Pre => 3 << 23,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn pair(
    base: u32,
    scale: i32,
    load: bool,
    rt: u8,
    rt2: u8,
    rn: u8,
    offset: i32,
    index: Index,
) -> u32 {
    let imm7 = ((offset / scale) as u32) & 0x7F;
    base | index.bits()
        | (u32::from(load) << 22)
        | (imm7 << 15)
        | (u32::from(rt2 & 0x1F) << 10)
        | rd_rn(rt, rn)
}

pub fn stp_x(rt: u8, rt2: u8, rn: u8, offset: i32, index: Index) -> u32 {
    pair(0xA800_0000, 8, false, rt, rt2, rn, offset, index)
}

pub fn ldp_x(rt: u8, rt2: u8, rn: u8, offset: i32, index: Index) -> u32 {
    pair(0xA800_0000, 8, true, rt, rt2, rn, offset, index)
}

pub fn stp_w(rt: u8, rt2: u8, rn: u8, offset: i32, index: Index) -> u32 {
    pair(0x2800_0000, 4, false, rt, rt2, rn, offset, index)
}

pub fn ldp_w(rt: u8, rt2: u8, rn: u8, offset: i32, index: Index) -> u32 {
    pair(0x2800_0000, 4, true, rt, rt2, rn, offset, index)
}

/// `b` with a byte offset relative to this instruction.
pub fn b(offset: i32) -> u32 {
    0x1400_0000 | (((offset / 4) as u32) & 0x03FF_FFFF)
}

pub fn bl(offset: i32) -> u32 {
    0x9400_0000 | (((offset / 4) as u32) & 0x03FF_FFFF)
}

pub fn b_cond(cond: Cond, offset: i32) -> u32 {
    0x5400_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | cond as u32
}

pub fn cbz_x(rt: u8, offset: i32) -> u32 {
    0xB400_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | u32::from(rt & 0x1F)
}

pub fn cbnz_x(rt: u8, offset: i32) -> u32 {
    0xB500_0000 | ((((offset / 4) as u32) & 0x7_FFFF) << 5) | u32::from(rt & 0x1F)
}

pub fn br(rn: u8) -> u32 {
    0xD61F_0000 | (u32::from(rn & 0x1F) << 5)
}

pub fn blr(rn: u8) -> u32 {
    0xD63F_0000 | (u32::from(rn & 0x1F) << 5)
}

pub fn ret() -> u32 {
    0xD65F_03C0
}

pub fn fmov_d_from_x(rd: u8, rn: u8) -> u32 {
    0x9E67_0000 | rd_rn(rd, rn)
}

pub fn fmov_x_from_d(rd: u8, rn: u8) -> u32 {
    0x9E66_0000 | rd_rn(rd, rn)
}

pub fn fmov_s_from_w(rd: u8, rn: u8) -> u32 {
    0x1E27_0000 | rd_rn(rd, rn)
}

pub fn fmov_w_from_s(rd: u8, rn: u8) -> u32 {
    0x1E26_0000 | rd_rn(rd, rn)
}

pub fn scvtf_d_x(rd: u8, rn: u8) -> u32 {
    0x9E62_0000 | rd_rn(rd, rn)
}

pub fn scvtf_d_w(rd: u8, rn: u8) -> u32 {
    0x1E62_0000 | rd_rn(rd, rn)
}

pub fn fcvtzs_x_d(rd: u8, rn: u8) -> u32 {
    0x9E78_0000 | rd_rn(rd, rn)
}

pub fn fcvtzs_w_s(rd: u8, rn: u8) -> u32 {
    0x1E38_0000 | rd_rn(rd, rn)
}

pub fn fmov_d(rd: u8, rn: u8) -> u32 {
    0x1E60_4000 | rd_rn(rd, rn)
}

pub fn fcvt_d_s(rd: u8, rn: u8) -> u32 {
    0x1E22_C000 | rd_rn(rd, rn)
}

pub fn fcvt_s_d(rd: u8, rn: u8) -> u32 {
    0x1E62_4000 | rd_rn(rd, rn)
}

pub fn fadd_d(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E60_2800 | rd_rn_rm(rd, rn, rm)
}

pub fn fsub_d(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E60_3800 | rd_rn_rm(rd, rn, rm)
}

pub fn fmul_d(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E60_0800 | rd_rn_rm(rd, rn, rm)
}

pub fn fdiv_d(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E60_1800 | rd_rn_rm(rd, rn, rm)
}

pub fn fadd_s(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E20_2800 | rd_rn_rm(rd, rn, rm)
}

pub fn fmul_s(rd: u8, rn: u8, rm: u8) -> u32 {
    0x1E20_0800 | rd_rn_rm(rd, rn, rm)
}

pub fn brk(imm16: u16) -> u32 {
    0xD420_0000 | (u32::from(imm16) << 5)
}

/// Little code buffer with an 8-byte literal pool placed after the code.
///
/// `ldr_x_literal` calls are recorded and patched by [`Assembler::finish`],
/// so literals can be requested before the code length is known.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    words: Vec<u32>,
    literal_loads: Vec<(usize, u8, u64)>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, word: u32) -> &mut Self {
        self.words.push(word);
        self
    }

    pub fn emit_all(&mut self, words: &[u32]) -> &mut Self {
        self.words.extend_from_slice(words);
        self
    }

    pub fn mov_imm64(&mut self, rd: u8, value: u64) -> &mut Self {
        let words = mov_imm64(rd, value);
        self.emit_all(&words)
    }

    /// Load a 64-bit constant from the literal pool.
    pub fn ldr_x_literal(&mut self, rt: u8, value: u64) -> &mut Self {
        self.literal_loads.push((self.words.len(), rt, value));
        self.emit(NOP)
    }

    /// Byte offset of the next emitted instruction.
    pub fn offset(&self) -> usize {
        self.words.len() * 4
    }

    pub fn finish(mut self) -> Vec<u8> {
        if !self.literal_loads.is_empty() && self.words.len() % 2 != 0 {
            self.words.push(NOP);
        }
        let pool_start = self.words.len();
        for (slot, (index, rt, _)) in self.literal_loads.iter().enumerate() {
            let literal_word = pool_start + slot * 2;
            let offset = ((literal_word - index) * 4) as i32;
            self.words[*index] = ldr_x_literal(*rt, offset);
        }
        let mut out = Vec::with_capacity(self.words.len() * 4 + self.literal_loads.len() * 8);
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for (_, _, value) in &self.literal_loads {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}
