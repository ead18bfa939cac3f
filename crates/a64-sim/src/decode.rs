//! Decoder for the A64 subset the interpreter executes.
//!
//! This is not a general-purpose disassembler. It covers integer data
//! processing, loads/stores, branches and scalar floating point, which is what
//! compiled method bodies and invoke thunks need. Any other encoding decodes to
//! `None` and the interpreter reports it as unallocated.

use crate::hook::BranchKind;
use crate::state::Cond;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovOp {
    /// MOVN
    Not,
    /// MOVZ
    Zero,
    /// MOVK
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl Shift {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Shift::Lsl,
            1 => Shift::Lsr,
            2 => Shift::Asr,
            _ => Shift::Ror,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Orr,
    Eor,
    Ands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    W,
    X,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
    PostIndex,
    Offset,
    PreIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpOp {
    Mul,
    Div,
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    Nop,
    MovWide {
        sf: bool,
        op: MovOp,
        shift: u8,
        imm16: u16,
        rd: u8,
    },
    AddSubImm {
        sf: bool,
        sub: bool,
        set_flags: bool,
        imm: u64,
        rn: u8,
        rd: u8,
    },
    AddSubReg {
        sf: bool,
        sub: bool,
        set_flags: bool,
        shift: Shift,
        amount: u8,
        rm: u8,
        rn: u8,
        rd: u8,
    },
    LogicReg {
        sf: bool,
        op: LogicOp,
        invert: bool,
        shift: Shift,
        amount: u8,
        rm: u8,
        rn: u8,
        rd: u8,
    },
    MulAdd {
        sf: bool,
        sub: bool,
        rm: u8,
        ra: u8,
        rn: u8,
        rd: u8,
    },
    Div {
        sf: bool,
        signed: bool,
        rm: u8,
        rn: u8,
        rd: u8,
    },
    /// Unsigned-offset load/store. `size` is the access width in bytes.
    LoadStore {
        size: u8,
        fp: bool,
        load: bool,
        offset: u64,
        rn: u8,
        rt: u8,
    },
    LoadLiteral {
        kind: LiteralKind,
        offset: i64,
        rt: u8,
    },
    LoadStorePair {
        size: u8,
        load: bool,
        mode: PairMode,
        offset: i64,
        rt2: u8,
        rn: u8,
        rt: u8,
    },
    Branch {
        link: bool,
        offset: i64,
    },
    BranchCond {
        cond: Cond,
        offset: i64,
    },
    CompareBranch {
        sf: bool,
        nonzero: bool,
        offset: i64,
        rt: u8,
    },
    BranchReg {
        kind: BranchKind,
        rn: u8,
    },
    /// FMOV from a general register into an FP register.
    FmovToFp {
        double: bool,
        rn: u8,
        rd: u8,
    },
    /// FMOV from an FP register into a general register.
    FmovFromFp {
        double: bool,
        rn: u8,
        rd: u8,
    },
    Scvtf {
        sf: bool,
        double: bool,
        rn: u8,
        rd: u8,
    },
    Fcvtzs {
        sf: bool,
        double: bool,
        rn: u8,
        rd: u8,
    },
    FpMove {
        double: bool,
        rn: u8,
        rd: u8,
    },
    FpConvert {
        to_double: bool,
        rn: u8,
        rd: u8,
    },
    FpArith {
        double: bool,
        op: FpOp,
        rm: u8,
        rn: u8,
        rd: u8,
    },
    Brk {
        imm: u16,
    },
}

const NOP: u32 = 0xD503_201F;

#[inline]
fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

#[inline]
fn reg(word: u32, lsb: u32) -> u8 {
    ((word >> lsb) & 0x1F) as u8
}

#[inline]
fn sign_extend(value: u32, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((u64::from(value) << shift) as i64) >> shift
}

pub fn decode(word: u32) -> Option<Inst> {
    if word == NOP {
        return Some(Inst::Nop);
    }
    if (word & 0xFFE0_001F) == 0xD420_0000 {
        return Some(Inst::Brk {
            imm: ((word >> 5) & 0xFFFF) as u16,
        });
    }
    if (word >> 23) & 0x3F == 0b100101 {
        return decode_mov_wide(word);
    }
    if (word >> 23) & 0x3F == 0b100010 {
        let shifted = bit(word, 22);
        let imm12 = u64::from((word >> 10) & 0xFFF);
        return Some(Inst::AddSubImm {
            sf: bit(word, 31),
            sub: bit(word, 30),
            set_flags: bit(word, 29),
            imm: if shifted { imm12 << 12 } else { imm12 },
            rn: reg(word, 5),
            rd: reg(word, 0),
        });
    }
    if (word >> 24) & 0x1F == 0b01011 && !bit(word, 21) {
        return decode_add_sub_reg(word);
    }
    if (word >> 24) & 0x1F == 0b01010 {
        return decode_logic_reg(word);
    }
    if (word >> 24) & 0x7F == 0b001_1011 && (word >> 21) & 7 == 0 {
        return Some(Inst::MulAdd {
            sf: bit(word, 31),
            sub: bit(word, 15),
            rm: reg(word, 16),
            ra: reg(word, 10),
            rn: reg(word, 5),
            rd: reg(word, 0),
        });
    }
    if (word & 0x7FE0_F800) == 0x1AC0_0800 {
        return Some(Inst::Div {
            sf: bit(word, 31),
            signed: bit(word, 10),
            rm: reg(word, 16),
            rn: reg(word, 5),
            rd: reg(word, 0),
        });
    }
    if (word & 0x3B00_0000) == 0x3900_0000 {
        return decode_load_store_unsigned(word);
    }
    if (word & 0x3B00_0000) == 0x1800_0000 {
        return decode_load_literal(word);
    }
    if (word & 0x3A00_0000) == 0x2800_0000 {
        return decode_load_store_pair(word);
    }
    if (word & 0x7C00_0000) == 0x1400_0000 {
        return Some(Inst::Branch {
            link: bit(word, 31),
            offset: sign_extend(word & 0x03FF_FFFF, 26) * 4,
        });
    }
    if (word & 0xFF00_0010) == 0x5400_0000 {
        return Some(Inst::BranchCond {
            cond: Cond::from_bits(word),
            offset: sign_extend((word >> 5) & 0x7_FFFF, 19) * 4,
        });
    }
    if (word & 0x7E00_0000) == 0x3400_0000 {
        return Some(Inst::CompareBranch {
            sf: bit(word, 31),
            nonzero: bit(word, 24),
            offset: sign_extend((word >> 5) & 0x7_FFFF, 19) * 4,
            rt: reg(word, 0),
        });
    }
    if (word & 0xFE1F_FC1F) == 0xD61F_0000 {
        let kind = match (word >> 21) & 0xF {
            0 => BranchKind::Br,
            1 => BranchKind::Blr,
            2 => BranchKind::Ret,
            _ => return None,
        };
        return Some(Inst::BranchReg {
            kind,
            rn: reg(word, 5),
        });
    }
    if (word & 0x7F20_FC00) == 0x1E20_0000 {
        return decode_fp_int(word);
    }
    if (word & 0xFF20_7C00) == 0x1E20_4000 {
        return decode_fp_one_source(word);
    }
    if (word & 0xFF20_0C00) == 0x1E20_0800 {
        return decode_fp_two_source(word);
    }
    None
}

fn decode_mov_wide(word: u32) -> Option<Inst> {
    let sf = bit(word, 31);
    let hw = ((word >> 21) & 3) as u8;
    if !sf && hw >= 2 {
        return None;
    }
    let op = match (word >> 29) & 3 {
        0 => MovOp::Not,
        2 => MovOp::Zero,
        3 => MovOp::Keep,
        _ => return None,
    };
    Some(Inst::MovWide {
        sf,
        op,
        shift: hw * 16,
        imm16: ((word >> 5) & 0xFFFF) as u16,
        rd: reg(word, 0),
    })
}

fn decode_add_sub_reg(word: u32) -> Option<Inst> {
    let sf = bit(word, 31);
    let shift = Shift::from_bits(word >> 22);
    let amount = ((word >> 10) & 0x3F) as u8;
    if shift == Shift::Ror || (!sf && amount >= 32) {
        return None;
    }
    Some(Inst::AddSubReg {
        sf,
        sub: bit(word, 30),
        set_flags: bit(word, 29),
        shift,
        amount,
        rm: reg(word, 16),
        rn: reg(word, 5),
        rd: reg(word, 0),
    })
}

fn decode_logic_reg(word: u32) -> Option<Inst> {
    let sf = bit(word, 31);
    let amount = ((word >> 10) & 0x3F) as u8;
    if !sf && amount >= 32 {
        return None;
    }
    let op = match (word >> 29) & 3 {
        0 => LogicOp::And,
        1 => LogicOp::Orr,
        2 => LogicOp::Eor,
        _ => LogicOp::Ands,
    };
    Some(Inst::LogicReg {
        sf,
        op,
        invert: bit(word, 21),
        shift: Shift::from_bits(word >> 22),
        amount,
        rm: reg(word, 16),
        rn: reg(word, 5),
        rd: reg(word, 0),
    })
}

fn decode_load_store_unsigned(word: u32) -> Option<Inst> {
    let size_log2 = (word >> 30) & 3;
    let fp = bit(word, 26);
    let load = match (word >> 22) & 3 {
        0 => false,
        1 => true,
        // Sign-extending loads, prefetches and 128-bit FP accesses.
        _ => return None,
    };
    if fp && size_log2 < 2 {
        return None;
    }
    let imm12 = u64::from((word >> 10) & 0xFFF);
    Some(Inst::LoadStore {
        size: 1 << size_log2,
        fp,
        load,
        offset: imm12 << size_log2,
        rn: reg(word, 5),
        rt: reg(word, 0),
    })
}

fn decode_load_literal(word: u32) -> Option<Inst> {
    let kind = match ((word >> 30) & 3, bit(word, 26)) {
        (0, false) => LiteralKind::W,
        (1, false) => LiteralKind::X,
        (1, true) => LiteralKind::D,
        _ => return None,
    };
    Some(Inst::LoadLiteral {
        kind,
        offset: sign_extend((word >> 5) & 0x7_FFFF, 19) * 4,
        rt: reg(word, 0),
    })
}

fn decode_load_store_pair(word: u32) -> Option<Inst> {
    if bit(word, 26) {
        return None;
    }
    let size: u8 = match (word >> 30) & 3 {
        0 => 4,
        2 => 8,
        _ => return None,
    };
    let mode = match (word >> 23) & 3 {
        1 => PairMode::PostIndex,
        2 => PairMode::Offset,
        3 => PairMode::PreIndex,
        _ => return None,
    };
    Some(Inst::LoadStorePair {
        size,
        load: bit(word, 22),
        mode,
        offset: sign_extend((word >> 15) & 0x7F, 7) * i64::from(size),
        rt2: reg(word, 10),
        rn: reg(word, 5),
        rt: reg(word, 0),
    })
}

fn decode_fp_int(word: u32) -> Option<Inst> {
    let sf = bit(word, 31);
    let double = match (word >> 22) & 3 {
        0 => false,
        1 => true,
        _ => return None,
    };
    let rn = reg(word, 5);
    let rd = reg(word, 0);
    match ((word >> 19) & 3, (word >> 16) & 7) {
        (0, 0b110) if sf == double => Some(Inst::FmovFromFp { double, rn, rd }),
        (0, 0b111) if sf == double => Some(Inst::FmovToFp { double, rn, rd }),
        (0, 0b010) => Some(Inst::Scvtf { sf, double, rn, rd }),
        (3, 0b000) => Some(Inst::Fcvtzs { sf, double, rn, rd }),
        _ => None,
    }
}

fn decode_fp_one_source(word: u32) -> Option<Inst> {
    let rn = reg(word, 5);
    let rd = reg(word, 0);
    match ((word >> 22) & 3, (word >> 15) & 0x3F) {
        (0, 0) => Some(Inst::FpMove {
            double: false,
            rn,
            rd,
        }),
        (1, 0) => Some(Inst::FpMove {
            double: true,
            rn,
            rd,
        }),
        (0, 0b00_0101) => Some(Inst::FpConvert {
            to_double: true,
            rn,
            rd,
        }),
        (1, 0b00_0100) => Some(Inst::FpConvert {
            to_double: false,
            rn,
            rd,
        }),
        _ => None,
    }
}

fn decode_fp_two_source(word: u32) -> Option<Inst> {
    let double = match (word >> 22) & 3 {
        0 => false,
        1 => true,
        _ => return None,
    };
    let op = match (word >> 12) & 0xF {
        0 => FpOp::Mul,
        1 => FpOp::Div,
        2 => FpOp::Add,
        3 => FpOp::Sub,
        _ => return None,
    };
    Some(Inst::FpArith {
        double,
        op,
        rm: reg(word, 16),
        rn: reg(word, 5),
        rd: reg(word, 0),
    })
}
