#![cfg(not(target_arch = "wasm32"))]

use a64_sim::encode::{self, Assembler};
use a64_sim::{NoHook, Nzcv, SimConfig, Simulator};
use proptest::prelude::*;

const CODE_BASE: u64 = 0x4000;

fn run(asm: Assembler) -> Simulator {
    let code = asm.finish();
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.mem_mut().map_with(CODE_BASE, &code).unwrap();
    sim.run_from(CODE_BASE, &mut NoHook).unwrap();
    sim
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn add_and_sub_match_wrapping_arithmetic(a in any::<u64>(), b in any::<u64>()) {
        let mut asm = Assembler::new();
        asm.mov_imm64(1, a)
            .mov_imm64(2, b)
            .emit(encode::add_x(3, 1, 2))
            .emit(encode::sub_x(4, 1, 2))
            .emit(encode::add_w(5, 1, 2))
            .emit(encode::ret());
        let sim = run(asm);
        prop_assert_eq!(sim.state().x(3), a.wrapping_add(b));
        prop_assert_eq!(sim.state().x(4), a.wrapping_sub(b));
        prop_assert_eq!(sim.state().x(5), u64::from((a as u32).wrapping_add(b as u32)));
    }

    #[test]
    fn compare_sets_unsigned_and_signed_orderings(a in any::<u64>(), b in any::<u64>()) {
        let mut asm = Assembler::new();
        asm.mov_imm64(1, a)
            .mov_imm64(2, b)
            .emit(encode::cmp_x(1, 2))
            .emit(encode::ret());
        let sim = run(asm);
        let flags = sim.state().nzcv();
        let n = flags.contains(Nzcv::N);
        let v = flags.contains(Nzcv::V);
        prop_assert_eq!(flags.contains(Nzcv::Z), a == b);
        // C is set when no borrow occurs.
        prop_assert_eq!(flags.contains(Nzcv::C), a >= b);
        prop_assert_eq!(n != v, (a as i64) < (b as i64));
    }

    #[test]
    fn division_matches_host_semantics(a in any::<u64>(), b in any::<u64>()) {
        let mut asm = Assembler::new();
        asm.mov_imm64(1, a)
            .mov_imm64(2, b)
            .emit(encode::udiv_x(3, 1, 2))
            .emit(encode::sdiv_x(4, 1, 2))
            .emit(encode::ret());
        let sim = run(asm);
        let udiv = if b == 0 { 0 } else { a / b };
        let sdiv = if b == 0 { 0 } else { (a as i64).wrapping_div(b as i64) as u64 };
        prop_assert_eq!(sim.state().x(3), udiv);
        prop_assert_eq!(sim.state().x(4), sdiv);
    }
}
