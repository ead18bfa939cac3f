mod common;

use a64_bridge::{
    create_code_simulator, BridgeConfig, BridgeError, CodeSimulator, CodeSimulatorArm64,
    InstructionSet, InvokeOutcome, JValue, MethodHandle, RegClass, SimulationPolicy,
};
use a64_sim::encode::{self, Assembler};
use a64_sim::{CpuState, SimBus, SimError};

use common::{
    entry_points, load_code, new_bridge, take_calls, TestMethod, TestThread, CODE_BASE, DATA_BASE,
};

static IDLE: TestThread = TestThread { marking: false };

fn bridge_running(asm: Assembler) -> CodeSimulatorArm64 {
    let mut bridge = new_bridge();
    load_code(&mut bridge, asm);
    bridge
}

fn fresh_state(bridge: &CodeSimulatorArm64) -> CpuState {
    CpuState::new(bridge.simulator().stack_top())
}

#[test]
fn no_argument_int_method_returns_its_computed_value() {
    let mut asm = Assembler::new();
    asm.emit(encode::movz_x(0, 6, 0))
        .emit(encode::movz_x(1, 7, 0))
        .emit(encode::mul_w(0, 0, 1))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("int other.Calc.answer()");
    let mut result = JValue::default();
    bridge
        .invoke(&method, &[], &IDLE, &mut result, "I", true)
        .unwrap();
    assert_eq!(result.i(), 42);
}

#[test]
fn static_int_method_returns_through_x0() {
    let mut asm = Assembler::new();
    asm.emit(encode::add_w_imm(0, 1, 37)).emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("int other.Calc.plus37(int)");
    let mut result = JValue::default();
    let outcome = bridge
        .invoke(&method, &[5], &IDLE, &mut result, "II", true)
        .unwrap();
    assert!(matches!(outcome, InvokeOutcome::Simulated(_)));
    assert_eq!(result.i(), 42);
    assert_eq!(*bridge.simulator().state(), fresh_state(&bridge));
}

#[test]
fn void_method_taking_a_long_leaves_the_result_slot_alone() {
    let mut asm = Assembler::new();
    asm.mov_imm64(9, DATA_BASE)
        .emit(encode::str_x(1, 9, 0))
        .emit(encode::str_d(0, 9, 8))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("void other.Sink.take(long)");
    let mut result = JValue::from_raw(0xDEAD_BEEF);
    bridge
        .invoke(&method, &[42, 0], &IDLE, &mut result, "VJ", true)
        .unwrap();

    assert_eq!(result.raw(), 0xDEAD_BEEF);
    let mem = bridge.simulator().mem();
    assert_eq!(mem.read_u64(DATA_BASE).unwrap(), 42);
    assert_eq!(mem.read_u64(DATA_BASE + 8).unwrap(), 0);
}

#[test]
fn instance_method_sees_this_in_w1() {
    let mut asm = Assembler::new();
    asm.emit(encode::add_w(0, 1, 2))
        .emit(encode::add_w(0, 0, 3))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("int other.Obj.sum(other.Ref, int)");
    let mut result = JValue::default();
    bridge
        .invoke(&method, &[100, 20, 3], &IDLE, &mut result, "ILI", false)
        .unwrap();
    assert_eq!(result.i(), 123);
}

#[test]
fn floating_point_arguments_and_results() {
    let mut asm = Assembler::new();
    asm.emit(encode::fcvt_d_s(1, 1))
        .emit(encode::fadd_d(0, 0, 1))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let wide = 1.25f64.to_bits();
    let args = [wide as u32, (wide >> 32) as u32, 0.5f32.to_bits()];
    let method = TestMethod::compiled("double other.Fp.mix(double, float)");
    let mut result = JValue::default();
    bridge
        .invoke(&method, &args, &IDLE, &mut result, "DDF", true)
        .unwrap();
    assert_eq!(result.d(), 1.75);

    let mut asm = Assembler::new();
    asm.emit(encode::fadd_s(0, 0, 0)).emit(encode::ret());
    let mut bridge = bridge_running(asm);
    let method = TestMethod::compiled("float other.Fp.twice(float)");
    bridge
        .invoke(&method, &[3.5f32.to_bits()], &IDLE, &mut result, "FF", true)
        .unwrap();
    assert_eq!(result.f(), 7.0);
}

#[test]
fn invoke_stub_registers_carry_the_host_handles() {
    let mut asm = Assembler::new();
    asm.mov_imm64(9, DATA_BASE)
        .emit(encode::str_x(0, 9, 0))
        .emit(encode::str_x(4, 9, 8))
        .emit(encode::str_x(5, 9, 16))
        .emit(encode::str_x(19, 9, 24))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("void other.Stub.regs()");
    let mut result = JValue::default();
    let result_addr = &result as *const JValue as usize as u64;
    let shorty = "V";
    bridge
        .invoke(&method, &[], &IDLE, &mut result, shorty, true)
        .unwrap();

    let mem = bridge.simulator().mem();
    assert_eq!(mem.read_u64(DATA_BASE).unwrap(), method.address());
    assert_eq!(mem.read_u64(DATA_BASE + 8).unwrap(), result_addr);
    assert_eq!(
        mem.read_u64(DATA_BASE + 16).unwrap(),
        shorty.as_ptr() as usize as u64
    );
    assert_eq!(
        mem.read_u64(DATA_BASE + 24).unwrap(),
        &IDLE as *const TestThread as usize as u64
    );
}

#[test]
fn marking_register_reflects_the_collector_when_read_barriers_are_on() {
    let program = || {
        let mut asm = Assembler::new();
        asm.emit(encode::mov_w(0, 20)).emit(encode::ret());
        asm
    };
    let method = TestMethod::compiled("boolean other.Gc.marking()");

    let mut bridge = bridge_running(program());
    let mut result = JValue::default();
    bridge
        .invoke(&method, &[], &TestThread { marking: true }, &mut result, "Z", true)
        .unwrap();
    assert!(result.z());

    let config = BridgeConfig {
        use_read_barrier: false,
        ..BridgeConfig::default()
    };
    let mut bridge = CodeSimulatorArm64::new(config, &entry_points()).unwrap();
    load_code(&mut bridge, program());
    bridge
        .invoke(&method, &[], &TestThread { marking: true }, &mut result, "Z", true)
        .unwrap();
    assert!(!result.z());
}

#[test]
fn ineligible_methods_are_skipped_untouched() {
    let mut asm = Assembler::new();
    asm.emit(encode::brk(1));
    let mut bridge = bridge_running(asm);
    bridge.simulator_mut().state_mut().set_x(7, 0x77);
    let before = bridge.simulator().state().clone();

    let method = TestMethod::compiled("void Main.main(java.lang.String[])");
    let mut result = JValue::from_raw(5);
    let outcome = bridge
        .invoke(&method, &[], &IDLE, &mut result, "V", true)
        .unwrap();
    assert_eq!(outcome, InvokeOutcome::Skipped);
    assert_eq!(result.raw(), 5);
    assert_eq!(*bridge.simulator().state(), before);
    assert!(take_calls().is_empty());
}

#[test]
fn state_does_not_carry_over_between_invocations() {
    let mut asm = Assembler::new();
    // x9 is never written by the invoke stub.
    asm.emit(encode::mov_x(0, 9))
        .emit(encode::movz_x(9, 0x55, 0))
        .emit(encode::ret());
    let mut bridge = bridge_running(asm);
    let method = TestMethod::compiled("long other.Leak.check()");

    for _ in 0..2 {
        let mut result = JValue::default();
        bridge
            .invoke(&method, &[], &IDLE, &mut result, "J", true)
            .unwrap();
        assert_eq!(result.j(), 0);
        assert_eq!(bridge.simulator().state().sp(), bridge.simulator().stack_top());
    }
}

#[test]
fn missing_code_is_reported_and_state_is_reset() {
    let mut bridge = new_bridge();
    let mut result = JValue::default();

    let method = TestMethod {
        code: None,
        ..TestMethod::compiled("int other.Lazy.notCompiled()")
    };
    let err = bridge
        .invoke(&method, &[], &IDLE, &mut result, "I", true)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::NoCompiledCode {
            method: "int other.Lazy.notCompiled()".to_string()
        }
    );
    assert_eq!(*bridge.simulator().state(), fresh_state(&bridge));

    let native = TestMethod {
        native: true,
        ..TestMethod::compiled("int other.Jni.call()")
    };
    assert!(matches!(
        bridge.invoke(&native, &[], &IDLE, &mut result, "I", true),
        Err(BridgeError::NoCompiledCode { .. })
    ));
}

#[test]
fn simulation_faults_propagate_and_state_is_reset() {
    let mut asm = Assembler::new();
    asm.emit(encode::movz_x(3, 9, 0)).emit(encode::brk(0x7));
    let mut bridge = bridge_running(asm);

    let method = TestMethod::compiled("void other.Trap.hit()");
    let mut result = JValue::from_raw(1);
    let err = bridge
        .invoke(&method, &[], &IDLE, &mut result, "V", true)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Sim(SimError::Breakpoint {
            pc: CODE_BASE + 4,
            imm: 0x7
        })
    );
    assert_eq!(result.raw(), 1);
    assert_eq!(*bridge.simulator().state(), fresh_state(&bridge));
}

#[test]
fn marshalling_limits_surface_as_errors() {
    let mut bridge = new_bridge();
    let method = TestMethod::compiled("void other.Many.doubles()");
    let mut result = JValue::default();

    let err = bridge
        .invoke(&method, &[0; 18], &IDLE, &mut result, "VDDDDDDDDD", true)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::RegisterSpill {
            index: 8,
            class: RegClass::Float
        }
    );
    assert_eq!(*bridge.simulator().state(), fresh_state(&bridge));

    let err = bridge
        .invoke(&method, &[], &IDLE, &mut result, "V?", true)
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidShorty { .. }));
}

#[test]
fn custom_policy_is_honoured() {
    let config = BridgeConfig {
        policy: SimulationPolicy {
            allow_list_enabled: true,
            allow_list: vec!["other.Hot.".to_string()],
            ..SimulationPolicy::default()
        },
        ..BridgeConfig::default()
    };
    let mut bridge = CodeSimulatorArm64::new(config, &entry_points()).unwrap();
    let mut asm = Assembler::new();
    asm.emit(encode::movz_x(0, 1, 0)).emit(encode::ret());
    load_code(&mut bridge, asm);

    let hot = TestMethod::compiled("int other.Hot.path()");
    let cold = TestMethod::compiled("int other.Cold.path()");
    assert!(CodeSimulator::can_simulate(&bridge, &hot));
    assert!(!CodeSimulator::can_simulate(&bridge, &cold));

    let mut result = JValue::default();
    assert_eq!(
        bridge
            .invoke(&cold, &[], &IDLE, &mut result, "I", true)
            .unwrap(),
        InvokeOutcome::Skipped
    );
    assert!(matches!(
        bridge.invoke(&hot, &[], &IDLE, &mut result, "I", true),
        Ok(InvokeOutcome::Simulated(_))
    ));
    assert_eq!(result.i(), 1);
}

#[test]
fn factory_only_builds_the_a64_simulator() {
    for isa in [
        InstructionSet::Arm,
        InstructionSet::Riscv64,
        InstructionSet::X86,
        InstructionSet::X86_64,
    ] {
        assert!(matches!(
            create_code_simulator(isa, BridgeConfig::default(), &entry_points()),
            Err(BridgeError::UnsupportedIsa(got)) if got == isa
        ));
    }
    assert!(create_code_simulator(InstructionSet::Arm64, BridgeConfig::default(), &entry_points()).is_ok());
}

#[test]
fn raw_runs_expose_c_return_values() {
    let mut asm = Assembler::new();
    asm.mov_imm64(0, 0xFFFF_FFFF_FFFF_FFFE).emit(encode::ret());
    let mut bridge = bridge_running(asm);

    let sim: &mut dyn CodeSimulator = &mut bridge;
    sim.run_from(CODE_BASE).unwrap();
    assert_eq!(sim.c_return_i64(), -2);
    assert_eq!(sim.c_return_i32(), -2);
    assert!(sim.c_return_bool());
}
