use a64_sim::{RunStats, Simulator};

use crate::abi::{InstructionSet, HOST_IS_64_BIT, RETURN_REG};
use crate::config::BridgeConfig;
use crate::entrypoints::InterceptionTable;
use crate::error::{BridgeError, Result};
use crate::intercept::RuntimeInterceptor;
use crate::marshal::{self, InvokeFrame};
use crate::policy::SimulationPolicy;
use crate::runtime::{ExecutionContext, JValue, MethodHandle, QuickEntryPoints};
use crate::shorty::Shorty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    Simulated(RunStats),
    /// The policy declined the method; nothing was run or modified.
    Skipped,
}

/// Interface the runtime drives a code simulator through.
pub trait CodeSimulator {
    /// Run raw code from `code` until it returns, without any invoke frame.
    fn run_from(&mut self, code: u64) -> Result<RunStats>;

    fn c_return_bool(&self) -> bool;
    fn c_return_i32(&self) -> i32;
    fn c_return_i64(&self) -> i64;

    fn invoke(
        &mut self,
        method: &dyn MethodHandle,
        args: &[u32],
        context: &dyn ExecutionContext,
        result: &mut JValue,
        shorty: &str,
        is_static: bool,
    ) -> Result<InvokeOutcome>;

    fn can_simulate(&self, method: &dyn MethodHandle) -> bool;
}

/// Create the code simulator for `isa`. Only A64 on a 64-bit host is supported.
pub fn create_code_simulator(
    isa: InstructionSet,
    config: BridgeConfig,
    entry_points: &QuickEntryPoints,
) -> Result<Box<dyn CodeSimulator>> {
    match isa {
        InstructionSet::Arm64 => Ok(Box::new(CodeSimulatorArm64::new(config, entry_points)?)),
        other => Err(BridgeError::UnsupportedIsa(other)),
    }
}

/// Runs compiled managed methods on the A64 simulator as if they had been
/// entered through the runtime's native invoke stub.
#[derive(Debug)]
pub struct CodeSimulatorArm64 {
    sim: Simulator,
    interceptor: RuntimeInterceptor,
    policy: SimulationPolicy,
    use_read_barrier: bool,
}

impl CodeSimulatorArm64 {
    pub fn new(config: BridgeConfig, entry_points: &QuickEntryPoints) -> Result<Self> {
        if !HOST_IS_64_BIT {
            return Err(BridgeError::UnsupportedHost);
        }
        let table = InterceptionTable::new(entry_points)?;
        let sim = Simulator::new(config.sim)?;
        Ok(Self {
            sim,
            interceptor: RuntimeInterceptor::new(table),
            policy: config.policy,
            use_read_barrier: config.use_read_barrier,
        })
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Used by embedders to map compiled code and data before invoking.
    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    pub fn interceptor(&self) -> &RuntimeInterceptor {
        &self.interceptor
    }

    pub fn policy(&self) -> &SimulationPolicy {
        &self.policy
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.sim.set_trace(trace);
    }

    pub fn invoke(
        &mut self,
        method: &dyn MethodHandle,
        args: &[u32],
        context: &dyn ExecutionContext,
        result: &mut JValue,
        shorty: &str,
        is_static: bool,
    ) -> Result<InvokeOutcome> {
        let name = method.pretty_method();
        if !self.policy.can_simulate(&name) {
            tracing::debug!(method = %name, "not eligible for simulation");
            return Ok(InvokeOutcome::Skipped);
        }
        tracing::debug!(method = %name, shorty, is_static, "simulate");

        let entry_sp = self.sim.state().sp();
        let outcome = self.simulate(method, &name, args, context, result, shorty, is_static);

        // No register, flag or stack state carries over to the next method.
        self.sim.reset_state();
        self.sim.state_mut().set_sp(entry_sp);

        if let Err(err) = &outcome {
            tracing::warn!(method = %name, error = %err, "simulated invocation failed");
        }
        outcome.map(InvokeOutcome::Simulated)
    }

    #[allow(clippy::too_many_arguments)]
    fn simulate(
        &mut self,
        method: &dyn MethodHandle,
        name: &str,
        args: &[u32],
        context: &dyn ExecutionContext,
        result: &mut JValue,
        shorty: &str,
        is_static: bool,
    ) -> Result<RunStats> {
        let parsed = Shorty::parse(shorty)?;
        let frame = InvokeFrame {
            method: method.address(),
            result: &mut *result as *mut JValue as usize as u64,
            shorty: shorty.as_ptr() as usize as u64,
            context: context.address(),
            gc_marking: self.use_read_barrier.then(|| context.is_gc_marking()),
        };
        marshal::pack_arguments(&mut self.sim, &frame, &parsed, args, is_static)?;

        let code = quick_code(method, name)?;
        let stats = self.sim.run_from(code, &mut self.interceptor)?;

        if let Some(value) = marshal::extract_result(self.sim.state(), parsed.return_type()) {
            *result = value;
        }
        Ok(stats)
    }
}

fn quick_code(method: &dyn MethodHandle, name: &str) -> Result<u64> {
    let no_code = || BridgeError::NoCompiledCode {
        method: name.to_string(),
    };
    if method.is_abstract() || method.is_native() {
        return Err(no_code());
    }
    method.quick_code().ok_or_else(no_code)
}

impl CodeSimulator for CodeSimulatorArm64 {
    fn run_from(&mut self, code: u64) -> Result<RunStats> {
        Ok(self.sim.run_from(code, &mut self.interceptor)?)
    }

    fn c_return_bool(&self) -> bool {
        self.sim.state().w(RETURN_REG) != 0
    }

    fn c_return_i32(&self) -> i32 {
        self.sim.state().w(RETURN_REG) as i32
    }

    fn c_return_i64(&self) -> i64 {
        self.sim.state().x(RETURN_REG) as i64
    }

    fn invoke(
        &mut self,
        method: &dyn MethodHandle,
        args: &[u32],
        context: &dyn ExecutionContext,
        result: &mut JValue,
        shorty: &str,
        is_static: bool,
    ) -> Result<InvokeOutcome> {
        CodeSimulatorArm64::invoke(self, method, args, context, result, shorty, is_static)
    }

    fn can_simulate(&self, method: &dyn MethodHandle) -> bool {
        self.policy.can_simulate(&method.pretty_method())
    }
}
