use a64_sim::SimConfig;

use crate::policy::SimulationPolicy;

/// Everything a [`CodeSimulatorArm64`](crate::CodeSimulatorArm64) is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub sim: SimConfig,
    /// Load the marking register from the execution context before each call.
    pub use_read_barrier: bool,
    pub policy: SimulationPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            use_read_barrier: true,
            policy: SimulationPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults, with instruction tracing taken from the environment.
    pub fn from_env() -> Self {
        Self {
            sim: SimConfig::from_env(),
            ..Self::default()
        }
    }
}
