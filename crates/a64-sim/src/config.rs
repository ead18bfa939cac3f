/// Env var that turns on per-instruction tracing (`1`, `true`, `yes` or `on`).
pub const TRACE_ENV: &str = "A64_SIM_TRACE";

pub const DEFAULT_STACK_BASE: u64 = 0x7ff0_0000;
pub const DEFAULT_STACK_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Emit a `tracing::trace!` event for every executed instruction.
    pub trace: bool,
    /// Lowest address of the simulated stack mapping.
    pub stack_base: u64,
    pub stack_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trace: false,
            stack_base: DEFAULT_STACK_BASE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self {
            trace: env_var_truthy(TRACE_ENV),
            ..Self::default()
        }
    }

    pub fn stack_top(&self) -> u64 {
        self.stack_base + self.stack_size as u64
    }
}

pub(crate) fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        let name = "A64_SIM_TEST_TRUTHY";
        for (raw, expected) in [
            ("1", true),
            (" TRUE ", true),
            ("yes", true),
            ("On", true),
            ("0", false),
            ("off", false),
            ("", false),
        ] {
            std::env::set_var(name, raw);
            assert_eq!(env_var_truthy(name), expected, "{raw:?}");
        }
        std::env::remove_var(name);
        assert!(!env_var_truthy(name));
    }

    #[test]
    fn from_env_reads_the_trace_flag() {
        std::env::set_var(TRACE_ENV, "1");
        let config = SimConfig::from_env();
        std::env::remove_var(TRACE_ENV);
        assert!(config.trace);
        assert_eq!(config.stack_base, DEFAULT_STACK_BASE);

        assert!(!SimConfig::from_env().trace);
    }
}
