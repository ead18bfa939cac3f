//! Which methods the simulator is allowed to run.

/// Substring that forces a method to be simulated regardless of the lists.
pub const DEBUG_MARKER: &str = "$simulate$";

pub const DEFAULT_ALLOW_LIST: &[&str] = &[
    "other.TestByte.testDotProdComplex",
    "other.TestByte.testDotProdComplexSignedCastedToUnsigned",
    "other.TestByte.testDotProdComplexUnsigned",
    "other.TestByte.testDotProdComplexUnsignedCastedToSigned",
];

/// Entry points and class initializers, plus the runtime's own libraries.
pub const DEFAULT_DENY_LIST: &[&str] = &[
    "main",
    "<clinit>",
    "java.",
    "sun.",
    "dalvik.",
    "android.",
    "libcore.",
];

/// Eligibility rules, evaluated in order, first match wins:
///
/// 1. a name containing [`debug_marker`](Self::debug_marker) is eligible;
/// 2. with the allow list enabled, a name is eligible exactly when it contains
///    an allow-list entry;
/// 3. otherwise a name containing a deny-list entry is ineligible, and
///    everything else is eligible.
///
/// Matching is plain substring containment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationPolicy {
    pub debug_marker: String,
    pub allow_list_enabled: bool,
    pub allow_list: Vec<String>,
    pub deny_list: Vec<String>,
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            debug_marker: DEBUG_MARKER.to_string(),
            allow_list_enabled: false,
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
            deny_list: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SimulationPolicy {
    /// Default lists with the allow list switched on.
    pub fn allow_list_only() -> Self {
        Self {
            allow_list_enabled: true,
            ..Self::default()
        }
    }

    pub fn can_simulate(&self, name: &str) -> bool {
        if !self.debug_marker.is_empty() && name.contains(self.debug_marker.as_str()) {
            return true;
        }
        if self.allow_list_enabled {
            return self.allow_list.iter().any(|s| name.contains(s.as_str()));
        }
        !self.deny_list.iter().any(|s| name.contains(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_denies_runtime_libraries() {
        let policy = SimulationPolicy::default();
        assert!(policy.can_simulate("int other.TestByte.testDotProdSimple(byte[], byte[])"));
        assert!(!policy.can_simulate("void Main.main(java.lang.String[])"));
        assert!(!policy.can_simulate("void Foo.<clinit>()"));
        assert!(!policy.can_simulate("java.lang.String java.lang.Object.toString()"));
        assert!(!policy.can_simulate("void libcore.io.Memory.peek()"));
    }

    #[test]
    fn debug_marker_beats_the_deny_list() {
        let policy = SimulationPolicy::default();
        assert!(policy.can_simulate("void java.lang.Foo.$simulate$bar()"));
        assert!(SimulationPolicy::allow_list_only().can_simulate("void Main.$simulate$main()"));
    }

    #[test]
    fn allow_list_mode_rejects_everything_else() {
        let policy = SimulationPolicy::allow_list_only();
        assert!(policy.can_simulate("int other.TestByte.testDotProdComplexUnsigned(byte[], byte[])"));
        assert!(!policy.can_simulate("int other.TestByte.testDotProdSimple(byte[], byte[])"));
        // The deny list is not consulted in allow-list mode.
        let policy = SimulationPolicy {
            allow_list: vec!["java.".to_string()],
            ..SimulationPolicy::allow_list_only()
        };
        assert!(policy.can_simulate("void java.util.List.clear()"));
    }

    #[test]
    fn matching_is_substring_containment() {
        let policy = SimulationPolicy::default();
        // "main" also matches inside longer identifiers.
        assert!(!policy.can_simulate("void Foo.domainCheck()"));
    }
}
