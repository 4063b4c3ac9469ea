//! Interpreter configuration.

use serde::{Deserialize, Serialize};

use gmrun_core::DEFAULT_FIRST_INSTANCE_ID;

/// Limits and addressing thresholds for a [`Vm`](crate::Vm).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use gmrun::VmConfig;
///
/// let config = VmConfig::from_json(r#"{ "max_call_depth": 32 }"#).unwrap();
/// assert_eq!(config.max_call_depth, 32);
/// assert_eq!(config.first_instance_id, 100_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Nested script calls allowed before `CallDepthExceeded`.
    pub max_call_depth: usize,
    /// Operand stack slots per call before `StackOverflow`.
    pub max_stack_depth: usize,
    /// Ids below this address an asset; ids at or above it an instance.
    pub first_instance_id: i32,
    /// Elements an array may grow to before an indexed store fails with
    /// `ArrayTooLarge`.
    pub max_array_length: usize,
}

impl VmConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            max_stack_depth: 4096,
            first_instance_id: DEFAULT_FIRST_INSTANCE_ID,
            max_array_length: 32_000,
        }
    }
}
