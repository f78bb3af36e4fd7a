use serde::{Deserialize, Serialize};
use tandem_core::{RangePolicy, ReconcileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compare-and-swap attempts made when advancing a user's checked range
    /// before the update is reported as conflicted.
    pub coverage_retries: u32,
    pub policy: RangePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coverage_retries: 3,
            policy: RangePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.coverage_retries == 0 {
            return Err(ReconcileError::Validation(
                "coverage_retries must be at least 1".to_string(),
            ));
        }
        self.policy.validate()
    }
}
