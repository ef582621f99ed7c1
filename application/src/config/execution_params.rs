//! Execution parameters: executor control.
//!
//! [`ExecutionParams`] groups the static parameters that control how
//! [`RunMergeUseCase`](crate::use_cases::run_merge::RunMergeUseCase)
//! schedules pipeline nodes. These are application-layer concerns, not
//! domain policy.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PARALLEL_GROUPS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Upper bound on concurrently running heavy nodes (group loads, denoising)
    pub max_parallel_groups: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_parallel_groups: DEFAULT_MAX_PARALLEL_GROUPS,
        }
    }
}

impl ExecutionParams {
    /// Zero is clamped to one
    pub fn with_max_parallel_groups(mut self, max: usize) -> Self {
        self.max_parallel_groups = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        assert_eq!(ExecutionParams::default().max_parallel_groups, 4);
    }

    #[test]
    fn test_zero_parallelism_is_clamped() {
        let params = ExecutionParams::default().with_max_parallel_groups(0);
        assert_eq!(params.max_parallel_groups, 1);
    }
}
