//! Wizard step bookkeeping.
//!
//! Purely presentational: the publish pipeline never consults these states
//! to decide whether a stage runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Complete,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: StepStatus,
}

impl Step {
    pub fn new(name: &str, status: StepStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

pub const BUILD_STEP: usize = 0;
pub const METADATA_STEP: usize = 1;
pub const MINT_STEP: usize = 2;

/// The publish wizard's steps as they look when the editor hands off:
///  Build is done, Metadata is being filled in, Mint is ahead.
pub fn initial_steps() -> Vec<Step> {
    vec![
        Step::new("Build", StepStatus::Complete),
        Step::new("Metadata", StepStatus::Current),
        Step::new("Mint", StepStatus::Upcoming),
    ]
}

/// Mark `completed` complete and the step after it current.
///
/// Every other step keeps its state. An out-of-range index returns the steps
///  unchanged.
pub fn advance(steps: &[Step], completed: usize) -> Vec<Step> {
    let mut next = steps.to_vec();
    if completed >= next.len() {
        return next;
    }
    next[completed].status = StepStatus::Complete;
    if let Some(step) = next.get_mut(completed + 1) {
        step.status = StepStatus::Current;
    }
    next
}

/// True once every step is complete
pub fn is_finished(steps: &[Step]) -> bool {
    steps.iter().all(|s| s.status == StepStatus::Complete)
}

/// Index of the step currently in progress, if any
pub fn current(steps: &[Step]) -> Option<usize> {
    steps.iter().position(|s| s.status == StepStatus::Current)
}
