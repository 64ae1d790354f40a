//! Step and observation types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reward::RewardComponents;

/// Result of one environment step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Observation after the action was applied
    pub observation: Observation,

    /// Curriculum reward driving training (sum of the active reward terms)
    pub reward: f64,

    /// Episode reached a terminal state (e.g. the robot fell)
    pub terminated: bool,

    /// Episode cut off by the step limit
    pub truncated: bool,

    /// Diagnostics for logging and analysis
    pub info: StepInfo,
}

/// Per-step diagnostic info
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Goal condition satisfied this step
    pub success: bool,

    /// Primary task reward (sparse or dense), computed apart from the curriculum
    pub reward_main: f64,

    /// Curriculum total, duplicated here for log scrapers
    pub reward_task: f64,

    /// Merged reward breakdown, including the `main` and `task` entries
    #[serde(default)]
    pub reward_dict: RewardComponents,
}

/// Environment observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    /// Flat vector observation
    Vector(Vec<f64>),
    /// Goal-aware observation (manipulation tasks)
    Goal {
        observation: Vec<f64>,
        achieved_goal: Vec<f64>,
        desired_goal: Vec<f64>,
    },
    /// Structured observation
    Structured(HashMap<String, serde_json::Value>),
}

impl Observation {
    /// Flat vector contents, if this is a vector observation
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Observation::Vector(values) => Some(values),
            _ => None,
        }
    }
}
