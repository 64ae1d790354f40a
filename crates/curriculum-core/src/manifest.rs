//! Environment manifest types

use serde::{Deserialize, Serialize};

use crate::reward::RewardTermDef;

/// Manifest describing an environment's surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvManifest {
    /// Environment name
    pub name: String,
    /// Environment version
    pub version: String,
    /// Observation vector length (flattened, for goal-aware spaces)
    pub observation_dim: usize,
    /// Action vector length
    pub action_dim: usize,
    /// Steps before the episode is truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_episode_steps: Option<u64>,
    /// Curriculum stage names, in training order
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Reward terms of the currently active curriculum
    #[serde(default)]
    pub reward_terms: Vec<RewardTermDef>,
}

impl Default for EnvManifest {
    fn default() -> Self {
        Self {
            name: "Unknown".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            observation_dim: 0,
            action_dim: 0,
            max_episode_steps: None,
            tasks: vec![],
            reward_terms: vec![],
        }
    }
}
