//! # curriculum-envs
//!
//! Environment wrappers driven by reward curricula.
//!
//! Each environment owns a serializable state snapshot (the derived
//! quantities a physics backend would expose), an immutable
//! [`RewardCurriculum`](curriculum_core::RewardCurriculum) over that
//! snapshot, and `reset`/`step` in the gymnasium mold. The curriculum total
//! is the step's training reward; the merged breakdown lands in the step
//! info under `reward_dict` alongside the separately computed main reward.

pub mod ant_maze;
pub mod fetch_push;
pub mod hand_relocate;
pub mod humanoid;
pub mod vec3;

pub use ant_maze::AntMazeEnv;
pub use fetch_push::{FetchPushEnv, FetchTask};
pub use hand_relocate::HandRelocateEnv;
pub use humanoid::HumanoidEnv;

use curriculum_core::{EnvManifest, Observation, Result, StepResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reward type for environments with a sparse/dense main-reward switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[default]
    Sparse,
    Dense,
}

/// Trait for environments driven by a reward curriculum
pub trait CurriculumEnv {
    /// Start a new episode; a seed reproduces the initial snapshot exactly
    fn reset(&mut self, seed: Option<u64>) -> Observation;

    /// Apply an action and advance one control step
    fn step(&mut self, action: &[f64]) -> Result<StepResult>;

    /// Manifest describing the environment surface
    fn manifest(&self) -> EnvManifest;

    /// Hash of the current state snapshot, for determinism verification
    fn state_hash(&self) -> Result<String>;
}

/// SHA-256 over the serialized snapshot. Byte-identical snapshots hash
/// identically, so identical hashes imply identical curriculum output.
pub(crate) fn hash_state<S: Serialize>(state: &S) -> Result<String> {
    let bytes = serde_json::to_vec(state)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Clamp every action component to `[-1, 1]`
pub(crate) fn clamp_action(action: &[f64]) -> Vec<f64> {
    action.iter().map(|a| a.clamp(-1.0, 1.0)).collect()
}
