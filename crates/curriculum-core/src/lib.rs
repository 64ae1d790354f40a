//! # curriculum-core
//!
//! Core types for reward-curriculum environments.
//!
//! This crate provides the foundational types used across all curriculum
//! environments:
//! - Reward curriculum aggregation (ordered reward terms, summed and merged)
//! - Reward and breakdown types
//! - Step results and observations
//! - Environment manifests
//! - Error types

pub mod curriculum;
pub mod error;
pub mod manifest;
pub mod reward;
pub mod step;

pub use curriculum::{CurriculumBuilder, RewardCurriculum, TermFn};
pub use error::{CurriculumError, Result, TermError};
pub use manifest::EnvManifest;
pub use reward::{Reward, RewardComponents, RewardTermDef};
pub use step::{Observation, StepInfo, StepResult};
