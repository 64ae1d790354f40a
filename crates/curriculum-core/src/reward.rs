//! Reward types and reward-term definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar reward with its labeled sub-components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Total scalar reward
    pub total: f64,
    /// Labeled sub-components for analysis
    #[serde(default)]
    pub breakdown: RewardComponents,
}

/// Labeled reward sub-components
pub type RewardComponents = HashMap<String, f64>;

impl Reward {
    /// Reward with no breakdown entries
    pub fn new(total: f64) -> Self {
        Self {
            total,
            breakdown: RewardComponents::new(),
        }
    }

    /// Attach a labeled sub-component
    pub fn component(mut self, name: impl Into<String>, value: f64) -> Self {
        self.breakdown.insert(name.into(), value);
        self
    }
}

/// Definition of a reward term, as advertised in an environment manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTermDef {
    /// Term name
    pub name: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    /// Default weight
    #[serde(default = "default_weight")]
    pub default_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl RewardTermDef {
    /// Term definition with the default weight and no metadata
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            range: None,
            default_weight: default_weight(),
        }
    }
}
