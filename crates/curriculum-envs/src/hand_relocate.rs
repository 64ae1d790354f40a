//! Adroit hand relocate: carry a ball to a floating target position.
//!
//! The curriculum here is four indexed shaping terms layered during training:
//! approach the ball, a second (linear) approach penalty, approach the
//! target, and carry the ball to the target. The main reward is the classic
//! relocate reward, sparse or dense.

use curriculum_core::{
    CurriculumError, EnvManifest, Observation, Result, Reward, RewardCurriculum, RewardTermDef,
    StepInfo, StepResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::vec3::{Vec3, norm, sub};
use crate::{CurriculumEnv, RewardType, clamp_action, hash_state};

/// Ball counts as relocated within this distance of the target (m)
const GOAL_RADIUS: f64 = 0.1;
/// Ball is off the table above this height (m)
const LIFT_HEIGHT: f64 = 0.04;
/// Episode step limit (the task itself never terminates)
const MAX_EPISODE_STEPS: u64 = 200;
/// Actuator count of the Adroit hand
const ACTION_DIM: usize = 30;
/// Palm displacement per unit wrist command (m)
const PALM_SCALE: f64 = 0.02;
/// Palm-to-ball distance below which the ball is carried (m)
const GRASP_RADIUS: f64 = 0.06;

/// Simulator snapshot the reward terms read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelocateState {
    /// Grasp-site (palm) position
    pub palm_pos: Vec3,
    /// Ball position
    pub obj_pos: Vec3,
    /// Target site position
    pub target_pos: Vec3,
}

impl RelocateState {
    /// Ball position relative to the palm
    pub fn positional_difference_ball(&self) -> Vec3 {
        sub(self.obj_pos, self.palm_pos)
    }

    /// Target position relative to the palm
    pub fn positional_difference_target(&self) -> Vec3 {
        sub(self.target_pos, self.palm_pos)
    }

    /// Target position relative to the ball
    pub fn positional_difference_ball_to_target(&self) -> Vec3 {
        sub(self.target_pos, self.obj_pos)
    }
}

fn build_curriculum() -> Result<RewardCurriculum<RelocateState>> {
    RewardCurriculum::builder(3)
        .term("approach_ball", |s: &RelocateState| {
            let distance_to_ball = norm(s.positional_difference_ball());
            let reward_distance_to_ball = -distance_to_ball.tanh();
            Ok(Reward::new(reward_distance_to_ball)
                .component("distance_to_ball", reward_distance_to_ball))
        })
        .term("ball_distance_penalty", |s: &RelocateState| {
            let ball_distance_penalty = norm(s.positional_difference_ball());
            let penalty_weight = -1.0;
            Ok(Reward::new(penalty_weight * ball_distance_penalty).component(
                "positional_difference_ball_penalty",
                penalty_weight * ball_distance_penalty,
            ))
        })
        .term("approach_target", |s: &RelocateState| {
            // The breakdown entry keeps the raw distance; only the scalar
            // contribution is negated.
            let target_approach_reward = norm(s.positional_difference_target());
            let target_approach_weight = -1.0;
            Ok(Reward::new(target_approach_weight * target_approach_reward)
                .component("target_approach_reward", target_approach_reward))
        })
        .term("ball_to_target", |s: &RelocateState| {
            let ball_to_target_distance = norm(s.positional_difference_ball_to_target());
            let distance_to_target_reward = -ball_to_target_distance.tanh();
            Ok(Reward::new(distance_to_target_reward)
                .component("distance_to_target_reward", distance_to_target_reward))
        })
        .build()
}

/// Adroit hand relocate environment
pub struct HandRelocateEnv {
    reward_type: RewardType,
    curriculum: RewardCurriculum<RelocateState>,
    state: RelocateState,
    rng: StdRng,
    elapsed_steps: u64,
}

impl HandRelocateEnv {
    pub fn new(reward_type: RewardType) -> Result<Self> {
        let mut env = Self {
            reward_type,
            curriculum: build_curriculum()?,
            state: RelocateState {
                palm_pos: [0.0, 0.0, 0.15],
                obj_pos: [0.0, 0.0, 0.035],
                target_pos: [0.0, 0.0, 0.25],
            },
            rng: StdRng::from_entropy(),
            elapsed_steps: 0,
        };
        env.reset(None);
        Ok(env)
    }

    /// Current simulator snapshot
    pub fn state(&self) -> &RelocateState {
        &self.state
    }

    fn observe(&self) -> Observation {
        let s = &self.state;
        let palm_obj = sub(s.palm_pos, s.obj_pos);
        let palm_target = sub(s.palm_pos, s.target_pos);
        let obj_target = sub(s.obj_pos, s.target_pos);
        let mut observation = Vec::with_capacity(9);
        observation.extend_from_slice(&palm_obj);
        observation.extend_from_slice(&palm_target);
        observation.extend_from_slice(&obj_target);
        Observation::Vector(observation)
    }

    /// Dense relocate reward: approach, lift bonus, carry, proximity bonuses.
    fn dense_main_reward(&self, goal_distance: f64) -> f64 {
        let s = &self.state;
        let mut reward = 0.1 * norm(sub(s.palm_pos, s.obj_pos));
        if s.obj_pos[2] > LIFT_HEIGHT {
            reward += 1.0;
            reward += -0.5 * norm(sub(s.palm_pos, s.target_pos));
            reward += -0.5 * norm(sub(s.obj_pos, s.target_pos));
        }
        if goal_distance < GOAL_RADIUS {
            reward += 10.0;
        }
        if goal_distance < 0.05 {
            reward += 20.0;
        }
        reward
    }

    /// Kinematics stand-in: the wrist commands translate the palm, and the
    /// ball rides along once grasped.
    fn advance(&mut self, action: &[f64]) {
        let displacement = [
            PALM_SCALE * action[0],
            PALM_SCALE * action[1],
            PALM_SCALE * action[2],
        ];
        let grasped = norm(self.state.positional_difference_ball()) < GRASP_RADIUS;
        for axis in 0..3 {
            self.state.palm_pos[axis] += displacement[axis];
            if grasped {
                self.state.obj_pos[axis] += displacement[axis];
            }
        }
        self.state.palm_pos[2] = self.state.palm_pos[2].max(0.03);
        // The ball rests on the table unless carried.
        self.state.obj_pos[2] = self.state.obj_pos[2].max(0.035);
    }
}

impl CurriculumEnv for HandRelocateEnv {
    fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.state.palm_pos = [0.0, 0.0, 0.15];
        self.state.obj_pos = [
            self.rng.gen_range(-0.15..=0.15),
            self.rng.gen_range(-0.15..=0.3),
            0.035,
        ];
        self.state.target_pos = [
            self.rng.gen_range(-0.2..=0.2),
            self.rng.gen_range(-0.2..=0.2),
            self.rng.gen_range(0.15..=0.35),
        ];
        self.elapsed_steps = 0;
        self.observe()
    }

    fn step(&mut self, action: &[f64]) -> Result<StepResult> {
        if action.len() != ACTION_DIM {
            return Err(CurriculumError::InvalidAction(format!(
                "expected {ACTION_DIM} action dims, got {}",
                action.len()
            )));
        }
        let action = clamp_action(action);
        self.advance(&action);
        self.elapsed_steps += 1;

        let goal_distance = norm(sub(self.state.obj_pos, self.state.target_pos));
        let goal_achieved = goal_distance < GOAL_RADIUS;
        let reward_main = match self.reward_type {
            RewardType::Sparse => {
                if goal_achieved {
                    10.0
                } else {
                    -0.1
                }
            }
            RewardType::Dense => self.dense_main_reward(goal_distance),
        };

        let Reward {
            total,
            mut breakdown,
        } = self.curriculum.evaluate(&self.state)?;
        breakdown.insert("main".into(), reward_main);
        breakdown.insert("task".into(), total);

        Ok(StepResult {
            observation: self.observe(),
            reward: total,
            terminated: false,
            truncated: self.elapsed_steps >= MAX_EPISODE_STEPS,
            info: StepInfo {
                success: goal_achieved,
                reward_main,
                reward_task: total,
                reward_dict: breakdown,
            },
        })
    }

    fn manifest(&self) -> EnvManifest {
        EnvManifest {
            name: "AdroitHandRelocate".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            observation_dim: 9,
            action_dim: ACTION_DIM,
            max_episode_steps: Some(MAX_EPISODE_STEPS),
            tasks: vec![],
            reward_terms: self
                .curriculum
                .term_names()
                .map(RewardTermDef::named)
                .collect(),
        }
    }

    fn state_hash(&self) -> Result<String> {
        hash_state(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> RelocateState {
        RelocateState {
            palm_pos: [0.1, 0.0, 0.2],
            obj_pos: [0.0, 0.1, 0.035],
            target_pos: [-0.1, -0.1, 0.3],
        }
    }

    #[test]
    fn curriculum_total_is_sum_of_all_four_terms() {
        let state = test_state();
        let reward = build_curriculum().unwrap().evaluate(&state).unwrap();

        let ball_distance = norm(state.positional_difference_ball());
        let target_distance = norm(state.positional_difference_target());
        let carry_distance = norm(state.positional_difference_ball_to_target());
        let expected =
            -ball_distance.tanh() - ball_distance - target_distance - carry_distance.tanh();
        assert!((reward.total - expected).abs() < 1e-12);
    }

    #[test]
    fn target_approach_breakdown_keeps_positive_distance() {
        let state = test_state();
        let reward = build_curriculum().unwrap().evaluate(&state).unwrap();
        let target_distance = norm(state.positional_difference_target());
        assert_eq!(reward.breakdown["target_approach_reward"], target_distance);
        assert!(target_distance > 0.0);
    }

    #[test]
    fn breakdown_has_one_entry_per_term() {
        let reward = build_curriculum().unwrap().evaluate(&test_state()).unwrap();
        for key in [
            "distance_to_ball",
            "positional_difference_ball_penalty",
            "target_approach_reward",
            "distance_to_target_reward",
        ] {
            assert!(reward.breakdown.contains_key(key), "missing {key}");
        }
        assert_eq!(reward.breakdown.len(), 4);
    }

    #[test]
    fn sparse_main_reward_flips_on_goal() {
        let mut env = HandRelocateEnv::new(RewardType::Sparse).unwrap();
        env.reset(Some(5));
        // Drop the ball onto the target directly.
        env.state.obj_pos = env.state.target_pos;
        let result = env.step(&vec![0.0; ACTION_DIM]).unwrap();
        assert!(result.info.success);
        assert_eq!(result.info.reward_main, 10.0);

        env.state.obj_pos = [1.0, 1.0, 0.035];
        let result = env.step(&vec![0.0; ACTION_DIM]).unwrap();
        assert!(!result.info.success);
        assert_eq!(result.info.reward_main, -0.1);
    }

    #[test]
    fn dense_main_reward_adds_lift_and_proximity_bonuses() {
        let mut env = HandRelocateEnv::new(RewardType::Dense).unwrap();
        env.reset(Some(5));
        env.state.palm_pos = [0.0, 0.0, 0.3];
        env.state.obj_pos = [0.0, 0.0, 0.3];
        env.state.target_pos = [0.0, 0.0, 0.31];
        let goal_distance = 0.01;
        // Lifted and within both bonus radii: 0.1*0 + 1 - 0.5*0.01 - 0.5*0.01 + 10 + 20
        let expected = 1.0 - 0.5 * goal_distance - 0.5 * goal_distance + 30.0;
        assert!((env.dense_main_reward(goal_distance) - expected).abs() < 1e-12);
    }

    #[test]
    fn wrong_action_dim_is_rejected() {
        let mut env = HandRelocateEnv::new(RewardType::Sparse).unwrap();
        env.reset(Some(1));
        assert!(matches!(
            env.step(&[0.0; 4]),
            Err(CurriculumError::InvalidAction(_))
        ));
    }

    #[test]
    fn seeded_reset_and_steps_are_reproducible() {
        let mut a = HandRelocateEnv::new(RewardType::Dense).unwrap();
        let mut b = HandRelocateEnv::new(RewardType::Dense).unwrap();
        a.reset(Some(99));
        b.reset(Some(99));
        let action: Vec<f64> = (0..ACTION_DIM).map(|i| (i as f64 / 30.0) - 0.5).collect();
        let ra = a.step(&action).unwrap();
        let rb = b.step(&action).unwrap();
        assert_eq!(ra.info.reward_dict, rb.info.reward_dict);
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }
}
