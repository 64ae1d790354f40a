//! Fetch push: a 7-DoF arm pushes a block to a goal on a table.
//!
//! The gripper is locked closed and commanded by Cartesian displacements.
//! Training proceeds through four curriculum stages; each stage's reward is
//! an immutable curriculum built from the same pool of shaping terms, richer
//! stages layering a weighted copy of the previous stage's lead term on top.

use curriculum_core::{
    CurriculumError, EnvManifest, Observation, Result, Reward, RewardCurriculum, RewardTermDef,
    StepInfo, StepResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::vec3::{Vec3, add_scaled, norm, norm_xy, sub};
use crate::{CurriculumEnv, RewardType, clamp_action, hash_state};

/// Block counts as placed within this distance of the goal (m)
const DISTANCE_THRESHOLD: f64 = 0.05;
/// Block spawn offset range around the gripper (m)
const OBJ_RANGE: f64 = 0.15;
/// Goal offset range around the gripper home (m)
const TARGET_RANGE: f64 = 0.15;
/// Continuing task: episodes only ever truncate
const MAX_EPISODE_STEPS: u64 = 50;
/// Gripper home position after reset (m)
const GRIPPER_HOME: Vec3 = [1.3419, 0.7491, 0.555];
/// Table surface height (m)
const TABLE_HEIGHT: f64 = 0.42;
/// Largest gripper displacement per control step (m)
const ACTION_SCALE: f64 = 0.05;
/// Control period at 25 Hz (s)
const DT: f64 = 0.04;
/// Gripper-to-block distance below which the block is pushed (m)
const CONTACT_RADIUS: f64 = 0.06;

/// Curriculum stage for the push task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTask {
    AlignEndEffectorWithBlock,
    MatchEndEffectorVelocityWithBlock,
    ReduceDistanceToGoal,
    MoveBlockToTargetPosition,
}

impl FetchTask {
    /// Stages in training order
    pub const ALL: [FetchTask; 4] = [
        FetchTask::AlignEndEffectorWithBlock,
        FetchTask::MatchEndEffectorVelocityWithBlock,
        FetchTask::ReduceDistanceToGoal,
        FetchTask::MoveBlockToTargetPosition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FetchTask::AlignEndEffectorWithBlock => "align_end_effector_with_block",
            FetchTask::MatchEndEffectorVelocityWithBlock => {
                "match_end_effector_velocity_with_block"
            }
            FetchTask::ReduceDistanceToGoal => "reduce_distance_to_goal",
            FetchTask::MoveBlockToTargetPosition => "move_block_to_target_position",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        FetchTask::ALL
            .into_iter()
            .find(|task| task.name() == name)
            .ok_or_else(|| CurriculumError::UnknownTask(name.to_string()))
    }
}

/// Simulator snapshot the reward terms read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState {
    /// Gripper site position
    pub grip_pos: Vec3,
    /// Block position
    pub block_pos: Vec3,
    /// Block linear velocity relative to the gripper
    pub block_velp: Vec3,
    /// Gripper linear velocity
    pub grip_velp: Vec3,
    /// Goal position on the table
    pub goal: Vec3,
}

impl FetchState {
    pub fn end_effector_position(&self) -> Vec3 {
        self.grip_pos
    }

    pub fn block_position(&self) -> Vec3 {
        self.block_pos
    }

    pub fn block_relative_linear_velocity(&self) -> Vec3 {
        self.block_velp
    }

    pub fn end_effector_linear_velocity(&self) -> Vec3 {
        self.grip_velp
    }

    pub fn goal_position(&self) -> Vec3 {
        self.goal
    }
}

fn align_end_effector_with_block(state: &FetchState) -> Reward {
    let distance = norm(sub(state.end_effector_position(), state.block_position()));
    Reward::new(-distance).component("distance_to_block", -distance)
}

fn match_end_effector_velocity_with_block(state: &FetchState) -> Reward {
    // -tanh keeps the penalty in [-1, 0] however fast the block moves.
    let velocity_difference = norm(state.block_relative_linear_velocity());
    let velocity_match = -velocity_difference.tanh();
    Reward::new(velocity_match).component("velocity_match", velocity_match)
}

fn reduce_distance_to_goal(state: &FetchState) -> Reward {
    let distance_to_goal = norm(sub(state.block_position(), state.goal_position()));
    Reward::new(-distance_to_goal.tanh()).component("distance_to_goal", -distance_to_goal)
}

fn push_task_reward(state: &FetchState) -> Reward {
    let distance_weight = 1.0;
    let velocity_weight = 0.1;

    // Planar distance only; the block never leaves the table.
    let distance_to_goal = norm_xy(sub(state.block_position(), state.goal_position()));
    let distance_reward = -distance_weight * distance_to_goal;
    let block_velocity_reward = -velocity_weight * norm(state.block_relative_linear_velocity());
    let ee_velocity_reward = -velocity_weight * norm(state.end_effector_linear_velocity());

    Reward::new(distance_reward + block_velocity_reward + ee_velocity_reward)
        .component("distance_reward", distance_reward)
        .component("block_velocity_reward", block_velocity_reward)
        .component("ee_velocity_reward", ee_velocity_reward)
}

/// Scale the scalar only; breakdown entries stay at their raw values.
fn weighted(reward: Reward, weight: f64) -> Reward {
    Reward {
        total: weight * reward.total,
        breakdown: reward.breakdown,
    }
}

fn curriculum_for(task: FetchTask) -> Result<RewardCurriculum<FetchState>> {
    match task {
        FetchTask::AlignEndEffectorWithBlock => RewardCurriculum::builder(0)
            .term("align_end_effector_with_block", |s: &FetchState| {
                Ok(align_end_effector_with_block(s))
            })
            .build(),
        FetchTask::MatchEndEffectorVelocityWithBlock => RewardCurriculum::builder(1)
            .term("match_end_effector_velocity_with_block", |s: &FetchState| {
                Ok(match_end_effector_velocity_with_block(s))
            })
            .term("align_end_effector_with_block", |s: &FetchState| {
                Ok(weighted(align_end_effector_with_block(s), 5.0))
            })
            .build(),
        FetchTask::ReduceDistanceToGoal => RewardCurriculum::builder(1)
            .term("reduce_distance_to_goal", |s: &FetchState| {
                Ok(reduce_distance_to_goal(s))
            })
            .term("match_end_effector_velocity_with_block", |s: &FetchState| {
                Ok(weighted(match_end_effector_velocity_with_block(s), 5.0))
            })
            .build(),
        FetchTask::MoveBlockToTargetPosition => RewardCurriculum::builder(1)
            .term("move_block_to_target_position", |s: &FetchState| {
                Ok(push_task_reward(s))
            })
            .term("reduce_distance_to_goal", |s: &FetchState| {
                Ok(weighted(reduce_distance_to_goal(s), 5.0))
            })
            .build(),
    }
}

/// Fetch push environment
pub struct FetchPushEnv {
    reward_type: RewardType,
    task: FetchTask,
    curriculum: RewardCurriculum<FetchState>,
    state: FetchState,
    rng: StdRng,
    elapsed_steps: u64,
}

impl FetchPushEnv {
    pub fn new(reward_type: RewardType) -> Result<Self> {
        let task = FetchTask::AlignEndEffectorWithBlock;
        let mut env = Self {
            reward_type,
            task,
            curriculum: curriculum_for(task)?,
            state: FetchState {
                grip_pos: GRIPPER_HOME,
                block_pos: [GRIPPER_HOME[0], GRIPPER_HOME[1], TABLE_HEIGHT],
                block_velp: [0.0; 3],
                grip_velp: [0.0; 3],
                goal: [GRIPPER_HOME[0], GRIPPER_HOME[1], TABLE_HEIGHT],
            },
            rng: StdRng::from_entropy(),
            elapsed_steps: 0,
        };
        env.reset(None);
        Ok(env)
    }

    /// Switch curriculum stage. The incoming stage's curriculum is built
    /// fresh and is immutable until the next switch.
    pub fn set_task(&mut self, task: FetchTask) -> Result<()> {
        self.curriculum = curriculum_for(task)?;
        self.task = task;
        debug!(task = task.name(), "curriculum stage switched");
        Ok(())
    }

    pub fn task(&self) -> FetchTask {
        self.task
    }

    /// Current simulator snapshot
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    fn observe(&self) -> Observation {
        let s = &self.state;
        let rel = sub(s.block_pos, s.grip_pos);
        let mut observation = Vec::with_capacity(15);
        observation.extend_from_slice(&s.grip_pos);
        observation.extend_from_slice(&s.block_pos);
        observation.extend_from_slice(&rel);
        observation.extend_from_slice(&s.block_velp);
        observation.extend_from_slice(&s.grip_velp);
        Observation::Goal {
            observation,
            achieved_goal: s.block_pos.to_vec(),
            desired_goal: s.goal.to_vec(),
        }
    }

    /// Tabletop kinematics stand-in for the physics backend: the gripper
    /// follows the commanded displacement and drags the block planarly while
    /// in contact. Enough to move the derived quantities the terms read.
    fn advance(&mut self, action: &[f64]) {
        let displacement = [
            ACTION_SCALE * action[0],
            ACTION_SCALE * action[1],
            ACTION_SCALE * action[2],
        ];
        let prev_grip = self.state.grip_pos;
        let prev_block = self.state.block_pos;

        self.state.grip_pos = add_scaled(prev_grip, displacement, 1.0);
        // Keep the gripper above the table.
        self.state.grip_pos[2] = self.state.grip_pos[2].max(TABLE_HEIGHT + 0.005);

        if norm(sub(self.state.grip_pos, prev_block)) < CONTACT_RADIUS {
            self.state.block_pos[0] += displacement[0];
            self.state.block_pos[1] += displacement[1];
        }

        self.state.grip_velp = [
            (self.state.grip_pos[0] - prev_grip[0]) / DT,
            (self.state.grip_pos[1] - prev_grip[1]) / DT,
            (self.state.grip_pos[2] - prev_grip[2]) / DT,
        ];
        let block_vel = [
            (self.state.block_pos[0] - prev_block[0]) / DT,
            (self.state.block_pos[1] - prev_block[1]) / DT,
            (self.state.block_pos[2] - prev_block[2]) / DT,
        ];
        self.state.block_velp = sub(block_vel, self.state.grip_velp);
    }
}

impl CurriculumEnv for FetchPushEnv {
    fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        self.state.grip_pos = GRIPPER_HOME;
        self.state.grip_velp = [0.0; 3];
        self.state.block_velp = [0.0; 3];

        // Resample until the block spawns clear of the gripper.
        loop {
            let bx = GRIPPER_HOME[0] + self.rng.gen_range(-OBJ_RANGE..=OBJ_RANGE);
            let by = GRIPPER_HOME[1] + self.rng.gen_range(-OBJ_RANGE..=OBJ_RANGE);
            self.state.block_pos = [bx, by, TABLE_HEIGHT];
            if norm_xy(sub(self.state.block_pos, GRIPPER_HOME)) > 0.1 {
                break;
            }
        }

        let gx = GRIPPER_HOME[0] + self.rng.gen_range(-TARGET_RANGE..=TARGET_RANGE);
        let gy = GRIPPER_HOME[1] + self.rng.gen_range(-TARGET_RANGE..=TARGET_RANGE);
        self.state.goal = [gx, gy, TABLE_HEIGHT];

        self.elapsed_steps = 0;
        self.observe()
    }

    fn step(&mut self, action: &[f64]) -> Result<StepResult> {
        if action.len() != 4 {
            return Err(CurriculumError::InvalidAction(format!(
                "expected 4 action dims, got {}",
                action.len()
            )));
        }
        let action = clamp_action(action);
        self.advance(&action);
        self.elapsed_steps += 1;

        let goal_distance = norm(sub(self.state.block_pos, self.state.goal));
        let success = goal_distance < DISTANCE_THRESHOLD;
        let reward_main = match self.reward_type {
            RewardType::Sparse => {
                if success {
                    0.0
                } else {
                    -1.0
                }
            }
            RewardType::Dense => -goal_distance,
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
            // Continuing task: holding the block at the goal is part of it.
            terminated: false,
            truncated: self.elapsed_steps >= MAX_EPISODE_STEPS,
            info: StepInfo {
                success,
                reward_main,
                reward_task: total,
                reward_dict: breakdown,
            },
        })
    }

    fn manifest(&self) -> EnvManifest {
        EnvManifest {
            name: "FetchPush".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            observation_dim: 15,
            action_dim: 4,
            max_episode_steps: Some(MAX_EPISODE_STEPS),
            tasks: FetchTask::ALL.iter().map(|t| t.name().into()).collect(),
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

    fn test_state() -> FetchState {
        FetchState {
            grip_pos: [1.0, 0.5, 0.5],
            block_pos: [1.3, 0.9, 0.42],
            block_velp: [0.0, 0.3, 0.4],
            grip_velp: [0.3, 0.0, 0.0],
            goal: [1.3, 0.5, 0.42],
        }
    }

    #[test]
    fn align_stage_matches_hand_computed_total() {
        let state = test_state();
        let curriculum = curriculum_for(FetchTask::AlignEndEffectorWithBlock).unwrap();
        let reward = curriculum.evaluate(&state).unwrap();

        let distance = norm(sub(state.grip_pos, state.block_pos));
        assert!((reward.total + distance).abs() < 1e-12);
        assert_eq!(reward.breakdown["distance_to_block"], -distance);
    }

    #[test]
    fn velocity_stage_layers_weighted_align_term() {
        let state = test_state();
        let curriculum = curriculum_for(FetchTask::MatchEndEffectorVelocityWithBlock).unwrap();
        let reward = curriculum.evaluate(&state).unwrap();

        let velocity_match = -norm(state.block_velp).tanh();
        let align = -norm(sub(state.grip_pos, state.block_pos));
        assert!((reward.total - (velocity_match + 5.0 * align)).abs() < 1e-12);
        // Breakdown entries keep raw values even for weighted terms.
        assert_eq!(reward.breakdown["distance_to_block"], align);
        assert_eq!(reward.breakdown["velocity_match"], velocity_match);
    }

    #[test]
    fn final_stage_reports_all_push_components() {
        let curriculum = curriculum_for(FetchTask::MoveBlockToTargetPosition).unwrap();
        let reward = curriculum.evaluate(&test_state()).unwrap();
        for key in [
            "distance_reward",
            "block_velocity_reward",
            "ee_velocity_reward",
            "distance_to_goal",
        ] {
            assert!(reward.breakdown.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn unknown_task_name_is_rejected() {
        assert!(matches!(
            FetchTask::parse("balance_block_on_gripper"),
            Err(CurriculumError::UnknownTask(_))
        ));
        assert_eq!(
            FetchTask::parse("reduce_distance_to_goal").unwrap(),
            FetchTask::ReduceDistanceToGoal
        );
    }

    #[test]
    fn wrong_action_dim_is_rejected() {
        let mut env = FetchPushEnv::new(RewardType::Sparse).unwrap();
        env.reset(Some(7));
        assert!(matches!(
            env.step(&[0.0; 3]),
            Err(CurriculumError::InvalidAction(_))
        ));
    }

    #[test]
    fn truncates_after_fifty_steps_without_terminating() {
        let mut env = FetchPushEnv::new(RewardType::Sparse).unwrap();
        env.reset(Some(3));
        for step in 1..=MAX_EPISODE_STEPS {
            let result = env.step(&[0.1, 0.0, 0.0, 0.0]).unwrap();
            assert!(!result.terminated);
            assert_eq!(result.truncated, step == MAX_EPISODE_STEPS);
        }
    }

    #[test]
    fn info_carries_main_and_task_entries() {
        let mut env = FetchPushEnv::new(RewardType::Dense).unwrap();
        env.reset(Some(11));
        let result = env.step(&[0.2, -0.1, 0.0, 0.0]).unwrap();
        assert_eq!(result.info.reward_dict["task"], result.info.reward_task);
        assert_eq!(result.info.reward_dict["main"], result.info.reward_main);
        assert_eq!(result.reward, result.info.reward_task);
    }

    #[test]
    fn seeded_reset_is_reproducible() {
        let mut a = FetchPushEnv::new(RewardType::Sparse).unwrap();
        let mut b = FetchPushEnv::new(RewardType::Sparse).unwrap();
        a.reset(Some(42));
        b.reset(Some(42));
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());

        let ra = a.step(&[0.3, 0.2, -0.1, 0.0]).unwrap();
        let rb = b.step(&[0.3, 0.2, -0.1, 0.0]).unwrap();
        assert_eq!(ra.reward, rb.reward);
        assert_eq!(ra.info.reward_dict, rb.info.reward_dict);
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[test]
    fn stage_switch_changes_active_terms() {
        let mut env = FetchPushEnv::new(RewardType::Sparse).unwrap();
        env.set_task(FetchTask::ReduceDistanceToGoal).unwrap();
        let names: Vec<_> = env.manifest().reward_terms;
        assert_eq!(names[0].name, "reduce_distance_to_goal");
        assert_eq!(names.len(), 2);
    }
}
