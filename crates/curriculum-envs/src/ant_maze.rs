//! Ant maze: planar navigation through a U-shaped maze toward a goal cell.
//!
//! Curriculum of four terms: goal-distance shaping, progress toward the
//! goal, control cost, and a proximity bonus. The main reward is the sparse
//! goal indicator (or negative distance when dense).

use curriculum_core::{
    CurriculumError, EnvManifest, Observation, Result, Reward, RewardCurriculum, RewardTermDef,
    StepInfo, StepResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::vec3::{Vec3, norm, sub};
use crate::{CurriculumEnv, RewardType, clamp_action, hash_state};

/// Torso counts as at the goal within this distance (m)
const GOAL_RADIUS: f64 = 0.45;
/// Episode step limit
const MAX_EPISODE_STEPS: u64 = 700;
/// One torque command per leg joint
const ACTION_DIM: usize = 8;
/// Integration step (s)
const DT: f64 = 0.05;
/// Torque-to-acceleration gain of the stand-in dynamics
const ACCEL_GAIN: f64 = 2.0;
/// Speed limit of the stand-in dynamics (m/s)
const MAX_SPEED: f64 = 4.0;
/// Half-extent of the maze (m)
const MAZE_HALF: f64 = 4.0;
/// Central wall of the U: reaches the right edge, passage on the left
const WALL_X: [f64; 2] = [-2.0, 4.0];
const WALL_Y: [f64; 2] = [-0.5, 0.5];
/// Torso resting height (m)
const TORSO_HEIGHT: f64 = 0.6;

/// Simulator snapshot the reward terms read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntMazeState {
    /// Torso position
    pub torso_pos: Vec3,
    /// Torso linear velocity
    pub torso_vel: Vec3,
    /// Goal cell position
    pub goal_pos: Vec3,
    /// Torques applied on the current step
    pub last_action: Vec<f64>,
}

impl AntMazeState {
    /// Goal position relative to the torso
    pub fn positional_difference_goal(&self) -> Vec3 {
        sub(self.goal_pos, self.torso_pos)
    }

    /// Velocity component pointing at the goal
    pub fn speed_toward_goal(&self) -> f64 {
        let to_goal = self.positional_difference_goal();
        let distance = norm(to_goal);
        if distance < 1e-9 {
            return 0.0;
        }
        (self.torso_vel[0] * to_goal[0]
            + self.torso_vel[1] * to_goal[1]
            + self.torso_vel[2] * to_goal[2])
            / distance
    }
}

fn build_curriculum() -> Result<RewardCurriculum<AntMazeState>> {
    RewardCurriculum::builder(3)
        .term("distance_to_goal", |s: &AntMazeState| {
            let distance = norm(s.positional_difference_goal());
            Ok(Reward::new(-distance.tanh()).component("distance_to_goal", -distance))
        })
        .term("progress_to_goal", |s: &AntMazeState| {
            let progress_weight = 0.5;
            let progress = progress_weight * s.speed_toward_goal();
            Ok(Reward::new(progress).component("progress_to_goal", progress))
        })
        .term("control_cost", |s: &AntMazeState| {
            let cost_weight = -0.05;
            let cost = cost_weight * s.last_action.iter().map(|a| a * a).sum::<f64>();
            Ok(Reward::new(cost).component("control_cost", cost))
        })
        .term("goal_bonus", |s: &AntMazeState| {
            let bonus = if norm(s.positional_difference_goal()) < GOAL_RADIUS {
                1.0
            } else {
                0.0
            };
            Ok(Reward::new(bonus).component("goal_reached_bonus", bonus))
        })
        .build()
}

/// Ant maze environment
pub struct AntMazeEnv {
    reward_type: RewardType,
    curriculum: RewardCurriculum<AntMazeState>,
    state: AntMazeState,
    rng: StdRng,
    elapsed_steps: u64,
}

impl AntMazeEnv {
    pub fn new(reward_type: RewardType) -> Result<Self> {
        let mut env = Self {
            reward_type,
            curriculum: build_curriculum()?,
            state: AntMazeState {
                torso_pos: [0.0, -2.0, TORSO_HEIGHT],
                torso_vel: [0.0; 3],
                goal_pos: [0.0, 2.0, TORSO_HEIGHT],
                last_action: vec![0.0; ACTION_DIM],
            },
            rng: StdRng::from_entropy(),
            elapsed_steps: 0,
        };
        env.reset(None);
        Ok(env)
    }

    /// Current simulator snapshot
    pub fn state(&self) -> &AntMazeState {
        &self.state
    }

    fn observe(&self) -> Observation {
        let s = &self.state;
        let mut observation = Vec::with_capacity(9 + ACTION_DIM);
        observation.extend_from_slice(&s.torso_pos);
        observation.extend_from_slice(&s.torso_vel);
        observation.extend_from_slice(&sub(s.goal_pos, s.torso_pos));
        observation.extend_from_slice(&s.last_action);
        Observation::Vector(observation)
    }

    /// Planar double-integrator stand-in for the quadruped: opposing leg
    /// torques produce net planar acceleration, walls and bounds clamp
    /// position.
    fn advance(&mut self, action: &[f64]) {
        let ax = ACCEL_GAIN * (action[0] - action[2] + action[4] - action[6]) / 4.0;
        let ay = ACCEL_GAIN * (action[1] - action[3] + action[5] - action[7]) / 4.0;

        self.state.torso_vel[0] = (self.state.torso_vel[0] + ax * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.state.torso_vel[1] = (self.state.torso_vel[1] + ay * DT).clamp(-MAX_SPEED, MAX_SPEED);

        let prev = self.state.torso_pos;
        let mut next = [
            (prev[0] + self.state.torso_vel[0] * DT).clamp(-MAZE_HALF, MAZE_HALF),
            (prev[1] + self.state.torso_vel[1] * DT).clamp(-MAZE_HALF, MAZE_HALF),
            TORSO_HEIGHT,
        ];

        // The central wall of the U: block entry, zero the blocked velocity.
        let in_wall = next[0] > WALL_X[0]
            && next[0] < WALL_X[1]
            && next[1] > WALL_Y[0]
            && next[1] < WALL_Y[1];
        if in_wall {
            next = [prev[0], prev[1], TORSO_HEIGHT];
            self.state.torso_vel = [0.0; 3];
        }

        self.state.torso_pos = next;
        self.state.last_action = action.to_vec();
    }
}

impl CurriculumEnv for AntMazeEnv {
    fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        // Start in the lower arm of the U, goal in the upper arm.
        self.state.torso_pos = [
            self.rng.gen_range(-0.25..=0.25),
            -2.0 + self.rng.gen_range(-0.25..=0.25),
            TORSO_HEIGHT,
        ];
        self.state.goal_pos = [
            self.rng.gen_range(-0.25..=0.25),
            2.0 + self.rng.gen_range(-0.25..=0.25),
            TORSO_HEIGHT,
        ];
        self.state.torso_vel = [0.0; 3];
        self.state.last_action = vec![0.0; ACTION_DIM];
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

        let goal_distance = norm(self.state.positional_difference_goal());
        let success = goal_distance < GOAL_RADIUS;
        let reward_main = match self.reward_type {
            RewardType::Sparse => {
                if success {
                    1.0
                } else {
                    0.0
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
            // Reaching the goal does not end the episode; the ant may keep it.
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
            name: "AntMazeUMaze".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            observation_dim: 9 + ACTION_DIM,
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
