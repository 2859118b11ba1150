//! Action Router
//!
//! Maps the policy's discrete action index to a client command, and holds
//! the reward priority stack the policy is trained against.
//!
//! The priority stack works on raw latent values (logits), not on 0-100
//! profile scores:
//!
//! | Priority | Condition               | Rewarded action |
//! |----------|-------------------------|-----------------|
//! | 1        | attention > 0.5         | 0 (protect flow) |
//! | 2        | frustration > -0.1      | 2 (chatbot)      |
//! | 3        | attention < -0.2        | 3 (flashcards)   |
//! | 4        | mastery < -0.5          | 1 (video)        |
//! | 5        | otherwise               | 0 (do nothing)   |

use dextora_common::{
    Command, Intervention, LatentVector, RoutingError, ATTENTION_SLOT, FRUSTRATION_SLOT, MASTERY_SLOT,
};
use serde::Serialize;

/// Number of actions in the policy's action space
pub const ACTION_SPACE: i64 = 5;

/// Latent attention above which the student is in flow
pub const FLOW_ATTENTION: f32 = 0.5;

/// Latent frustration above which the student is struggling
pub const STRUGGLE_FRUSTRATION: f32 = -0.1;

/// Latent attention below which the student is fatigued
pub const FATIGUE_ATTENTION: f32 = -0.2;

/// Latent mastery below which there is a knowledge gap
pub const GAP_MASTERY: f32 = -0.5;

/// Map an action index to its command
pub fn route(action_index: i64) -> Result<Command, RoutingError> {
    match action_index {
        0 => Ok(Command::NoOp),
        1 => Ok(Command::Intervene(Intervention::VideoNudge)),
        2 => Ok(Command::Intervene(Intervention::ChatbotNudge)),
        3 => Ok(Command::Intervene(Intervention::FlashcardsNudge)),
        4 => Ok(Command::Intervene(Intervention::RoadmapAdjustment)),
        other => Err(RoutingError::UnmappedAction(other)),
    }
}

/// Action index of a command (inverse of [`route`])
pub fn action_index(command: &Command) -> i64 {
    match command {
        Command::NoOp => 0,
        Command::Intervene(Intervention::VideoNudge) => 1,
        Command::Intervene(Intervention::ChatbotNudge) => 2,
        Command::Intervene(Intervention::FlashcardsNudge) => 3,
        Command::Intervene(Intervention::RoadmapAdjustment) => 4,
    }
}

/// Latent traits read from the grounded slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardState {
    pub mastery: f32,
    pub frustration: f32,
    pub attention: f32,
}

impl RewardState {
    pub fn from_vector(vector: &LatentVector) -> Self {
        Self {
            mastery: vector.get(MASTERY_SLOT),
            frustration: vector.get(FRUSTRATION_SLOT),
            attention: vector.get(ATTENTION_SLOT),
        }
    }
}

/// Which rule of the priority stack a state falls under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityRule {
    FlowProtection,
    Struggle,
    Fatigue,
    KnowledgeGap,
    Default,
}

impl PriorityRule {
    /// First matching rule wins
    pub fn classify(state: &RewardState) -> Self {
        if state.attention > FLOW_ATTENTION {
            PriorityRule::FlowProtection
        } else if state.frustration > STRUGGLE_FRUSTRATION {
            PriorityRule::Struggle
        } else if state.attention < FATIGUE_ATTENTION {
            PriorityRule::Fatigue
        } else if state.mastery < GAP_MASTERY {
            PriorityRule::KnowledgeGap
        } else {
            PriorityRule::Default
        }
    }

    /// The action this rule rewards
    pub fn target_action(&self) -> i64 {
        match self {
            PriorityRule::FlowProtection => 0,
            PriorityRule::Struggle => 2,
            PriorityRule::Fatigue => 3,
            PriorityRule::KnowledgeGap => 1,
            PriorityRule::Default => 0,
        }
    }

    /// (reward when the target action is taken, reward otherwise)
    fn payoff(&self) -> (f64, f64) {
        match self {
            PriorityRule::FlowProtection => (1.0, -1.0),
            PriorityRule::Struggle | PriorityRule::Fatigue | PriorityRule::KnowledgeGap => (1.0, -0.5),
            PriorityRule::Default => (0.5, -0.1),
        }
    }
}

/// Training-time reward for taking `action` in `state`
pub fn reward(action: i64, state: &RewardState) -> f64 {
    let rule = PriorityRule::classify(state);
    let (hit, miss) = rule.payoff();
    if action == rule.target_action() {
        hit
    } else {
        miss
    }
}
