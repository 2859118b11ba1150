//! Command - the intervention instruction returned to the client
//!
//! Wire shape is `{ "type", "action", "route" }`, where `route` is a client
//! deep link (or `null` for no-op).

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// The interventions the client knows how to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intervention {
    VideoNudge,
    ChatbotNudge,
    FlashcardsNudge,
    RoadmapAdjustment,
}

impl Intervention {
    pub const ALL: [Intervention; 4] = [
        Intervention::VideoNudge,
        Intervention::ChatbotNudge,
        Intervention::FlashcardsNudge,
        Intervention::RoadmapAdjustment,
    ];

    /// Command family understood by the client
    pub fn action_type(&self) -> &'static str {
        match self {
            Intervention::RoadmapAdjustment => "ROADMAP_UPDATE",
            _ => "NUDGE",
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            Intervention::VideoNudge => "SWITCH_TO_VIDEO",
            Intervention::ChatbotNudge => "SWITCH_TO_CHATBOT",
            Intervention::FlashcardsNudge => "SWITCH_TO_FLASHCARDS",
            Intervention::RoadmapAdjustment => "ADJUST_SCHEDULE",
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            Intervention::VideoNudge => "/video_player",
            Intervention::ChatbotNudge => "/ai_tutor",
            Intervention::FlashcardsNudge => "/revision",
            Intervention::RoadmapAdjustment => "/roadmap",
        }
    }
}

/// Either "do nothing" or one intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    NoOp,
    Intervene(Intervention),
}

impl Command {
    pub fn action_type(&self) -> &'static str {
        match self {
            Command::NoOp => "NO_OP",
            Command::Intervene(i) => i.action_type(),
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            Command::NoOp => "NONE",
            Command::Intervene(i) => i.action_name(),
        }
    }

    pub fn route(&self) -> Option<&'static str> {
        match self {
            Command::NoOp => None,
            Command::Intervene(i) => Some(i.route()),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Command::NoOp)
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Command", 3)?;
        s.serialize_field("type", self.action_type())?;
        s.serialize_field("action", self.action_name())?;
        s.serialize_field("route", &self.route())?;
        s.end()
    }
}
