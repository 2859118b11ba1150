//! Telemetry - behavioral samples streamed by the client
//!
//! A [`TelemetryBatch`] is one inbound message and defines one decode cycle.
//! Event order inside a batch does not matter to decoding; batch boundaries do.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::NEUTRAL_INTENSITY;

/// Event intensity: either one scalar or a mapping of named axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intensity {
    Scalar(f64),
    Axes(BTreeMap<String, f64>),
}

impl Intensity {
    /// Collapse to one scalar; axes are averaged
    pub fn resolve(&self) -> f64 {
        match self {
            Intensity::Scalar(value) => *value,
            Intensity::Axes(axes) if axes.is_empty() => NEUTRAL_INTENSITY,
            Intensity::Axes(axes) => axes.values().sum::<f64>() / axes.len() as f64,
        }
    }
}

/// Event timestamp, accepted as epoch seconds or an RFC 3339 string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTimestamp {
    Epoch(f64),
    Iso(DateTime<Utc>),
}

impl EventTimestamp {
    pub fn now() -> Self {
        EventTimestamp::Iso(Utc::now())
    }

    /// Seconds since the Unix epoch
    pub fn as_epoch_secs(&self) -> f64 {
        match self {
            EventTimestamp::Epoch(secs) => *secs,
            EventTimestamp::Iso(at) => at.timestamp_millis() as f64 / 1000.0,
        }
    }
}

/// Free-form metadata bag attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_switches: Option<u32>,

    /// Anything else the client sent; carried but not interpreted
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Engagement counters some clients send beside the metadata bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_switches: Option<u32>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One behavioral sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// e.g. "scroll", "video_pause", "tab_switch"
    #[serde(default)]
    pub event_type: String,

    /// Concept identifier (encoder vocabulary)
    pub context_id: i64,

    /// Interaction identifier (decoder vocabulary)
    pub behavior_id: i64,

    /// Receive time when the client sends none
    #[serde(default = "EventTimestamp::now")]
    pub timestamp: EventTimestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,

    // Top-level signals; metadata values win when both are present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_switches: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_metrics: Option<EngagementMetrics>,
}

impl TelemetryEvent {
    /// Create an event with no signals attached
    pub fn new(context_id: i64, behavior_id: i64) -> Self {
        Self {
            event_type: String::new(),
            context_id,
            behavior_id,
            timestamp: EventTimestamp::now(),
            metadata: None,
            intensity: None,
            duration_ms: None,
            tab_switches: None,
            engagement_metrics: None,
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.metadata.get_or_insert_with(Default::default).intensity = Some(intensity);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.metadata.get_or_insert_with(Default::default).duration_ms = Some(duration_ms);
        self
    }

    pub fn with_tab_switches(mut self, tab_switches: u32) -> Self {
        self.metadata.get_or_insert_with(Default::default).tab_switches = Some(tab_switches);
        self
    }

    /// Resolved intensity of this event, neutral when absent
    pub fn intensity(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.intensity.as_ref())
            .or(self.intensity.as_ref())
            .map(Intensity::resolve)
            .unwrap_or(NEUTRAL_INTENSITY)
    }

    pub fn duration_ms(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.duration_ms)
            .or(self.duration_ms)
            .unwrap_or(0.0)
    }

    /// Metadata first, then the top-level field, then `engagement_metrics`
    pub fn tab_switches(&self) -> u32 {
        self.metadata
            .as_ref()
            .and_then(|m| m.tab_switches)
            .or(self.tab_switches)
            .or_else(|| self.engagement_metrics.as_ref().and_then(|e| e.tab_switches))
            .unwrap_or(0)
    }
}

/// One inbound message worth of events for a single student
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,

    #[serde(alias = "telemetry_batch")]
    pub events: Vec<TelemetryEvent>,
}

impl TelemetryBatch {
    pub fn new(events: Vec<TelemetryEvent>) -> Self {
        Self {
            student_id: None,
            events,
        }
    }

    pub fn for_student(student_id: impl Into<String>, events: Vec<TelemetryEvent>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            events,
        }
    }

    /// Parse a raw inbound frame
    pub fn parse(payload: &str) -> Result<Self, TransportError> {
        serde_json::from_str(payload).map_err(|e| TransportError::Malformed(e.to_string()))
    }

    /// Check that this batch can drive a cycle for `session_student`
    pub fn validate_for(&self, session_student: &str) -> Result<(), TransportError> {
        if let Some(tagged) = &self.student_id {
            if tagged != session_student {
                return Err(TransportError::StudentMismatch {
                    session: session_student.to_string(),
                    payload: tagged.clone(),
                });
            }
        }
        if self.events.is_empty() {
            return Err(TransportError::EmptyBatch);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Context and behavior id sequences for the encoder
    pub fn sequences(&self) -> (Vec<i64>, Vec<i64>) {
        self.events
            .iter()
            .map(|e| (e.context_id, e.behavior_id))
            .unzip()
    }
}
