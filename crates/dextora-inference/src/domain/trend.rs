//! Trend Engine
//!
//! Compares each decoded profile with the same student's previous one and
//! reports threshold crossings on attention, frustration and cognitive load.

use std::fmt;
use std::sync::Arc;

use dextora_common::Profile;
use serde::Serialize;

use crate::infra::session_memory::SessionMemory;

/// Attention drop (in points) that raises an alert
pub const ATTENTION_DROP_THRESHOLD: f64 = -5.0;

/// Frustration rise (in points) that raises an alert
pub const FRUSTRATION_RISE_THRESHOLD: f64 = 5.0;

/// Cognitive load rise (in points) that raises an alert
pub const LOAD_SPIKE_THRESHOLD: f64 = 10.0;

pub const BASELINE_REPORT: &str = "new session / establishing baseline";
pub const STEADY_REPORT: &str = "steady progress";

/// One threshold crossing, carrying the observed delta
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrendAlert {
    AttentionDropping { delta: f64 },
    FrustrationRising { delta: f64 },
    CognitiveLoadSpiking { delta: f64 },
}

impl TrendAlert {
    /// Machine-readable alert code
    pub fn code(&self) -> &'static str {
        match self {
            TrendAlert::AttentionDropping { .. } => "attention_dropping",
            TrendAlert::FrustrationRising { .. } => "frustration_rising",
            TrendAlert::CognitiveLoadSpiking { .. } => "cognitive_load_spiking",
        }
    }
}

impl fmt::Display for TrendAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendAlert::AttentionDropping { delta } => {
                write!(f, "attention dropping (↓{:.2}%)", delta.abs())
            }
            TrendAlert::FrustrationRising { delta } => {
                write!(f, "frustration rising (↑{:.2}%)", delta)
            }
            TrendAlert::CognitiveLoadSpiking { .. } => write!(f, "cognitive load spiking"),
        }
    }
}

impl Serialize for TrendAlert {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Outcome of comparing a profile with its predecessor
#[derive(Debug, Clone, PartialEq)]
pub enum TrendReport {
    /// First observation of the student
    Baseline,
    /// Nothing crossed a threshold
    Steady,
    /// One or more alerts, in fixed emission order
    Alerts(Vec<TrendAlert>),
}

impl TrendReport {
    pub fn alerts(&self) -> &[TrendAlert] {
        match self {
            TrendReport::Alerts(alerts) => alerts,
            _ => &[],
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, TrendReport::Baseline)
    }
}

impl fmt::Display for TrendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendReport::Baseline => f.write_str(BASELINE_REPORT),
            TrendReport::Steady => f.write_str(STEADY_REPORT),
            TrendReport::Alerts(alerts) => {
                for (i, alert) in alerts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", alert)?;
                }
                Ok(())
            }
        }
    }
}

/// Compare two consecutive profiles
pub fn compare(previous: &Profile, current: &Profile) -> TrendReport {
    let attention = current.attention_span() - previous.attention_span();
    let frustration = current.frustration() - previous.frustration();
    let load = current.cognitive_load() - previous.cognitive_load();

    let mut alerts = Vec::new();
    if attention < ATTENTION_DROP_THRESHOLD {
        alerts.push(TrendAlert::AttentionDropping { delta: attention });
    }
    if frustration > FRUSTRATION_RISE_THRESHOLD {
        alerts.push(TrendAlert::FrustrationRising { delta: frustration });
    }
    if load > LOAD_SPIKE_THRESHOLD {
        alerts.push(TrendAlert::CognitiveLoadSpiking { delta: load });
    }

    if alerts.is_empty() {
        TrendReport::Steady
    } else {
        TrendReport::Alerts(alerts)
    }
}

/// Stateful trend tracker backed by [`SessionMemory`]
#[derive(Debug, Clone)]
pub struct TrendEngine {
    memory: Arc<SessionMemory>,
}

impl TrendEngine {
    pub fn new(memory: Arc<SessionMemory>) -> Self {
        Self { memory }
    }

    /// Report against the previous profile, then remember `current`
    pub fn observe(&self, student_id: &str, current: &Profile) -> TrendReport {
        match self.memory.replace(student_id, current.clone()) {
            None => TrendReport::Baseline,
            Some(previous) => compare(&previous, current),
        }
    }

    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dextora_common::{ATTENTION_SLOT, FRUSTRATION_SLOT, METRIC_COUNT};

    fn profile(attention: f64, frustration: f64, load: f64) -> Profile {
        let mut scores = [50.0; METRIC_COUNT];
        scores[ATTENTION_SLOT] = attention;
        scores[FRUSTRATION_SLOT] = frustration;
        scores[6] = load;
        Profile::from_scores(scores)
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let engine = TrendEngine::new(Arc::new(SessionMemory::new()));
        let report = engine.observe("STU_1001", &profile(65.0, 28.0, 26.67));

        assert_eq!(report, TrendReport::Baseline);
        assert_eq!(report.to_string(), BASELINE_REPORT);
        assert!(report.alerts().is_empty());
    }

    #[test]
    fn test_identical_profiles_are_steady() {
        let engine = TrendEngine::new(Arc::new(SessionMemory::new()));
        let p = profile(65.0, 28.0, 26.67);
        engine.observe("STU_1001", &p);

        let report = engine.observe("STU_1001", &p);
        assert_eq!(report, TrendReport::Steady);
        assert_eq!(report.to_string(), STEADY_REPORT);
    }

    #[test]
    fn test_all_alerts_in_order() {
        let report = compare(&profile(70.0, 20.0, 10.0), &profile(60.0, 30.0, 25.0));
        let codes: Vec<_> = report.alerts().iter().map(|a| a.code()).collect();

        assert_eq!(
            codes,
            vec!["attention_dropping", "frustration_rising", "cognitive_load_spiking"]
        );
        assert_eq!(
            report.to_string(),
            "attention dropping (↓10.00%) | frustration rising (↑10.00%) | cognitive load spiking"
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let report = compare(&profile(70.0, 20.0, 10.0), &profile(65.0, 25.0, 20.0));
        assert_eq!(report, TrendReport::Steady);
    }

    #[test]
    fn test_single_alert() {
        let report = compare(&profile(65.0, 20.0, 10.0), &profile(65.0, 20.0, 30.0));
        assert_eq!(report.to_string(), "cognitive load spiking");
    }

    #[test]
    fn test_students_tracked_separately() {
        let engine = TrendEngine::new(Arc::new(SessionMemory::new()));
        engine.observe("STU_1", &profile(65.0, 28.0, 20.0));

        assert!(engine.observe("STU_2", &profile(10.0, 90.0, 90.0)).is_baseline());
        assert_eq!(engine.memory().len(), 2);
    }
}
