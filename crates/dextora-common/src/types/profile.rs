//! Profile - the 40 interpretable metrics ("DNA") of a student
//!
//! The label order below is load-bearing: metric `i` reads latent slot
//! `i mod 128`, and the grounded slots 0/10/20 line up with Mastery,
//! Frustration and Attention_Span.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::METRIC_COUNT;

/// Fixed metric labels, in latent-slot order
pub const METRIC_LABELS: [&str; METRIC_COUNT] = [
    "Mastery",
    "Retention",
    "Fragility",
    "Velocity",
    "Error_Density",
    "Self_Correction",
    "Cognitive_Load",
    "Logic_Bias",
    "Memory_Proxy",
    "Processing_Speed",
    "Frustration",
    "Boredom",
    "Flow_State",
    "Fatigue",
    "Feedback_Sens",
    "Resilience",
    "Curiosity",
    "Confidence",
    "Elasticity",
    "Interest",
    "Attention_Span",
    "Persistence",
    "Procrastination",
    "Focus_Stability",
    "Switch_Propensity",
    "Repetition",
    "Hint_Dependency",
    "Consistency",
    "Nav_Style",
    "Device_Fluency",
    "Visual",
    "Auditory",
    "Read_Write",
    "Kinetic",
    "Detail_Orient",
    "Holistic",
    "Creative",
    "Goal_Orient",
    "Collab_Intent",
    "Roadmap_Adherence",
];

/// Position of `name` in [`METRIC_LABELS`]
pub fn metric_index(name: &str) -> Option<usize> {
    METRIC_LABELS.iter().position(|label| *label == name)
}

/// Decoded profile: one score in [0, 100] per metric label
///
/// Serializes as a JSON object in label order.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    scores: [f64; METRIC_COUNT],
}

impl Profile {
    /// Build from scores in label order
    pub fn from_scores(scores: [f64; METRIC_COUNT]) -> Self {
        Self { scores }
    }

    /// Score for a metric name
    pub fn get(&self, name: &str) -> Option<f64> {
        metric_index(name).map(|i| self.scores[i])
    }

    /// Score at a label index
    #[inline]
    pub fn score_at(&self, index: usize) -> f64 {
        self.scores[index]
    }

    /// (label, score) pairs in label order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        METRIC_LABELS.iter().copied().zip(self.scores.iter().copied())
    }

    pub fn len(&self) -> usize {
        METRIC_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn mastery(&self) -> f64 {
        self.scores[0]
    }

    pub fn cognitive_load(&self) -> f64 {
        self.scores[6]
    }

    pub fn frustration(&self) -> f64 {
        self.scores[10]
    }

    pub fn boredom(&self) -> f64 {
        self.scores[11]
    }

    pub fn attention_span(&self) -> f64 {
        self.scores[20]
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(METRIC_COUNT))?;
        for (label, score) in self.iter() {
            map.serialize_entry(label, &score)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_positions() {
        assert_eq!(metric_index("Mastery"), Some(0));
        assert_eq!(metric_index("Cognitive_Load"), Some(6));
        assert_eq!(metric_index("Frustration"), Some(10));
        assert_eq!(metric_index("Boredom"), Some(11));
        assert_eq!(metric_index("Attention_Span"), Some(20));
        assert_eq!(metric_index("Roadmap_Adherence"), Some(39));
        assert_eq!(metric_index("Happiness"), None);
    }

    #[test]
    fn test_named_accessors_match_labels() {
        let mut scores = [0.0; METRIC_COUNT];
        for (i, s) in scores.iter_mut().enumerate() {
            *s = i as f64;
        }
        let profile = Profile::from_scores(scores);

        assert_eq!(profile.get("Mastery"), Some(profile.mastery()));
        assert_eq!(profile.get("Cognitive_Load"), Some(profile.cognitive_load()));
        assert_eq!(profile.get("Frustration"), Some(profile.frustration()));
        assert_eq!(profile.get("Boredom"), Some(profile.boredom()));
        assert_eq!(profile.get("Attention_Span"), Some(profile.attention_span()));
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let profile = Profile::from_scores([50.0; METRIC_COUNT]);
        let json = serde_json::to_value(&profile).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), METRIC_COUNT);
        assert_eq!(object["Attention_Span"], 50.0);

        let text = serde_json::to_string(&profile).unwrap();
        assert!(text.starts_with("{\"Mastery\":"));
    }
}
