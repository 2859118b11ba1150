//! Grounding Reconciler
//!
//! The policy only ever sees the latent vector. Three slots are rewritten
//! from the decoded heuristic scores (inverse sigmoid) so the policy acts on
//! the same state the rest of the system reports.

use dextora_common::{LatentVector, Profile, ATTENTION_SLOT, FRUSTRATION_SLOT, MASTERY_SLOT};

/// Probability bounds applied before taking the logit
pub const MIN_PROBABILITY: f64 = 0.01;
pub const MAX_PROBABILITY: f64 = 0.99;

/// A latent slot kept in agreement with a profile metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundedSlot {
    pub slot: usize,
    pub metric: &'static str,
}

/// Slots rewritten on every cycle; the reward priority stack reads the same ones
pub const GROUNDED_SLOTS: [GroundedSlot; 3] = [
    GroundedSlot {
        slot: MASTERY_SLOT,
        metric: "Mastery",
    },
    GroundedSlot {
        slot: FRUSTRATION_SLOT,
        metric: "Frustration",
    },
    GroundedSlot {
        slot: ATTENTION_SLOT,
        metric: "Attention_Span",
    },
];

/// Convert a 0-100 score back to latent (logit) space
pub fn to_latent(score: f64) -> f32 {
    let p = (score / 100.0).clamp(MIN_PROBABILITY, MAX_PROBABILITY);
    (p / (1.0 - p)).ln() as f32
}

/// Return a copy of `vector` with the grounded slots rewritten from `profile`
pub fn ground(profile: &Profile, vector: &LatentVector) -> LatentVector {
    let mut grounded = vector.clone();
    for entry in GROUNDED_SLOTS {
        let score = profile.get(entry.metric).unwrap_or(50.0);
        grounded.set(entry.slot, to_latent(score));
    }
    grounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decoder::{decode, sigmoid};
    use dextora_common::{TelemetryBatch, LATENT_DIM, METRIC_COUNT};

    fn profile_with(mastery: f64, frustration: f64, attention: f64) -> Profile {
        let mut scores = [50.0; METRIC_COUNT];
        scores[MASTERY_SLOT] = mastery;
        scores[FRUSTRATION_SLOT] = frustration;
        scores[ATTENTION_SLOT] = attention;
        Profile::from_scores(scores)
    }

    #[test]
    fn test_to_latent_inverts_sigmoid() {
        for score in [5.0, 28.0, 50.0, 65.0, 97.0] {
            let back = sigmoid(to_latent(score) as f64) * 100.0;
            assert!((back - score).abs() < 1e-3, "{score} -> {back}");
        }
        assert_eq!(to_latent(50.0), 0.0);
    }

    #[test]
    fn test_to_latent_clamps_extremes() {
        assert_eq!(to_latent(0.0), to_latent(1.0));
        assert_eq!(to_latent(100.0), to_latent(99.0));
        assert!(to_latent(0.0).is_finite());
        assert!(to_latent(100.0).is_finite());
    }

    #[test]
    fn test_only_three_slots_change() {
        let mut vector = LatentVector::zeros();
        for i in 0..LATENT_DIM {
            vector.set(i, i as f32 * 0.01);
        }
        let grounded = ground(&profile_with(80.0, 28.0, 65.0), &vector);

        for i in 0..LATENT_DIM {
            if GROUNDED_SLOTS.iter().any(|g| g.slot == i) {
                continue;
            }
            assert_eq!(grounded.get(i), vector.get(i));
        }
        assert!((grounded.get(MASTERY_SLOT) - to_latent(80.0)).abs() < f32::EPSILON);
        assert!((grounded.get(FRUSTRATION_SLOT) - to_latent(28.0)).abs() < f32::EPSILON);
        assert!((grounded.get(ATTENTION_SLOT) - to_latent(65.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_grounding_is_idempotent() {
        let profile = profile_with(12.0, 71.5, 40.0);
        let once = ground(&profile, &LatentVector::zeros());
        let twice = ground(&profile, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mastery_survives_decode_round_trip() {
        let profile = profile_with(73.0, 30.0, 65.0);
        let grounded = ground(&profile, &LatentVector::zeros());

        let redecoded = decode(&grounded, &TelemetryBatch::default());
        let regrounded = ground(&redecoded, &grounded);

        assert!((redecoded.mastery() - 73.0).abs() < 0.011);
        assert!((regrounded.get(MASTERY_SLOT) - grounded.get(MASTERY_SLOT)).abs() < 1e-3);
    }
}
