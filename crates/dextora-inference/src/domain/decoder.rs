//! Profile Decoder
//!
//! Turns a latent vector plus the raw telemetry of one batch into the 40
//! interpretable metrics. Most metrics are a sigmoid squash of one latent
//! slot; four are overridden by telemetry heuristics.
//!
//! ```text
//! base           = sigmoid(v[i mod 128]) * 100
//! Attention_Span = 65                                   if batch_size < 2
//!                = base * (1 + intensity) / (switches + 1)
//! Frustration    = (intensity * 0.7 + v[i] * 0.3) * 100
//! Cognitive_Load = intensity / minutes * 50              minutes >= 1 when no duration
//! Boredom        = base (+15 when intensity < 0.3)
//! ```

use dextora_common::{LatentVector, Profile, TelemetryBatch, METRIC_COUNT, METRIC_LABELS, NEUTRAL_INTENSITY};
use serde::Serialize;

/// Neutral Attention_Span used until a batch carries at least two events
pub const COLD_START_ATTENTION: f64 = 65.0;

/// Boredom bump applied to low-intensity batches
pub const LOW_INTENSITY_BOREDOM_BONUS: f64 = 15.0;

/// Intensity below which a batch counts as low-intensity
pub const LOW_INTENSITY_THRESHOLD: f64 = 0.3;

/// Batch-level aggregates feeding the heuristic overrides
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchAggregates {
    /// Mean resolved intensity across events
    pub avg_intensity: f64,
    /// Sum of event durations in milliseconds
    pub total_duration_ms: f64,
    /// Sum of tab switches
    pub total_switches: u64,
    /// Number of events
    pub batch_size: usize,
}

impl Default for BatchAggregates {
    fn default() -> Self {
        Self {
            avg_intensity: NEUTRAL_INTENSITY,
            total_duration_ms: 0.0,
            total_switches: 0,
            batch_size: 0,
        }
    }
}

impl BatchAggregates {
    /// Aggregate a batch; an empty batch yields the neutral defaults
    pub fn from_batch(batch: &TelemetryBatch) -> Self {
        if batch.is_empty() {
            return Self::default();
        }

        let batch_size = batch.len();
        let intensity_sum: f64 = batch.events.iter().map(|e| e.intensity()).sum();

        Self {
            avg_intensity: intensity_sum / batch_size as f64,
            total_duration_ms: batch.events.iter().map(|e| e.duration_ms()).sum(),
            total_switches: batch.events.iter().map(|e| e.tab_switches() as u64).sum(),
            batch_size,
        }
    }

    /// Batch duration in minutes, floored to one minute when nothing was timed
    pub fn duration_minutes(&self) -> f64 {
        if self.total_duration_ms > 0.0 {
            self.total_duration_ms / 60_000.0
        } else {
            1.0
        }
    }
}

/// Logistic squash
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Clamp to [0, 100] and round to two decimals
///
/// Infinities clamp to the nearest bound like any other out-of-range value;
/// NaN carries no ordering and becomes 0.
#[inline]
pub fn finalize_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    (score.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Decode a latent vector and its batch into a profile
pub fn decode(vector: &LatentVector, batch: &TelemetryBatch) -> Profile {
    decode_with(vector, &BatchAggregates::from_batch(batch))
}

/// Decode against precomputed aggregates
pub fn decode_with(vector: &LatentVector, agg: &BatchAggregates) -> Profile {
    let mut scores = [0.0; METRIC_COUNT];

    for (i, label) in METRIC_LABELS.iter().enumerate() {
        let latent = vector.get(i) as f64;
        let base = sigmoid(latent) * 100.0;

        let score = match *label {
            "Attention_Span" => {
                if agg.batch_size < 2 {
                    COLD_START_ATTENTION
                } else {
                    base * (1.0 + agg.avg_intensity) / (agg.total_switches as f64 + 1.0)
                }
            }
            "Frustration" => (agg.avg_intensity * 0.7 + latent * 0.3) * 100.0,
            "Cognitive_Load" => (agg.avg_intensity / agg.duration_minutes()) * 50.0,
            "Boredom" => {
                if agg.avg_intensity < LOW_INTENSITY_THRESHOLD {
                    base + LOW_INTENSITY_BOREDOM_BONUS
                } else {
                    base
                }
            }
            _ => base,
        };

        scores[i] = finalize_score(score);
    }

    Profile::from_scores(scores)
}
