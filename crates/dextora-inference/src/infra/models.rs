//! Model Interfaces
//!
//! The encoder and the policy are pretrained, stateless scoring functions.
//! Production deployments plug remote models in behind these traits; the
//! local implementations here are deterministic and need no artifacts.

use async_trait::async_trait;
use dextora_common::{LatentVector, ModelError, LATENT_DIM};

use crate::domain::router::{PriorityRule, RewardState};

/// Number of distinct context ids the encoder embeds
pub const CONTEXT_VOCAB: i64 = 1000;

/// Number of distinct behavior ids the encoder embeds
pub const BEHAVIOR_VOCAB: i64 = 20;

/// Sequence encoder: (context ids, behavior ids) -> latent vector
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Sequences must be non-empty and of equal length
    async fn encode(&self, context_seq: &[i64], behavior_seq: &[i64]) -> Result<LatentVector, ModelError>;

    fn name(&self) -> &'static str {
        "encoder"
    }
}

/// Decision policy: latent vector -> action index
#[async_trait]
pub trait Policy: Send + Sync {
    async fn decide(&self, vector: &LatentVector) -> Result<i64, ModelError>;

    fn name(&self) -> &'static str {
        "policy"
    }
}

/// Deterministic bag-of-tokens encoder
///
/// Each context and behavior id maps to a fixed pseudo-random embedding in
/// [-1, 1] derived from blake3. The latent vector is the recency-weighted
/// mean of the per-step sums, so later events dominate.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    context_vocab: i64,
    behavior_vocab: i64,
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self {
            context_vocab: CONTEXT_VOCAB,
            behavior_vocab: BEHAVIOR_VOCAB,
        }
    }
}

impl HashingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocab(mut self, context_vocab: i64, behavior_vocab: i64) -> Self {
        self.context_vocab = context_vocab;
        self.behavior_vocab = behavior_vocab;
        self
    }

    fn embedding(domain: &str, token: i64) -> [f32; LATENT_DIM] {
        let mut hasher = blake3::Hasher::new_derive_key(domain);
        hasher.update(&token.to_le_bytes());

        let mut bytes = [0u8; LATENT_DIM * 4];
        hasher.finalize_xof().fill(&mut bytes);

        let mut out = [0f32; LATENT_DIM];
        for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            *slot = (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32;
        }
        out
    }

    fn check_token(kind: &str, token: i64, vocab: i64) -> Result<(), ModelError> {
        if (0..vocab).contains(&token) {
            Ok(())
        } else {
            Err(ModelError::InvalidInput(format!(
                "{} id {} outside vocabulary [0, {})",
                kind, token, vocab
            )))
        }
    }

    /// Synchronous core, shared by the async trait impl and benchmarks
    pub fn encode_sync(&self, context_seq: &[i64], behavior_seq: &[i64]) -> Result<LatentVector, ModelError> {
        if context_seq.len() != behavior_seq.len() {
            return Err(ModelError::InvalidInput(format!(
                "sequence length mismatch: {} contexts, {} behaviors",
                context_seq.len(),
                behavior_seq.len()
            )));
        }
        if context_seq.is_empty() {
            return Err(ModelError::InvalidInput("empty sequence".to_string()));
        }

        let mut acc = [0f64; LATENT_DIM];
        let mut total_weight = 0f64;

        for (step, (&ctx, &beh)) in context_seq.iter().zip(behavior_seq).enumerate() {
            Self::check_token("context", ctx, self.context_vocab)?;
            Self::check_token("behavior", beh, self.behavior_vocab)?;

            let weight = (step + 1) as f64;
            let ctx_emb = Self::embedding("dextora 2024 context embedding", ctx);
            let beh_emb = Self::embedding("dextora 2024 behavior embedding", beh);
            for (i, slot) in acc.iter_mut().enumerate() {
                *slot += weight * (ctx_emb[i] + beh_emb[i]) as f64 / 2.0;
            }
            total_weight += weight;
        }

        let values: Vec<f32> = acc.iter().map(|v| (v / total_weight) as f32).collect();
        LatentVector::try_from(values)
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    async fn encode(&self, context_seq: &[i64], behavior_seq: &[i64]) -> Result<LatentVector, ModelError> {
        self.encode_sync(context_seq, behavior_seq)
    }

    fn name(&self) -> &'static str {
        "hashing_encoder"
    }
}

/// Policy that picks whatever the reward priority stack rewards
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy;

#[async_trait]
impl Policy for PriorityPolicy {
    async fn decide(&self, vector: &LatentVector) -> Result<i64, ModelError> {
        let state = RewardState::from_vector(vector);
        Ok(PriorityRule::classify(&state).target_action())
    }

    fn name(&self) -> &'static str {
        "priority_policy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dextora_common::{ATTENTION_SLOT, FRUSTRATION_SLOT, MASTERY_SLOT};

    #[tokio::test]
    async fn test_encoder_is_deterministic() {
        let encoder = HashingEncoder::new();
        let a = encoder.encode(&[101, 102], &[1, 3]).await.unwrap();
        let b = encoder.encode(&[101, 102], &[1, 3]).await.unwrap();

        assert_eq!(a, b);
        assert!(!a.is_zero());
        assert!(a.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn test_encoder_is_order_sensitive() {
        let encoder = HashingEncoder::new();
        let a = encoder.encode(&[101, 102], &[1, 3]).await.unwrap();
        let b = encoder.encode(&[102, 101], &[3, 1]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_encoder_rejects_bad_input() {
        let encoder = HashingEncoder::new();

        assert!(matches!(
            encoder.encode(&[1, 2], &[1]).await,
            Err(ModelError::InvalidInput(_))
        ));
        assert!(matches!(encoder.encode(&[], &[]).await, Err(ModelError::InvalidInput(_))));
        assert!(matches!(
            encoder.encode(&[CONTEXT_VOCAB], &[0]).await,
            Err(ModelError::InvalidInput(_))
        ));
        assert!(matches!(
            encoder.encode(&[0], &[-1]).await,
            Err(ModelError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_vocab() {
        let encoder = HashingEncoder::new().with_vocab(5000, 50);
        assert!(encoder.encode(&[4999], &[49]).await.is_ok());
    }

    #[tokio::test]
    async fn test_priority_policy_follows_stack() {
        let policy = PriorityPolicy;

        let mut flow = LatentVector::zeros();
        flow.set(ATTENTION_SLOT, 1.0);
        assert_eq!(policy.decide(&flow).await.unwrap(), 0);

        // all-zero latent: frustration 0 > -0.1 means struggle
        assert_eq!(policy.decide(&LatentVector::zeros()).await.unwrap(), 2);

        let mut gap = LatentVector::zeros();
        gap.set(FRUSTRATION_SLOT, -2.0);
        gap.set(MASTERY_SLOT, -2.0);
        assert_eq!(policy.decide(&gap).await.unwrap(), 1);
    }
}
