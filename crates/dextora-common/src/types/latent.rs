//! LatentVector - a student's encoded cognitive/affective state
//!
//! The vector is always exactly [`LATENT_DIM`] elements. Absent data is the
//! all-zero vector, never a missing one.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::LATENT_DIM;

/// Fixed-length latent personality vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct LatentVector(Vec<f32>);

impl Default for LatentVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl LatentVector {
    /// Neutral vector used for cold starts
    pub fn zeros() -> Self {
        Self(vec![0.0; LATENT_DIM])
    }

    /// Build from a slice, rejecting any length other than [`LATENT_DIM`]
    pub fn from_slice(values: &[f32]) -> Result<Self, ModelError> {
        Self::try_from(values.to_vec())
    }

    /// Decode the little-endian f32 blob used by the live cache
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        if bytes.len() != LATENT_DIM * 4 {
            return Err(ModelError::Dimension {
                expected: LATENT_DIM,
                actual: bytes.len() / 4,
            });
        }

        let values = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(Self(values))
    }

    /// Encode as a little-endian f32 blob
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Value at `index`, wrapping modulo the dimension
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.0[index % LATENT_DIM]
    }

    /// Overwrite the value at `index` (wrapping modulo the dimension)
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        self.0[index % LATENT_DIM] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Leading `len` values, for diagnostics
    pub fn snippet(&self, len: usize) -> Vec<f32> {
        self.0.iter().take(len).copied().collect()
    }

    /// L2 norm ("energy") of the vector
    pub fn magnitude(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl TryFrom<Vec<f32>> for LatentVector {
    type Error = ModelError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.len() != LATENT_DIM {
            return Err(ModelError::Dimension {
                expected: LATENT_DIM,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }
}

impl From<LatentVector> for Vec<f32> {
    fn from(vector: LatentVector) -> Self {
        vector.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector() {
        let v = LatentVector::zeros();
        assert_eq!(v.as_slice().len(), LATENT_DIM);
        assert!(v.is_zero());
        assert_eq!(v.magnitude(), 0.0);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = LatentVector::from_slice(&[1.0; 64]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Dimension {
                expected: 128,
                actual: 64
            }
        ));
    }

    #[test]
    fn test_byte_blob() {
        let mut v = LatentVector::zeros();
        v.set(0, 1.5);
        v.set(127, -0.25);

        let bytes = v.to_bytes();
        assert_eq!(bytes.len(), 512);
        assert_eq!(LatentVector::from_bytes(&bytes).unwrap(), v);
        assert!(LatentVector::from_bytes(&bytes[..100]).is_err());
    }

    #[test]
    fn test_index_wraps() {
        let mut v = LatentVector::zeros();
        v.set(130, 2.0);
        assert_eq!(v.get(2), 2.0);
        assert_eq!(v.snippet(3), vec![0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_json_requires_full_length() {
        assert!(serde_json::from_str::<LatentVector>("[0.1, 0.2]").is_err());

        let json = serde_json::to_string(&LatentVector::zeros()).unwrap();
        let parsed: LatentVector = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_zero());
    }
}
