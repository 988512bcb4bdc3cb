//! Inference engine seam
//!
//! The network forward pass is opaque to this crate. Backends hand back
//! plain tensors and the detector outputs are sorted out by their trailing
//! dimension, since output names differ between model exports.

use ndarray::Array4;
use tracing::{debug, warn};

use crate::error::{FaceError, Result};

use super::decode::{LANDMARK_DIM, LOC_DIM, SCORE_DIM};

/// A dense f32 output tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    pub fn trailing_dim(&self) -> Option<usize> {
        self.shape.last().copied()
    }
}

/// A loaded network. Implementations are shared read-only across requests.
pub trait InferenceEngine: Send + Sync {
    /// Run one forward pass over an NCHW input.
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<OutputTensor>>;
}

/// Detector outputs sorted by role.
#[derive(Debug, Clone, Default)]
pub struct RawOutputs {
    pub locations: Vec<f32>,
    pub scores: Vec<f32>,
    pub landmarks: Vec<f32>,
}

impl RawOutputs {
    pub fn identify(tensors: Vec<OutputTensor>) -> Result<Self> {
        let mut locations = None;
        let mut scores = None;
        let mut landmarks = None;

        for tensor in tensors {
            let expected: usize = tensor.shape.iter().product();
            if expected != tensor.data.len() {
                return Err(FaceError::ShapeMismatch {
                    what: "output tensor",
                    expected,
                    actual: tensor.data.len(),
                });
            }

            let slot = match tensor.trailing_dim() {
                Some(LOC_DIM) => &mut locations,
                Some(SCORE_DIM) => &mut scores,
                Some(LANDMARK_DIM) => &mut landmarks,
                other => {
                    warn!("Ignoring detector output with shape {:?} (trailing {:?})", tensor.shape, other);
                    continue;
                }
            };

            if slot.is_some() {
                return Err(FaceError::AmbiguousOutput(tensor.trailing_dim().unwrap_or(0)));
            }
            debug!("Detector output {:?}", tensor.shape);
            *slot = Some(tensor.data);
        }

        Ok(Self {
            locations: locations.ok_or(FaceError::MissingOutput(LOC_DIM))?,
            scores: scores.ok_or(FaceError::MissingOutput(SCORE_DIM))?,
            landmarks: landmarks.ok_or(FaceError::MissingOutput(LANDMARK_DIM))?,
        })
    }
}

/// Take the single embedding vector out of an embedder's outputs.
pub fn embedding_output(tensors: Vec<OutputTensor>, dim: usize) -> Result<Vec<f32>> {
    let tensor = tensors
        .into_iter()
        .next()
        .ok_or(FaceError::MissingOutput(dim))?;

    if tensor.data.len() != dim {
        return Err(FaceError::ShapeMismatch {
            what: "embedding",
            expected: dim,
            actual: tensor.data.len(),
        });
    }
    Ok(tensor.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(trailing: usize, n: usize, fill: f32) -> OutputTensor {
        OutputTensor::new(vec![1, n, trailing], vec![fill; n * trailing])
    }

    #[test]
    fn test_identify_by_trailing_dim_in_any_order() {
        let outputs = RawOutputs::identify(vec![
            tensor(10, 3, 3.0),
            tensor(4, 3, 1.0),
            tensor(2, 3, 2.0),
        ])
        .unwrap();

        assert_eq!(outputs.locations, vec![1.0; 12]);
        assert_eq!(outputs.scores, vec![2.0; 6]);
        assert_eq!(outputs.landmarks, vec![3.0; 30]);
    }

    #[test]
    fn test_missing_output() {
        let err = RawOutputs::identify(vec![tensor(4, 3, 0.0), tensor(2, 3, 0.0)]).unwrap_err();
        assert!(matches!(err, FaceError::MissingOutput(10)));
    }

    #[test]
    fn test_ambiguous_output() {
        let err = RawOutputs::identify(vec![tensor(4, 3, 0.0), tensor(4, 3, 0.0)]).unwrap_err();
        assert!(matches!(err, FaceError::AmbiguousOutput(4)));
    }

    #[test]
    fn test_unrelated_outputs_ignored() {
        let outputs = RawOutputs::identify(vec![
            tensor(4, 1, 0.0),
            tensor(7, 1, 0.0),
            tensor(2, 1, 0.0),
            tensor(10, 1, 0.0),
        ]);
        assert!(outputs.is_ok());
    }

    #[test]
    fn test_embedding_output_length() {
        let ok = embedding_output(vec![OutputTensor::new(vec![1, 4], vec![1.0; 4])], 4).unwrap();
        assert_eq!(ok.len(), 4);

        let err = embedding_output(vec![OutputTensor::new(vec![1, 3], vec![1.0; 3])], 4).unwrap_err();
        assert!(matches!(err, FaceError::ShapeMismatch { what: "embedding", .. }));

        assert!(matches!(embedding_output(vec![], 4), Err(FaceError::MissingOutput(4))));
    }
}
