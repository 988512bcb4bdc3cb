//! Detection and recognition engine
//!
//! Provides:
//! - Prior generation and regression decoding for anchor-based detectors
//! - Candidate filtering, non-maximum suppression and pixel projection
//! - Embedding extraction and comparison
//! - An inference seam with an optional OpenVINO backend

pub mod anchors;
pub mod compare;
pub mod context;
pub mod decode;
pub mod detector;
pub mod embedder;
pub mod filter;
pub mod geometry;
pub mod inference;
pub mod nms;
#[cfg(feature = "openvino")]
pub mod openvino;
pub mod pipeline;
pub mod preprocess;
pub mod project;

pub use context::{ModelContext, ModelType};
pub use detector::FaceDetector;
pub use embedder::{FaceEmbedder, FaceEmbedding};
pub use inference::{InferenceEngine, OutputTensor, RawOutputs};
pub use pipeline::{Detection, DetectionPipeline, Landmark, LandmarkType, PixelBox};
