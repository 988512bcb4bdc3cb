//! Service layer types

use serde::Serialize;

use crate::engine::Detection;

/// Face detection result
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Largest face first.
    pub faces: Vec<Detection>,
    pub inference_time_ms: u64,
}

/// Face registration result
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub success: bool,
    pub face_id: String,
    pub message: String,
}

/// Face comparison result
#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub cosine: f32,
    pub euclidean: f32,
    pub is_same_person: bool,
    pub inference_time_ms: u64,
}

/// Face identification result
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResult {
    pub faces: Vec<FaceIdentification>,
    pub inference_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaceIdentification {
    pub face: Detection,
    pub matches: Vec<IdentifyMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifyMatch {
    pub face_id: String,
    pub similarity: f32,
}
