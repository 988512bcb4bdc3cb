//! Service configuration and detector presets

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FaceError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub inference: InferenceConfig,
    pub models: ModelsConfig,
    pub detector: DetectorSettings,
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub device: String,
    pub num_threads: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub detector: PathBuf,
    pub embedder: PathBuf,
}

/// Detector section of the config file.
///
/// The anchor layout comes from the architecture preset; only the input
/// resolution may be overridden.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSettings {
    pub architecture: Architecture,
    pub input_size: Option<u32>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scores_are_logits: bool,
}

impl DetectorSettings {
    /// Resolve the full detector configuration for this section.
    pub fn detector_config(&self) -> DetectorConfig {
        let mut config = DetectorConfig::for_architecture(self.architecture);
        if let Some(size) = self.input_size {
            config.input_size = size;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Candidates must score strictly above this to enter suppression.
    pub low_threshold: f32,
    /// Candidate cap applied before suppression.
    pub top_k: usize,
    pub nms_threshold: f32,
    /// Survivor cap applied after suppression.
    pub keep_top_k: usize,
    /// Final score a detection needs to be reported.
    pub visibility_threshold: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_threshold: 0.02,
            top_k: 5000,
            nms_threshold: 0.4,
            keep_top_k: 750,
            visibility_threshold: 0.6,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("low_threshold", self.low_threshold),
            ("nms_threshold", self.nms_threshold),
            ("visibility_threshold", self.visibility_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(FaceError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.top_k == 0 || self.keep_top_k == 0 {
            return Err(FaceError::InvalidConfig("top_k and keep_top_k must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    pub similarity_threshold: f32,
    pub embedding_dim: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_crop_margin")]
    pub crop_margin: f32,
    #[serde(default = "default_embedder_input")]
    pub input_size: u32,
}

impl RecognitionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(FaceError::InvalidConfig(format!(
                "similarity_threshold must be in [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.embedding_dim == 0 || self.input_size == 0 {
            return Err(FaceError::InvalidConfig("embedding_dim and input_size must be non-zero".into()));
        }
        // NaN fails the range check too
        if !(self.crop_margin >= 0.0 && self.crop_margin.is_finite()) {
            return Err(FaceError::InvalidConfig(format!(
                "crop_margin must be a non-negative number, got {}",
                self.crop_margin
            )));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_limit() -> usize {
    5
}

fn default_crop_margin() -> f32 {
    0.1
}

fn default_embedder_input() -> u32 {
    112
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.detector_config().validate()?;
        self.detector.thresholds.validate()?;
        self.recognition.validate()
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference: InferenceConfig {
                device: "CPU".to_string(),
                num_threads: 4,
                log_level: default_log_level(),
            },
            models: ModelsConfig {
                detector: PathBuf::from("models/retinaface_mnet025.onnx"),
                embedder: PathBuf::from("models/arcface_r100.onnx"),
            },
            detector: DetectorSettings {
                architecture: Architecture::MobileNet025,
                input_size: None,
                thresholds: Thresholds::default(),
                scores_are_logits: false,
            },
            recognition: RecognitionConfig {
                similarity_threshold: 0.5,
                embedding_dim: 512,
                search_limit: default_search_limit(),
                crop_margin: default_crop_margin(),
                input_size: default_embedder_input(),
            },
        }
    }
}

/// Detector backbone. Both share the same prior layout and differ only in
/// their native input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "mobilenet0.25")]
    MobileNet025,
    #[serde(rename = "resnet50")]
    ResNet50,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::MobileNet025 => "mobilenet0.25",
            Architecture::ResNet50 => "resnet50",
        }
    }
}

/// Anchor layout and decode constants for one loaded detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub architecture: Architecture,
    /// Minimum anchor sizes in input pixels, one list per feature-map level.
    pub min_sizes: Vec<Vec<u32>>,
    /// Pixels per grid cell at each level.
    pub steps: Vec<u32>,
    pub variance: [f32; 2],
    /// Square network input resolution.
    pub input_size: u32,
}

impl DetectorConfig {
    pub fn for_architecture(architecture: Architecture) -> Self {
        let input_size = match architecture {
            Architecture::MobileNet025 => 640,
            Architecture::ResNet50 => 840,
        };
        Self {
            architecture,
            min_sizes: vec![vec![16, 32], vec![64, 128], vec![256, 512]],
            steps: vec![8, 16, 32],
            variance: [0.1, 0.2],
            input_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_sizes.len() != self.steps.len() {
            return Err(FaceError::InvalidConfig(format!(
                "{} min_size levels but {} steps",
                self.min_sizes.len(),
                self.steps.len()
            )));
        }
        if self.steps.iter().any(|&s| s == 0) {
            return Err(FaceError::InvalidConfig("step must be non-zero".into()));
        }
        if self.min_sizes.iter().flatten().any(|&s| s == 0) {
            return Err(FaceError::InvalidConfig("min_size must be non-zero".into()));
        }
        if self.input_size == 0 {
            return Err(FaceError::InvalidConfig("input_size must be non-zero".into()));
        }
        if !self.variance.iter().all(|v| v.is_finite()) {
            return Err(FaceError::InvalidConfig("variance must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_presets_are_valid() {
        for arch in [Architecture::MobileNet025, Architecture::ResNet50] {
            DetectorConfig::for_architecture(arch).validate().unwrap();
        }
        assert_eq!(DetectorConfig::for_architecture(Architecture::ResNet50).input_size, 840);
    }

    #[test]
    fn test_validate_rejects_level_mismatch() {
        let mut config = DetectorConfig::for_architecture(Architecture::MobileNet025);
        config.steps.pop();
        assert!(matches!(config.validate(), Err(FaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let bad = [
            Thresholds { nms_threshold: f32::NAN, ..Thresholds::default() },
            Thresholds { nms_threshold: 1.5, ..Thresholds::default() },
            Thresholds { visibility_threshold: 1.2, ..Thresholds::default() },
            Thresholds { low_threshold: -0.1, ..Thresholds::default() },
            Thresholds { keep_top_k: 0, ..Thresholds::default() },
        ];
        for thresholds in bad {
            assert!(
                matches!(thresholds.validate(), Err(FaceError::InvalidConfig(_))),
                "{:?} accepted",
                thresholds
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_recognition() {
        let mut config = Config::default();
        config.recognition.embedding_dim = 0;
        assert!(matches!(config.validate(), Err(FaceError::InvalidConfig(_))));

        let mut config = Config::default();
        config.recognition.crop_margin = -0.2;
        assert!(matches!(config.validate(), Err(FaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_rejects_out_of_range_threshold() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[inference]
device = "CPU"
num_threads = 2

[models]
detector = "models/det.onnx"
embedder = "models/emb.onnx"

[detector]
architecture = "mobilenet0.25"

[detector.thresholds]
nms_threshold = 4.0

[recognition]
similarity_threshold = 0.4
embedding_dim = 512
"#
        )
        .unwrap();

        let err = Config::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err.downcast_ref::<FaceError>(), Some(FaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[inference]
device = "CPU"
num_threads = 2

[models]
detector = "models/det.onnx"
embedder = "models/emb.onnx"

[detector]
architecture = "resnet50"
input_size = 320

[detector.thresholds]
visibility_threshold = 0.8

[recognition]
similarity_threshold = 0.4
embedding_dim = 512
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        let detector = config.detector.detector_config();
        assert_eq!(detector.architecture, Architecture::ResNet50);
        assert_eq!(detector.input_size, 320);
        assert_eq!(config.detector.thresholds.visibility_threshold, 0.8);
        assert_eq!(config.detector.thresholds.top_k, 5000);
        assert_eq!(config.recognition.search_limit, 5);
        assert_eq!(config.inference.log_level, "info");
    }
}
