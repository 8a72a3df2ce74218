use std::fmt;
use std::path::Path;

use serde::Deserialize;

use config::{Config, ConfigError};

use crate::pipeline::OutputLayout;

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Serialized model graph, local path or http(s) URL.
    pub model_url: String,
    /// Label mapping (JSON, or `<id> <name>` lines for `.txt`).
    pub classes_url: String,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_num_threads")]
    pub num_threads: u32,
    /// Defaults to the TF Lite SSD layout, matching the TF Lite backend.
    #[serde(default = "default_outputs")]
    pub outputs: OutputLayout,
}

fn default_threshold() -> f32 {
    0.5
}

fn default_num_threads() -> u32 {
    1
}

fn default_outputs() -> OutputLayout {
    OutputLayout::ssd_postprocess()
}

impl DetectorConfig {
    pub fn new(model_url: impl Into<String>, classes_url: impl Into<String>) -> Self {
        Self {
            model_url: model_url.into(),
            classes_url: classes_url.into(),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_url: "models/ssd_mobilenet_v2_coco_quant_postprocess.tflite".to_string(),
            classes_url: "models/coco_labels.txt".to_string(),
            threshold: default_threshold(),
            num_threads: default_num_threads(),
            outputs: default_outputs(),
        }
    }
}

impl fmt::Display for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "model {}, classes {}, threshold {}, {} threads, outputs classes={} scores={} boxes={}",
            self.model_url,
            self.classes_url,
            self.threshold,
            self.num_threads,
            self.outputs.classes,
            self.outputs.scores,
            self.outputs.boxes
        )
    }
}
