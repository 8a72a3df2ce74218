pub mod app;
pub mod detector;
pub mod error;
pub mod media;
pub mod pipeline;

pub use app::DetectorConfig;
pub use detector::Detector;
pub use error::{Error, Result};
pub use media::AssetLocation;
pub use pipeline::{Detection, Detections, LabelMap, OutputLayout};
