pub mod detection;
pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocess;
#[cfg(feature = "tflite")]
pub mod tflite;

pub use detection::Detection;
pub use detection::Detections;
pub use labels::LabelMap;
pub use model::{GraphModel, InputTensor, ModelLoader, OutputLayout, OutputTensor, RawDetections};
pub use postprocess::{build_detected_objects, FrameSize};
pub use preprocess::preprocess;
#[cfg(feature = "tflite")]
pub use tflite::{TfLiteLoader, TfLiteModel};
