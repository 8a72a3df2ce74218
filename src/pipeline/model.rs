use serde::Deserialize;

use crate::{Error, Result};

/// Batched pixel tensor, laid out `[1, height, width, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: [usize; 4],
    pub data: Vec<u8>,
}

impl InputTensor {
    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// True when the tensor is an array of at least one row.
    pub fn is_batched(&self) -> bool {
        self.shape.len() >= 2 && self.shape[0] > 0
    }

    /// Values of the first batch row.
    pub fn first_row(&self) -> &[f32] {
        let row_len: usize = self.shape.iter().skip(1).product();
        &self.data[..row_len.min(self.data.len())]
    }
}

/// A deserialized graph ready to run. Implemented by the inference backend.
pub trait GraphModel {
    fn execute(&mut self, input: &InputTensor) -> Result<Vec<OutputTensor>>;

    /// `(width, height)` the graph expects, if it is fixed.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Turns fetched model bytes into a runnable graph.
pub trait ModelLoader {
    fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn GraphModel>>;
}

/// Which model output carries which piece of the detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// Per-candidate class ids.
    pub classes: usize,
    /// Per-candidate scores, one row per batch.
    pub scores: usize,
    /// Per-candidate `[minY, minX, maxY, maxX]` boxes, normalized to [0, 1].
    pub boxes: usize,
    /// Number of valid candidates, when the model reports it.
    pub count: Option<usize>,
}

impl Default for OutputLayout {
    /// Layout of the TensorFlow.js object detection graph export.
    fn default() -> Self {
        Self {
            classes: 0,
            scores: 1,
            boxes: 5,
            count: None,
        }
    }
}

impl OutputLayout {
    /// Layout of TF Lite SSD models ending in `TFLite_Detection_PostProcess`.
    pub fn ssd_postprocess() -> Self {
        Self {
            boxes: 0,
            classes: 1,
            scores: 2,
            count: Some(3),
        }
    }

    pub fn select<'a>(&self, outputs: &'a [OutputTensor]) -> Result<RawDetections<'a>> {
        let pick = |role: &'static str, index: usize| {
            outputs.get(index).ok_or(Error::MissingOutput {
                role,
                index,
                available: outputs.len(),
            })
        };
        let count = match self.count {
            Some(index) => pick("count", index)?
                .data
                .first()
                .map(|&count| count.max(0.0) as usize),
            None => None,
        };
        Ok(RawDetections {
            classes: pick("classes", self.classes)?,
            scores: pick("scores", self.scores)?,
            boxes: pick("boxes", self.boxes)?,
            count,
        })
    }
}

/// The raw output tensors of one inference, consumed by postprocessing.
#[derive(Debug, Clone, Copy)]
pub struct RawDetections<'a> {
    pub classes: &'a OutputTensor,
    pub scores: &'a OutputTensor,
    pub boxes: &'a OutputTensor,
    pub count: Option<usize>,
}
