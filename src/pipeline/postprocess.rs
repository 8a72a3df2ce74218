use crate::pipeline::detection::{Detection, Detections};
use crate::pipeline::labels::{ClassId, LabelMap};
use crate::pipeline::model::RawDetections;

const UNKNOWN_CLASS: &str = "?";

/// Natural pixel size of the image detections are reported against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Keeps candidates scoring strictly above `threshold`, in model order, and
/// maps their normalized `[minY, minX, maxY, maxX]` boxes onto `frame`.
///
/// There is no non-max suppression: overlapping candidates are all reported.
pub fn build_detected_objects(
    raw: &RawDetections,
    labels: &LabelMap,
    threshold: f32,
    frame: FrameSize,
) -> Detections {
    let mut detections = Detections::new();

    if !raw.scores.is_batched() {
        tracing::error!(shape = ?raw.scores.shape, "Invalid scores format");
        return detections;
    }

    let mut scores = raw.scores.first_row();
    if let Some(count) = raw.count {
        scores = &scores[..count.min(scores.len())];
    }

    let width = frame.width as f32;
    let height = frame.height as f32;
    // boxes are [1, N, 4] (or [N, 4]); either way candidate i sits at 4 * i
    let boxes = &raw.boxes.data;

    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() || score <= threshold {
            continue;
        }
        let Some(location) = boxes.get(4 * index..4 * index + 4) else {
            tracing::warn!(index, "no box for candidate, skipping");
            continue;
        };
        let Some(&class_num) = raw.classes.data.get(index) else {
            tracing::warn!(index, "no class id for candidate, skipping");
            continue;
        };

        let ymin = location[0] * height;
        let xmin = location[1] * width;
        let ymax = location[2] * height;
        let xmax = location[3] * width;

        let class_num = class_num as ClassId;
        let class = match labels.lookup(class_num) {
            Some(class) => class.to_string(),
            None => {
                tracing::warn!(class_num, "class id missing from label map");
                UNKNOWN_CLASS.to_string()
            }
        };

        tracing::trace!("det class {class_num} with score {score} at {xmin},{ymin} - {xmax},{ymax}");
        detections.push(Detection {
            class,
            score,
            bbox: [xmin, ymin, xmax - xmin, ymax - ymin],
        });
    }

    detections
}
