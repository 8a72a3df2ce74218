use std::fmt;

use serde::{Serialize, Serializer};

/// One accepted detection, in pixels of the source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class: String,
    #[serde(serialize_with = "serialize_score")]
    pub score: f32,
    /// `[x, y, width, height]`
    pub bbox: [f32; 4],
}

pub type Detections = Vec<Detection>;

impl Detection {
    /// Score as a fixed 4-decimal string, e.g. `"0.9000"`.
    pub fn score_text(&self) -> String {
        format!("{:.4}", self.score)
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [x, y, w, h] = self.bbox;
        write!(
            f,
            "{} {} at {:.1},{:.1} {:.1}x{:.1}",
            self.class,
            self.score_text(),
            x,
            y,
            w,
            h
        )
    }
}

fn serialize_score<S: Serializer>(score: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.4}", score))
}
