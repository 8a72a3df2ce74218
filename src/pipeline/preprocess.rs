use image::imageops::{self, FilterType};
use image::DynamicImage;

use crate::pipeline::model::InputTensor;

/// Integer RGB pixels in `[height, width, channel]` order with a leading batch
/// dimension of one. When the graph has a fixed input size the image is
/// resized to it first; boxes come back normalized so this does not affect
/// the reported coordinates.
pub fn preprocess(image: &DynamicImage, input_size: Option<(u32, u32)>) -> InputTensor {
    let mut rgb = image.to_rgb8();
    if let Some((width, height)) = input_size {
        if (width, height) != rgb.dimensions() {
            tracing::debug!(
                from = ?rgb.dimensions(),
                to = ?(width, height),
                "resizing input to model size"
            );
            rgb = imageops::resize(&rgb, width, height, FilterType::Triangle);
        }
    }
    let (width, height) = rgb.dimensions();
    InputTensor {
        shape: [1, height as usize, width as usize, 3],
        data: rgb.into_raw(),
    }
}
