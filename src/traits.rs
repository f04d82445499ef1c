use crate::errors::Result;
use image::DynamicImage;
use ndarray::prelude::*;

/// Seam between the processing pipeline and the segmentation backend.
///
/// The pipeline only ever sees an image go in and an image with an alpha
/// channel come out; everything about tensors, runtimes, and weights stays
/// behind this trait. Tests swap in mock implementations.
pub trait SegmentationModel: Send + Sync {
    /// Isolate the foreground subject of `img`.
    ///
    /// The returned image has the same dimensions as the input and always
    /// carries an alpha channel, transparent where the background was.
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage>;

    /// Side length of the square input the model expects.
    fn image_size(&self) -> u32;

    /// Run raw inference on an NCHW tensor, returning the predicted matte.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>>;
}
