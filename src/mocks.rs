use crate::errors::Result;
use crate::traits::SegmentationModel;
use image::DynamicImage;
use ndarray::prelude::*;

/// Mock segmentation model for tests.
///
/// Passes the input through unchanged apart from guaranteeing an alpha
/// channel, which is the only postcondition callers rely on.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub image_size: u32,
}

impl MockSegmentationModel {
    pub const fn new(image_size: u32) -> Self {
        Self { image_size }
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgba8(img.to_rgba8()))
    }

    fn image_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let shape = tensor.shape();
        Ok(Array4::<f32>::zeros((shape[0], 1, shape[2], shape[3])))
    }
}

pub const fn create_mock_model() -> MockSegmentationModel {
    MockSegmentationModel::new(320)
}
