use std::path::Path;

use crate::{
    errors::{BgSwapError, Result},
    traits::SegmentationModel,
};
use image::{
    imageops, imageops::FilterType, DynamicImage, GenericImageView, ImageBuffer, Luma, RgbImage,
    RgbaImage,
};
use imageproc::filter::gaussian_blur_f32;
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

/// Fallback input size when the ONNX export declares a dynamic spatial dim.
/// U2-Net, the reference model family, runs at 320x320.
const DEFAULT_IMAGE_SIZE: u32 = 320;

/// ImageNet normalization applied by the U2-Net family at training time.
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Edge refinement smooths the semi-transparent band at the subject boundary
/// at some latency cost.
const REFINE_EDGES: bool = true;
const MATTE_REFINEMENT_SIGMA: f32 = 1.0;

type Matte = ImageBuffer<Luma<f32>, Vec<f32>>;

pub struct Model {
    image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        tracing::info!("loading segmentation model from {}", model_path.display());

        let mut session = SessionBuilder::new()
            .map_err(|e| BgSwapError::processing("session builder initialization", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| BgSwapError::processing("execution provider registration", e))?
            .with_memory_pattern(true)
            .map_err(|e| BgSwapError::processing("memory pattern configuration", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                BgSwapError::processing(format!("model load: {}", model_path.display()), e)
            })?;

        let image_size = match session.inputs[0].input_type.tensor_shape() {
            Some(shape) if shape[2] > 0 => shape[2] as u32,
            _ => DEFAULT_IMAGE_SIZE,
        };
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        // Warm-up inference: weights load once at construction, not on the
        // first user request.
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)
                .map_err(|e| BgSwapError::processing("warm-up tensor creation", e))?])
            .map_err(|e| BgSwapError::processing("warm-up inference", e))?;

        tracing::info!(image_size, "segmentation model ready");

        Ok(Self {
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?],
        )?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl SegmentationModel for Model {
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let _span = tracing::debug_span!("segment_image").entered();

        let rgb_img = img.to_rgb8();
        let tensor = preprocess(&rgb_img, self.image_size);
        let prediction = self.predict(tensor.view())?;

        let (width, height) = img.dimensions();
        let matte = postprocess_matte(prediction, self.image_size, width, height)?;
        let matte = if REFINE_EDGES {
            refine_matte(&matte)
        } else {
            matte
        };

        let cutout = apply_matte(img, &matte)?;
        Ok(DynamicImage::ImageRgba8(cutout))
    }

    fn image_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        Model::predict(self, tensor)
    }
}

/// Resize to the model's square input and build a normalized NCHW tensor.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let mut tensor = resized.as_ndarray3().mapv(|v| f32::from(v) / 255.0);
    for (channel, mut plane) in tensor.outer_iter_mut().enumerate() {
        plane.mapv_inplace(|v| (v - NORM_MEAN[channel]) / NORM_STD[channel]);
    }
    tensor.slice_move(s![NewAxis, .., .., ..])
}

/// Rescale the raw prediction to the full 0..1 range and bring it back to the
/// source dimensions.
///
/// The min-max rescale matches the reference postprocessing of the U2-Net
/// family, whose raw mattes rarely span the whole range.
pub fn postprocess_matte(
    prediction: Array4<f32>,
    image_size: u32,
    width: u32,
    height: u32,
) -> Result<Matte> {
    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let mut data = prediction.into_raw_vec_and_offset().0;
    if range > f32::EPSILON {
        for value in &mut data {
            *value = (*value - min) / range;
        }
    }

    let matte = ImageBuffer::from_raw(image_size, image_size, data).ok_or_else(|| {
        BgSwapError::processing(
            "matte construction",
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "prediction does not fit the model's output dimensions",
            ),
        )
    })?;
    Ok(imageops::resize(
        &matte,
        width,
        height,
        FilterType::Lanczos3,
    ))
}

fn refine_matte(matte: &Matte) -> Matte {
    gaussian_blur_f32(matte, MATTE_REFINEMENT_SIGMA)
}

/// Write the matte into the alpha channel of `img`.
fn apply_matte(img: &DynamicImage, matte: &Matte) -> Result<RgbaImage> {
    let mut rgba_img = img.to_rgba8();
    if rgba_img.dimensions() != matte.dimensions() {
        return Err(BgSwapError::processing(
            "matte application",
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "image {}x{} does not match matte {}x{}",
                    rgba_img.width(),
                    rgba_img.height(),
                    matte.width(),
                    matte.height()
                ),
            ),
        ));
    }

    for (pixel, &Luma([alpha])) in rgba_img.pixels_mut().zip(matte.pixels()) {
        pixel[3] = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    Ok(rgba_img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn preprocess_produces_normalized_nchw_tensor() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let tensor = preprocess(&image, 4);

        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        for channel in 0..3 {
            let expected = (1.0 - NORM_MEAN[channel]) / NORM_STD[channel];
            let value = tensor[[0, channel, 0, 0]];
            assert!(
                (value - expected).abs() < 1e-3,
                "channel {channel}: {value} vs {expected}"
            );
        }
    }

    #[test]
    fn postprocess_rescales_matte_to_full_range() {
        let prediction =
            Array4::from_shape_vec((1, 1, 2, 2), vec![0.25, 0.5, 0.75, 1.0]).unwrap();
        let matte = postprocess_matte(prediction, 2, 2, 2).unwrap();

        assert_eq!(matte.dimensions(), (2, 2));
        let values: Vec<f32> = matte.pixels().map(|&Luma([v])| v).collect();
        let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min.abs() < 1e-3);
        assert!((max - 1.0).abs() < 1e-3);
    }

    #[test]
    fn postprocess_handles_constant_prediction() {
        let prediction = Array4::from_elem((1, 1, 2, 2), 0.7);
        let matte = postprocess_matte(prediction, 2, 4, 4).unwrap();

        assert_eq!(matte.dimensions(), (4, 4));
    }

    #[test]
    fn apply_matte_writes_alpha_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])));
        let matte = Matte::from_pixel(2, 2, Luma([0.5]));

        let cutout = apply_matte(&img, &matte).unwrap();
        let pixel = cutout.get_pixel(0, 0);
        assert_eq!(&pixel.0[..3], &[10, 20, 30]);
        assert_eq!(pixel.0[3], 128);
    }

    #[test]
    fn apply_matte_rejects_mismatched_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let matte = Matte::from_pixel(3, 3, Luma([1.0]));

        let result = apply_matte(&img, &matte);
        assert!(matches!(
            result,
            Err(BgSwapError::ProcessingFailure { .. })
        ));
    }
}
