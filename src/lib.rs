pub mod background;
pub mod compositing;
pub mod config;
pub mod errors;
pub mod model;
pub mod session;
pub mod traits;

pub mod mocks;

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};

pub use background::BackgroundSpec;
pub use config::Config;
pub use errors::{BgSwapError, Result};
pub use model::Model;
pub use session::{Action, BackgroundOption, SessionState};
pub use traits::SegmentationModel;

#[cfg(test)]
pub use mocks::*;

/// Encoded result of one processing request, ready for download.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    /// Download filename offered to the user.
    pub const FILE_NAME: &'static str = "processed_image.png";
    /// MIME type of the encoded payload.
    pub const MIME_TYPE: &'static str = "image/png";
}

/// One user action's worth of work: the uploaded bytes plus the chosen
/// background.
#[derive(Debug)]
pub struct ProcessRequest<'a> {
    pub image_bytes: &'a [u8],
    pub background: BackgroundSpec,
}

pub struct BackgroundProcessor<M: SegmentationModel> {
    model: M,
}

impl<M: SegmentationModel> BackgroundProcessor<M> {
    pub const fn new(model: M) -> Self {
        Self { model }
    }

    /// Matting stage: decode the uploaded bytes and strip the background.
    ///
    /// The returned cutout has the source dimensions and always carries an
    /// alpha channel. Empty or undecodable bytes fail with `InvalidInput`
    /// before the model is invoked.
    pub fn remove_background(&self, image_bytes: &[u8]) -> Result<DynamicImage> {
        if image_bytes.is_empty() {
            return Err(BgSwapError::invalid_input(
                "no image bytes provided for background removal",
            ));
        }

        let image = image::load_from_memory(image_bytes)
            .map_err(|e| BgSwapError::invalid_input(format!("image is not decodable: {e}")))?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "removing background"
        );
        self.model.segment_image(&image)
    }

    /// Compositing stage: place `foreground` over the requested background
    /// and flatten to three channels.
    ///
    /// The output has the foreground's exact dimensions; background images
    /// are resized to fit, never the foreground. A foreground without an
    /// alpha channel fails with `InvalidInput`.
    pub fn change_background(
        &self,
        foreground: &DynamicImage,
        background: &BackgroundSpec,
    ) -> Result<RgbImage> {
        if !foreground.color().has_alpha() {
            return Err(BgSwapError::invalid_input(
                "foreground image must have an alpha channel",
            ));
        }

        let foreground = foreground.to_rgba8();
        let (width, height) = foreground.dimensions();
        let layer = background.to_layer(width, height);
        let combined = compositing::alpha_composite(&layer, &foreground)?;
        Ok(compositing::flatten(&combined))
    }

    /// Full chain: matting, compositing, PNG encoding.
    pub fn process(&self, request: &ProcessRequest<'_>) -> Result<ProcessedImage> {
        let cutout = self.remove_background(request.image_bytes)?;
        let composited = self.change_background(&cutout, &request.background)?;

        let (width, height) = composited.dimensions();
        let mut png_bytes = Vec::new();
        composited
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| BgSwapError::processing("png encoding", e))?;
        tracing::info!(width, height, "processed image ready");

        Ok(ProcessedImage {
            png_bytes,
            width,
            height,
        })
    }
}

impl BackgroundProcessor<Model> {
    /// Construct with the ONNX-backed model described by `config`.
    pub fn with_onnx_model(config: &Config) -> Result<Self> {
        let model = Model::new(&config.model_path, config.device_id)?;
        Ok(Self::new(model))
    }
}
