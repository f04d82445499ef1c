use crate::{
    background::BackgroundSpec,
    errors::{BgSwapError, Result},
    traits::SegmentationModel,
    BackgroundProcessor, ProcessRequest, ProcessedImage,
};

/// Default color offered before the user picks one.
pub const DEFAULT_COLOR: &str = "#007bff";

/// Which kind of background the user is currently configuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundOption {
    #[default]
    Color,
    Image,
}

/// Flat per-session UI flags.
///
/// Each user action replaces the state wholesale through [`SessionState::apply`];
/// nothing here is shared or mutated in place.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub uploaded_image: Option<Vec<u8>>,
    pub background_option: BackgroundOption,
    pub selected_color: String,
    pub uploaded_background: Option<Vec<u8>>,
    pub processed: Option<ProcessedImage>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            uploaded_image: None,
            background_option: BackgroundOption::Color,
            selected_color: DEFAULT_COLOR.to_string(),
            uploaded_background: None,
            processed: None,
        }
    }
}

/// User actions the page can emit.
#[derive(Debug, Clone)]
pub enum Action {
    UploadImage(Vec<u8>),
    UseColorBackground,
    UseImageBackground,
    PickColor(String),
    UploadBackground(Vec<u8>),
    Process,
    Clear,
}

impl SessionState {
    /// Pure transition: `(state, action) -> state`.
    ///
    /// On error the caller keeps the previous state, so a failed `Process`
    /// never leaves a partial or corrupt result visible.
    pub fn apply<M: SegmentationModel>(
        &self,
        action: Action,
        processor: &BackgroundProcessor<M>,
    ) -> Result<Self> {
        let mut next = self.clone();
        match action {
            Action::UploadImage(bytes) => {
                next.uploaded_image = Some(bytes);
                next.processed = None;
            }
            Action::UseColorBackground => {
                next.background_option = BackgroundOption::Color;
                // Switching modes discards the stored background image.
                next.uploaded_background = None;
            }
            Action::UseImageBackground => {
                next.background_option = BackgroundOption::Image;
            }
            Action::PickColor(code) => {
                // Validated at process time, like the rest of the request.
                next.selected_color = code;
            }
            Action::UploadBackground(bytes) => {
                next.uploaded_background = Some(bytes);
            }
            Action::Process => {
                let image_bytes = self.uploaded_image.as_deref().ok_or_else(|| {
                    BgSwapError::invalid_input("upload an image before processing")
                })?;
                let background = self.background_spec()?;
                next.processed = Some(processor.process(&ProcessRequest {
                    image_bytes,
                    background,
                })?);
            }
            Action::Clear => next = Self::default(),
        }
        Ok(next)
    }

    fn background_spec(&self) -> Result<BackgroundSpec> {
        match self.background_option {
            BackgroundOption::Color => BackgroundSpec::from_hex(&self.selected_color),
            BackgroundOption::Image => {
                let bytes = self.uploaded_background.as_deref().ok_or_else(|| {
                    BgSwapError::invalid_input(
                        "select a background color or upload a background image",
                    )
                })?;
                BackgroundSpec::from_image_bytes(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::create_mock_model;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn processor() -> BackgroundProcessor<crate::mocks::MockSegmentationModel> {
        BackgroundProcessor::new(create_mock_model())
    }

    fn sample_png() -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn defaults_match_the_page() {
        let state = SessionState::default();
        assert!(state.uploaded_image.is_none());
        assert_eq!(state.background_option, BackgroundOption::Color);
        assert_eq!(state.selected_color, DEFAULT_COLOR);
        assert!(state.uploaded_background.is_none());
        assert!(state.processed.is_none());
    }

    #[test]
    fn uploading_an_image_discards_the_previous_result() {
        let mut state = SessionState::default();
        state.processed = Some(ProcessedImage {
            png_bytes: vec![1, 2, 3],
            width: 1,
            height: 1,
        });

        let next = state
            .apply(Action::UploadImage(sample_png()), &processor())
            .unwrap();
        assert!(next.uploaded_image.is_some());
        assert!(next.processed.is_none());
    }

    #[test]
    fn switching_to_color_mode_clears_the_background_image() {
        let state = SessionState::default();
        let state = state
            .apply(Action::UseImageBackground, &processor())
            .unwrap();
        let state = state
            .apply(Action::UploadBackground(sample_png()), &processor())
            .unwrap();
        assert!(state.uploaded_background.is_some());

        let state = state.apply(Action::UseColorBackground, &processor()).unwrap();
        assert_eq!(state.background_option, BackgroundOption::Color);
        assert!(state.uploaded_background.is_none());
    }

    #[test]
    fn processing_without_an_upload_is_invalid_input() {
        let result = SessionState::default().apply(Action::Process, &processor());
        assert!(matches!(result, Err(BgSwapError::InvalidInput { .. })));
    }

    #[test]
    fn processing_in_image_mode_without_a_background_is_invalid_input() {
        let state = SessionState::default();
        let state = state
            .apply(Action::UploadImage(sample_png()), &processor())
            .unwrap();
        let state = state
            .apply(Action::UseImageBackground, &processor())
            .unwrap();

        let result = state.apply(Action::Process, &processor());
        assert!(matches!(result, Err(BgSwapError::InvalidInput { .. })));
    }

    #[test]
    fn processing_with_a_bad_color_is_invalid_input() {
        let state = SessionState::default();
        let state = state
            .apply(Action::UploadImage(sample_png()), &processor())
            .unwrap();
        let state = state
            .apply(Action::PickColor("not-a-color".to_string()), &processor())
            .unwrap();

        let result = state.apply(Action::Process, &processor());
        assert!(matches!(result, Err(BgSwapError::InvalidInput { .. })));
    }

    #[test]
    fn successful_processing_stores_a_decodable_result() {
        let state = SessionState::default();
        let state = state
            .apply(Action::UploadImage(sample_png()), &processor())
            .unwrap();
        let state = state.apply(Action::Process, &processor()).unwrap();

        let processed = state.processed.expect("result should be stored");
        let decoded = image::load_from_memory(&processed.png_bytes).unwrap();
        assert_eq!((processed.width, processed.height), (3, 3));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn clear_restores_the_defaults() {
        let state = SessionState::default();
        let state = state
            .apply(Action::UploadImage(sample_png()), &processor())
            .unwrap();
        let state = state
            .apply(Action::PickColor("#123456".to_string()), &processor())
            .unwrap();

        let cleared = state.apply(Action::Clear, &processor()).unwrap();
        assert!(cleared.uploaded_image.is_none());
        assert_eq!(cleared.selected_color, DEFAULT_COLOR);
    }
}
