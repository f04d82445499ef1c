use crate::errors::{BgSwapError, Result};
use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};

/// What goes behind the extracted foreground: a flat color or a
/// user-supplied image.
#[derive(Debug, Clone)]
pub enum BackgroundSpec {
    Color(Rgba<u8>),
    Image(DynamicImage),
}

impl BackgroundSpec {
    /// Parse a 6-hex-digit color code, with or without a leading `#`.
    ///
    /// The stored color is always fully opaque.
    pub fn from_hex(code: &str) -> Result<Self> {
        let digits = code.strip_prefix('#').unwrap_or(code);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BgSwapError::invalid_input(format!(
                "`{code}` is not a 6-hex-digit color code"
            )));
        }

        let mut channels = [0_u8; 3];
        for (i, channel) in channels.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16).map_err(|_| {
                BgSwapError::invalid_input(format!("`{code}` is not a 6-hex-digit color code"))
            })?;
        }

        let [red, green, blue] = channels;
        Ok(Self::Color(Rgba([red, green, blue, 255])))
    }

    /// Decode background image bytes supplied by an upload.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            BgSwapError::invalid_input(format!("background image is not decodable: {e}"))
        })?;
        Ok(Self::Image(image))
    }

    /// Synthesize the RGBA layer that goes behind a `width` x `height`
    /// foreground.
    ///
    /// Color layers are forced fully opaque whatever alpha the tuple carries;
    /// image layers are converted to RGBA and resized to the exact target
    /// size with Lanczos resampling. The foreground is never resized.
    pub fn to_layer(&self, width: u32, height: u32) -> RgbaImage {
        match self {
            Self::Color(Rgba([red, green, blue, _])) => {
                RgbaImage::from_pixel(width, height, Rgba([*red, *green, *blue, 255]))
            }
            Self::Image(image) => {
                imageops::resize(&image.to_rgba8(), width, height, FilterType::Lanczos3)
            }
        }
    }
}
