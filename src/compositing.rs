use crate::errors::{BgSwapError, Result};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Composite `foreground` over `background` with the standard "over"
/// operator in straight alpha.
///
/// The blend handles a semi-transparent background layer as well; with a
/// fully opaque background it reduces to
/// `out = fg_a * fg + (1 - fg_a) * bg` per channel, fully opaque output.
/// Both layers must already have identical dimensions.
pub fn alpha_composite(background: &RgbaImage, foreground: &RgbaImage) -> Result<RgbaImage> {
    if background.dimensions() != foreground.dimensions() {
        return Err(BgSwapError::processing(
            "alpha compositing",
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "background {}x{} does not match foreground {}x{}",
                    background.width(),
                    background.height(),
                    foreground.width(),
                    foreground.height()
                ),
            ),
        ));
    }

    let (width, height) = foreground.dimensions();
    let mut combined = RgbaImage::new(width, height);
    for ((out, fg), bg) in combined
        .pixels_mut()
        .zip(foreground.pixels())
        .zip(background.pixels())
    {
        *out = over(*fg, *bg);
    }
    Ok(combined)
}

/// Drop the alpha channel, yielding a three-channel image for formats
/// without transparency.
pub fn flatten(image: &RgbaImage) -> RgbImage {
    let mut flattened = RgbImage::new(image.width(), image.height());
    for (out, &Rgba([red, green, blue, _])) in flattened.pixels_mut().zip(image.pixels()) {
        *out = Rgb([red, green, blue]);
    }
    flattened
}

fn over(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = f32::from(fg[3]) / 255.0;
    let bg_alpha = f32::from(bg[3]) / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |fg_channel: u8, bg_channel: u8| {
        let value = (fg_alpha * f32::from(fg_channel)
            + bg_alpha * f32::from(bg_channel) * (1.0 - fg_alpha))
            / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(fg[0], bg[0]),
        blend(fg[1], bg[1]),
        blend(fg[2], bg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
