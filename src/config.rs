use clap::Parser;
use std::path::PathBuf;

use crate::background::BackgroundSpec;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Photo whose background gets replaced
    pub input: PathBuf,

    /// Where the composited PNG is written
    #[arg(default_value = "processed_image.png")]
    pub output: PathBuf,

    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Solid background color as a 6-hex-digit code
    #[arg(short, long, default_value = "#007bff", value_parser = check_color)]
    pub color: String,

    /// Background image; takes precedence over --color
    #[arg(short, long)]
    pub background: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,
}

fn check_color(s: &str) -> Result<String, String> {
    BackgroundSpec::from_hex(s)
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_validation_mirrors_the_background_parser() {
        assert!(check_color("#007bff").is_ok());
        assert!(check_color("deadbe").is_ok());
        assert!(check_color("#xyzxyz").is_err());
        assert!(check_color("fff").is_err());
    }
}
