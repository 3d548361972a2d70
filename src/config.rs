use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir holding all persisted state.
pub const APP_DIR_NAME: &str = "stroke_pilot";

static CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
});

/// Base directory for persisted calibration and brush data.
pub fn config_dir() -> &'static Path {
    &CONFIG_DIR
}

/// Directory for generated artifacts (calibration screenshots).
pub fn output_dir() -> PathBuf {
    CONFIG_DIR.join("output")
}

/// Create the config and output directories if they do not exist yet.
pub fn ensure_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(output_dir())
}

pub fn calibration_file() -> PathBuf {
    config_dir().join("canvas_coordinates.txt")
}

pub fn captured_points_file() -> PathBuf {
    config_dir().join("captured_coordinates.txt")
}

pub fn slider_map_file() -> PathBuf {
    config_dir().join("brush_slider_positions.json")
}

pub fn canvas_screenshot_file() -> PathBuf {
    output_dir().join("canvas_screenshot.png")
}
