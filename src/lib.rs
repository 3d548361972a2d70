//! stroke_pilot reproduces a raster image inside a live, externally-owned
//! drawing canvas: it vectorizes the image into stroke paths, locates and
//! calibrates the target window's drawable region, then replays the paths as
//! simulated pointer gestures supervised by an asynchronous pause/cancel
//! signal.

pub mod brush;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod executor;
pub mod input;
pub mod locator;
pub mod logging;
pub mod path_prep;
pub mod vectorizer;
