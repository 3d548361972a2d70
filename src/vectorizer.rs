//! Raster → stroke paths.
//!
//! Three extraction strategies share one downstream shape: a binary
//! foreground mask is reduced to outer contours, each contour is simplified
//! with Douglas-Peucker at 0.1% of its perimeter and given a shape-factor
//! width estimate, and the result comes out as [`StrokePath`]s ready for the
//! path preparer and the execution controller.

use std::path::Path;
use std::str::FromStr;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::{dilate, erode};
use tracing::debug;

use crate::error::DrawError;
use crate::path_prep::{Point, StrokePath};

/// Gaussian sigma used to knock down sensor noise before thresholding.
const BLUR_SIGMA: f32 = 1.0;
/// Adaptive threshold window radius (window = 2r + 1 = 11px).
const ADAPTIVE_BLOCK_RADIUS: u32 = 5;
/// Bias subtracted from the local mean before comparing.
const ADAPTIVE_BIAS: i32 = 2;
/// Median filter radius for strict-stroke denoising (5x5 window).
const MEDIAN_RADIUS: u32 = 2;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
/// Contours below this enclosed area are noise in strict-stroke mode.
const MIN_STROKE_AREA: f64 = 10.0;
/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
const SIMPLIFY_PERIMETER_FRACTION: f64 = 0.001;
/// Circularity above which a contour is treated as near-circular.
const CIRCULARITY_ROUND: f64 = 0.7;

/// Selects which extraction strategy turns the raster into paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceMode {
    /// Adaptive-threshold mask, outer contours ranked by area descending.
    #[default]
    Contour,
    /// Median denoise + Canny edges + morphological closing; small contours
    /// discarded. Higher fidelity for line art.
    StrictStroke,
    /// Topological thinning to 1px centerlines, then contours of the
    /// skeleton.
    Skeleton,
}

impl FromStr for TraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contour" => Ok(TraceMode::Contour),
            "strict" | "strict-stroke" => Ok(TraceMode::StrictStroke),
            "skeleton" => Ok(TraceMode::Skeleton),
            other => Err(format!("unknown trace mode '{other}'")),
        }
    }
}

/// Load an image from disk and vectorize it.
pub fn vectorize_file(path: &Path, mode: TraceMode) -> Result<Vec<StrokePath>, DrawError> {
    let image = image::open(path).map_err(|source| DrawError::InvalidImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(vectorize(&image, mode))
}

/// Vectorize a decoded raster image into stroke paths with estimated widths.
pub fn vectorize(image: &DynamicImage, mode: TraceMode) -> Vec<StrokePath> {
    let gray = image.to_luma8();
    let paths = match mode {
        TraceMode::Contour => {
            let mask = foreground_mask(&gray);
            trace_mask(&mask, 0.0, true)
        }
        TraceMode::StrictStroke => {
            let denoised = median_filter(&gray, MEDIAN_RADIUS, MEDIAN_RADIUS);
            let edges = canny(&denoised, CANNY_LOW, CANNY_HIGH);
            // One dilation then one erosion closes single-pixel gaps
            // without growing stroke thickness.
            let closed = erode(&dilate(&edges, Norm::L1, 1), Norm::L1, 1);
            trace_mask(&closed, MIN_STROKE_AREA, false)
        }
        TraceMode::Skeleton => {
            let mask = foreground_mask(&gray);
            let skeleton = skeletonize(&mask);
            trace_mask(&skeleton, 0.0, false)
        }
    };
    debug!(mode = ?mode, paths = paths.len(), "vectorized image");
    paths
}

/// Binary mask with dark strokes as positive foreground: blur, then compare
/// each pixel against the local window mean minus a small bias.
fn foreground_mask(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
    adaptive_threshold_inv(&blurred, ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_BIAS)
}

/// Inverted adaptive threshold over an integral table: output is 255 where
/// the pixel is darker than the clamped-window mean minus `bias`, else 0.
///
/// `imageproc::contrast::adaptive_threshold` has no bias constant, and the
/// bias decides whether flat regions count as foreground, so this stays
/// local.
fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, bias: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let w = width as usize;
    let h = height as usize;

    // (w + 1) x (h + 1) summed-area table.
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32)[0]);
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    let r = block_radius as i64;
    let mut out = GrayImage::new(width, height);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - r).max(0) as usize;
            let y0 = (y - r).max(0) as usize;
            let x1 = ((x + r + 1).min(w as i64)) as usize;
            let y1 = ((y + r + 1).min(h as i64)) as usize;
            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let mean = (sum / count) as i32;
            let pixel = i32::from(gray.get_pixel(x as u32, y as u32)[0]);
            let value = if pixel < mean - bias { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    out
}

/// Zhang-Suen thinning: reduce every foreground stroke to a one-pixel-wide
/// centerline. Input is any nonzero-is-foreground mask.
fn skeletonize(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut grid: Vec<u8> = mask.pixels().map(|p| u8::from(p[0] > 0)).collect();

    let at = |grid: &[u8], x: isize, y: isize| -> u8 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            grid[y as usize * w + x as usize]
        }
    };

    let mut changed = true;
    while changed {
        changed = false;
        for pass in 0..2 {
            let mut to_clear = Vec::new();
            for y in 0..h as isize {
                for x in 0..w as isize {
                    if at(&grid, x, y) == 0 {
                        continue;
                    }
                    // Clockwise neighbours starting north.
                    let n = [
                        at(&grid, x, y - 1),
                        at(&grid, x + 1, y - 1),
                        at(&grid, x + 1, y),
                        at(&grid, x + 1, y + 1),
                        at(&grid, x, y + 1),
                        at(&grid, x - 1, y + 1),
                        at(&grid, x - 1, y),
                        at(&grid, x - 1, y - 1),
                    ];
                    let b: u8 = n.iter().sum();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let a = (0..8).filter(|&i| n[i] == 0 && n[(i + 1) % 8] == 1).count();
                    if a != 1 {
                        continue;
                    }
                    let (c1, c2) = if pass == 0 {
                        (n[0] * n[2] * n[4], n[2] * n[4] * n[6])
                    } else {
                        (n[0] * n[2] * n[6], n[0] * n[4] * n[6])
                    };
                    if c1 == 0 && c2 == 0 {
                        to_clear.push((x as usize, y as usize));
                    }
                }
            }
            if !to_clear.is_empty() {
                changed = true;
                for (x, y) in to_clear {
                    grid[y * w + x] = 0;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        Luma([grid[y as usize * w + x as usize] * 255])
    })
}

/// Extract outer contours of a mask and turn each into a simplified stroke
/// path. `min_area` discards noise contours; `rank_by_area` sorts the output
/// largest-first so dominant shapes are drawn before detail.
fn trace_mask(mask: &GrayImage, min_area: f64, rank_by_area: bool) -> Vec<StrokePath> {
    let mut contours: Vec<Vec<Point>> = find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 2)
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect();

    if rank_by_area {
        contours.sort_by(|a, b| {
            enclosed_area(b)
                .partial_cmp(&enclosed_area(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    contours
        .into_iter()
        .filter_map(|contour| {
            let area = enclosed_area(&contour);
            if area < min_area {
                return None;
            }
            let perimeter = closed_perimeter(&contour);
            let width = estimate_stroke_width(&contour, area, perimeter);
            let simplified =
                simplify_closed(&contour, SIMPLIFY_PERIMETER_FRACTION * perimeter);
            Some(StrokePath::new(simplified, width))
        })
        .collect()
}

/// Absolute enclosed (shoelace) area of a closed contour.
pub(crate) fn enclosed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    (twice_area / 2.0).abs()
}

fn closed_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut length = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        length += (b.x - a.x).hypot(b.y - a.y);
    }
    length
}

/// Shape-factor width estimate. Near-circular blobs (circularity > 0.7) get
/// the equivalent-circle diameter; elongated shapes get area over the
/// shorter bounding-box side. Floored at 1.0.
fn estimate_stroke_width(contour: &[Point], area: f64, perimeter: f64) -> f64 {
    if contour.len() < 5 || perimeter == 0.0 {
        return 1.0;
    }
    let circularity = 4.0 * std::f64::consts::PI * area / (perimeter * perimeter);
    let width = if circularity > CIRCULARITY_ROUND {
        2.0 * (area / std::f64::consts::PI).sqrt()
    } else {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in contour {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        let shorter = (max_x - min_x).min(max_y - min_y).max(1.0);
        area / shorter
    };
    width.max(1.0)
}

/// Douglas-Peucker over a closed contour: split at the vertex farthest from
/// the start, simplify both halves as open polylines and rejoin.
fn simplify_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let start = points[0];
    let split = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let da = (a.x - start.x).hypot(a.y - start.y);
            let db = (b.x - start.x).hypot(b.y - start.y);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(points.len() / 2);

    let mut second: Vec<Point> = points[split..].to_vec();
    second.push(start);

    let mut first_half = simplify_open(&points[..=split], epsilon);
    let second_half = simplify_open(&second, epsilon);

    first_half.pop(); // shared split vertex
    first_half.extend_from_slice(&second_half[..second_half.len() - 1]);
    first_half
}

fn simplify_open(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut index = 0;
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = perpendicular_distance(*p, first, last);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        let mut left = simplify_open(&points[..=index], epsilon);
        let right = simplify_open(&points[index..], epsilon);
        left.pop();
        left.extend_from_slice(&right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (p.x - a.x).hypot(p.y - a.y);
    }
    ((dy * p.x - dx * p.y + b.x * a.y - b.y * a.x) / len).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_produces_no_paths() {
        let mask = GrayImage::new(10, 10);
        assert!(trace_mask(&mask, 0.0, true).is_empty());
    }

    #[test]
    fn skeleton_of_thick_line_is_thin() {
        let mut mask = GrayImage::new(30, 30);
        for y in 10..16 {
            for x in 2..28 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let skeleton = skeletonize(&mask);
        for x in 8..22 {
            let lit = (0..30)
                .filter(|&y| skeleton.get_pixel(x, y)[0] > 0)
                .count();
            assert!(lit <= 2, "column {x} still {lit} pixels wide");
        }
    }

    #[test]
    fn simplify_collapses_collinear_points() {
        let line: Vec<Point> = (0..20).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let simplified = simplify_open(&line, 0.5);
        assert_eq!(simplified, vec![Point::new(0.0, 0.0), Point::new(19.0, 0.0)]);
    }

    #[test]
    fn adaptive_threshold_marks_dark_strokes() {
        let mut gray = GrayImage::from_pixel(20, 20, Luma([255]));
        for x in 5..15 {
            gray.put_pixel(x, 10, Luma([0]));
        }
        let mask = adaptive_threshold_inv(&gray, 5, 2);
        assert!(mask.get_pixel(10, 10)[0] > 0);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
    }
}
