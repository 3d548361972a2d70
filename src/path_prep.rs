//! Path post-processing between vectorization and replay: dropping
//! degenerate paths, growing sub-drawable marks to a usable footprint and
//! mapping estimated stroke widths onto the discrete brush-size domain.

/// A 2D point in canvas-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One drawable gesture: an ordered point sequence plus the estimated width
/// of the stroke it was traced from. Always has at least one point and a
/// width of at least 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePath {
    pub points: Vec<Point>,
    pub width: f64,
}

impl StrokePath {
    pub fn new(points: Vec<Point>, width: f64) -> Self {
        Self {
            points,
            width: width.max(1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest axis-aligned span of the path: `max(max_x - min_x, max_y - min_y)`.
    pub fn bounding_extent(&self) -> f64 {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in &self.points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        (max_x - min_x).max(max_y - min_y)
    }
}

/// Minimum point count a path needs to survive [`filter_short_paths`].
pub const DEFAULT_MIN_POINTS: usize = 3;
/// Bounding extent below which [`extend_short_path`] kicks in.
pub const EXTEND_THRESHOLD: f64 = 7.0;
/// Footprint the endpoint extension aims for.
pub const EXTEND_TARGET_LENGTH: f64 = 6.0;
/// Number of discrete brush sizes the target application offers.
pub const BRUSH_SIZE_COUNT: u8 = 10;

/// Drop every path with fewer than `min_points` points, preserving the order
/// of the survivors. Interior points are never touched.
pub fn filter_short_paths(paths: Vec<StrokePath>, min_points: usize) -> Vec<StrokePath> {
    paths.into_iter().filter(|p| p.len() >= min_points).collect()
}

/// Guarantee a drawable minimum footprint for tiny marks.
///
/// Paths whose bounding extent already reaches `threshold` are returned
/// unchanged. Anything smaller has its first and last point pushed outward
/// symmetrically along the first→last direction, scaled so the added span is
/// `target_length` (a zero-length direction falls back to the unit diagonal).
/// Interior points are left exactly as they were, so a single-pixel mark
/// still produces a visible stroke without distorting larger shapes.
pub fn extend_short_path(path: StrokePath, threshold: f64, target_length: f64) -> StrokePath {
    if path.len() < 2 {
        return path;
    }
    if path.bounding_extent() >= threshold {
        return path;
    }

    let first = path.points[0];
    let last = path.points[path.len() - 1];
    let mut dx = last.x - first.x;
    let mut dy = last.y - first.y;
    let mut span = dx.hypot(dy);
    if span == 0.0 {
        dx = 1.0;
        dy = 1.0;
        span = dx.hypot(dy);
    }
    let ratio = target_length / span;

    let mut points = Vec::with_capacity(path.len());
    points.push(Point::new(
        first.x - dx * ratio / 2.0,
        first.y - dy * ratio / 2.0,
    ));
    points.extend_from_slice(&path.points[1..path.len() - 1]);
    points.push(Point::new(
        last.x + dx * ratio / 2.0,
        last.y + dy * ratio / 2.0,
    ));

    StrokePath {
        points,
        width: path.width,
    }
}

/// Map an estimated stroke width to a discrete brush size in 1..=10.
///
/// Monotonic step function: a width of at most `k` maps to size `k`
/// (a width exactly equal to `k` stays at `k`); anything above 9 saturates
/// at 10.
pub fn map_width_to_brush_size(width: f64) -> u8 {
    for size in 1..BRUSH_SIZE_COUNT {
        if width <= f64::from(size) {
            return size;
        }
    }
    BRUSH_SIZE_COUNT
}
