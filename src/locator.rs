//! Canvas calibration: find the target application's window, normalise its
//! size and position, then work out the screen rectangle of the drawable
//! region — by colour segmentation when the canvas is visible, by a
//! geometric guess when it is not — and persist the result.

use std::path::PathBuf;
use std::time::Duration;

use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use tracing::{debug, info, warn};

use crate::coordinates;
use crate::error::DrawError;
use crate::path_prep::Point;

/// Window titles the locator accepts, in match priority order.
pub const ACCEPTED_TITLES: &[&str] = &["定制喜贴", "喜茶GO"];

/// Canonical window geometry the target is forced into before segmentation,
/// so the slider and canvas land in predictable places.
pub const CANONICAL_SIZE: (i32, i32) = (450, 1089);
pub const CANONICAL_POSITION: (i32, i32) = (1371, 0);

/// Inclusive per-channel band for the canvas background colour (#EEEEEE,
/// widened to tolerate compositing differences).
const GRAY_BAND: std::ops::RangeInclusive<u8> = 220..=240;

/// Geometric fallback fractions of the window rectangle.
const FALLBACK_LEFT_MARGIN: f64 = 0.1;
const FALLBACK_TOP_MARGIN: f64 = 0.2;
const FALLBACK_WIDTH: f64 = 0.8;
const FALLBACK_HEIGHT: f64 = 0.6;

/// Screen rectangle of the drawable canvas region, in absolute screen
/// coordinates. Overwritten on every calibration run; read-only downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRecord {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Position and size of a top-level window, absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Opaque handle to a native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub isize);

/// Window-management facility the locator drives. The real implementation
/// talks to Win32; tests substitute [`MockWindowBackend`].
pub trait WindowBackend {
    /// First visible window whose title contains any of `titles`.
    fn find_window(&self, titles: &[&str]) -> Option<WindowHandle>;
    fn activate(&self, window: WindowHandle) -> anyhow::Result<()>;
    fn resize(&self, window: WindowHandle, width: i32, height: i32) -> anyhow::Result<()>;
    fn move_to(&self, window: WindowHandle, left: i32, top: i32) -> anyhow::Result<()>;
    fn rect(&self, window: WindowHandle) -> anyhow::Result<WindowRect>;
}

/// Screen-capture facility: grab a pixel region as an RGBA image.
pub trait CaptureBackend {
    fn capture_area(&self, left: i32, top: i32, width: i32, height: i32)
        -> anyhow::Result<RgbaImage>;
}

/// Calibration phases, in the order they run. `Estimating` is only entered
/// when segmentation finds no canvas-coloured region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    SearchingWindow,
    Positioning,
    SegmentingCanvas,
    Estimating,
    Persisted,
    Failed,
}

/// Fixed settle delays absorbing window-manager animation after each
/// positioning step. Calibrated latencies, not adaptive.
#[derive(Debug, Clone, Copy)]
pub struct SettleDelays {
    pub activate: Duration,
    pub resize: Duration,
    pub reposition: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            activate: Duration::from_millis(1000),
            resize: Duration::from_millis(1000),
            reposition: Duration::from_millis(500),
        }
    }
}

impl SettleDelays {
    pub fn immediate() -> Self {
        Self {
            activate: Duration::ZERO,
            resize: Duration::ZERO,
            reposition: Duration::ZERO,
        }
    }
}

/// Where the calibration run writes its outputs.
#[derive(Debug, Clone)]
pub struct PersistTargets {
    pub calibration_file: PathBuf,
    pub screenshot_file: PathBuf,
}

/// Result of a calibration run. A persistence failure is carried alongside
/// the record rather than replacing it: the in-memory rectangle is still
/// valid for this run.
#[derive(Debug)]
pub struct CalibrationOutcome {
    pub record: CalibrationRecord,
    pub persist_error: Option<DrawError>,
}

pub struct CanvasLocator<W, C> {
    window: W,
    capture: C,
    targets: PersistTargets,
    settle: SettleDelays,
}

impl<W: WindowBackend, C: CaptureBackend> CanvasLocator<W, C> {
    pub fn new(window: W, capture: C, targets: PersistTargets) -> Self {
        Self {
            window,
            capture,
            targets,
            settle: SettleDelays::default(),
        }
    }

    pub fn with_settle_delays(mut self, settle: SettleDelays) -> Self {
        self.settle = settle;
        self
    }

    /// Run the full calibration sequence.
    ///
    /// A missing window is terminal ([`DrawError::WindowNotFound`], no
    /// retry). A segmentation miss is not an error: the geometric estimate
    /// takes over silently.
    pub fn calibrate(&self) -> Result<CalibrationOutcome, DrawError> {
        debug!(state = ?LocatorState::SearchingWindow, "calibration started");
        let handle = self.window.find_window(ACCEPTED_TITLES).ok_or_else(|| {
            warn!(state = ?LocatorState::Failed, "no accepted window present");
            DrawError::WindowNotFound
        })?;

        debug!(state = ?LocatorState::Positioning, ?handle, "normalising window");
        self.position_window(handle);

        let rect = self
            .window
            .rect(handle)
            .map_err(|e| {
                warn!(state = ?LocatorState::Failed, error = %e, "window rect unavailable");
                DrawError::WindowNotFound
            })?;

        debug!(state = ?LocatorState::SegmentingCanvas, ?rect, "segmenting canvas");
        let record = match self.segment_canvas(&rect) {
            Some(record) => record,
            None => {
                debug!(state = ?LocatorState::Estimating, "no canvas-coloured region; estimating");
                estimate_canvas(&rect)
            }
        };
        info!(?record, "canvas located");

        let persist_error = self.persist(&record).err();
        match &persist_error {
            None => debug!(state = ?LocatorState::Persisted, "calibration persisted"),
            Some(e) => warn!(error = %e, "calibration persistence failed"),
        }

        Ok(CalibrationOutcome {
            record,
            persist_error,
        })
    }

    /// Activate, resize to the canonical size, reposition, with a settle
    /// delay after each step. Positioning faults are logged and tolerated:
    /// segmentation works on whatever rectangle the window ends up with.
    fn position_window(&self, handle: WindowHandle) {
        if let Err(e) = self.window.activate(handle) {
            warn!(error = %e, "window activation failed");
        }
        std::thread::sleep(self.settle.activate);

        let (width, height) = CANONICAL_SIZE;
        if let Err(e) = self.window.resize(handle, width, height) {
            warn!(error = %e, "window resize failed");
        }
        std::thread::sleep(self.settle.resize);

        let (left, top) = CANONICAL_POSITION;
        if let Err(e) = self.window.move_to(handle, left, top) {
            warn!(error = %e, "window reposition failed");
        }
        std::thread::sleep(self.settle.reposition);
    }

    fn segment_canvas(&self, rect: &WindowRect) -> Option<CalibrationRecord> {
        let shot = match self
            .capture
            .capture_area(rect.left, rect.top, rect.width, rect.height)
        {
            Ok(shot) => shot,
            Err(e) => {
                warn!(error = %e, "window capture failed; falling back to estimate");
                return None;
            }
        };
        let (x, y, width, height) = largest_gray_region(&shot)?;
        Some(CalibrationRecord {
            left: rect.left + x,
            top: rect.top + y,
            width,
            height,
        })
    }

    /// Write the calibration file and a screenshot of the located rectangle
    /// as a diagnostic artifact.
    fn persist(&self, record: &CalibrationRecord) -> Result<(), DrawError> {
        coordinates::write_calibration(&self.targets.calibration_file, record)?;

        let shot = self
            .capture
            .capture_area(record.left, record.top, record.width, record.height)
            .map_err(|cause| DrawError::Persistence {
                what: "calibration screenshot",
                cause,
            })?;
        shot.save(&self.targets.screenshot_file)
            .map_err(|e| DrawError::Persistence {
                what: "calibration screenshot",
                cause: e.into(),
            })
    }
}

/// Bounding box of the largest contiguous region whose pixels sit in the
/// canvas-gray colour band, or `None` if no pixel matches.
pub fn largest_gray_region(image: &RgbaImage) -> Option<(i32, i32, i32, i32)> {
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let matches = GRAY_BAND.contains(&p[0])
            && GRAY_BAND.contains(&p[1])
            && GRAY_BAND.contains(&p[2]);
        Luma([if matches { 255 } else { 0 }])
    });

    let contours: Vec<Vec<Point>> = find_contours::<u32>(&mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect();

    let largest = contours.into_iter().max_by(|a, b| {
        crate::vectorizer::enclosed_area(a)
            .partial_cmp(&crate::vectorizer::enclosed_area(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in &largest {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((
        min_x as i32,
        min_y as i32,
        (max_x - min_x) as i32 + 1,
        (max_y - min_y) as i32 + 1,
    ))
}

/// Geometric fallback: fixed fractions of the window rectangle (10% left
/// margin, 20% top margin, 80% x 60% canvas), truncated to integers.
pub fn estimate_canvas(rect: &WindowRect) -> CalibrationRecord {
    CalibrationRecord {
        left: rect.left + (f64::from(rect.width) * FALLBACK_LEFT_MARGIN) as i32,
        top: rect.top + (f64::from(rect.height) * FALLBACK_TOP_MARGIN) as i32,
        width: (f64::from(rect.width) * FALLBACK_WIDTH) as i32,
        height: (f64::from(rect.height) * FALLBACK_HEIGHT) as i32,
    }
}

/// Window backend backed by Win32 enumeration.
#[derive(Debug, Default)]
pub struct SystemWindowBackend;

#[cfg(target_os = "windows")]
mod system_window {
    use super::{SystemWindowBackend, WindowBackend, WindowHandle, WindowRect};
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
        SetForegroundWindow, SetWindowPos, ShowWindow, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
        SW_RESTORE,
    };

    fn hwnd(handle: WindowHandle) -> HWND {
        HWND(handle.0 as *mut core::ffi::c_void)
    }

    unsafe extern "system" fn enum_cb(window: HWND, lparam: LPARAM) -> BOOL {
        let list = &mut *(lparam.0 as *mut Vec<(isize, String)>);
        if !IsWindowVisible(window).as_bool() {
            return BOOL(1);
        }
        let title_len = GetWindowTextLengthW(window);
        if title_len <= 0 {
            return BOOL(1);
        }
        let mut buf = vec![0u16; title_len as usize + 1];
        let read = GetWindowTextW(window, &mut buf);
        if read > 0 {
            let title = String::from_utf16_lossy(&buf[..read as usize]);
            list.push((window.0 as isize, title));
        }
        BOOL(1)
    }

    fn enumerate_titled_windows() -> Vec<(isize, String)> {
        let mut list: Vec<(isize, String)> = Vec::new();
        let ptr = &mut list as *mut Vec<(isize, String)>;
        unsafe {
            let _ = EnumWindows(Some(enum_cb), LPARAM(ptr as isize));
        }
        list
    }

    impl WindowBackend for SystemWindowBackend {
        fn find_window(&self, titles: &[&str]) -> Option<WindowHandle> {
            for (handle, title) in enumerate_titled_windows() {
                if titles.iter().any(|t| title.contains(t)) {
                    return Some(WindowHandle(handle));
                }
            }
            None
        }

        fn activate(&self, window: WindowHandle) -> anyhow::Result<()> {
            unsafe {
                let _ = ShowWindow(hwnd(window), SW_RESTORE);
                let _ = SetForegroundWindow(hwnd(window));
            }
            Ok(())
        }

        fn resize(&self, window: WindowHandle, width: i32, height: i32) -> anyhow::Result<()> {
            unsafe {
                SetWindowPos(hwnd(window), None, 0, 0, width, height, SWP_NOMOVE | SWP_NOZORDER)?;
            }
            Ok(())
        }

        fn move_to(&self, window: WindowHandle, left: i32, top: i32) -> anyhow::Result<()> {
            unsafe {
                SetWindowPos(hwnd(window), None, left, top, 0, 0, SWP_NOSIZE | SWP_NOZORDER)?;
            }
            Ok(())
        }

        fn rect(&self, window: WindowHandle) -> anyhow::Result<WindowRect> {
            let mut rect = RECT::default();
            unsafe { GetWindowRect(hwnd(window), &mut rect) }?;
            Ok(WindowRect {
                left: rect.left,
                top: rect.top,
                width: rect.right - rect.left,
                height: rect.bottom - rect.top,
            })
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl WindowBackend for SystemWindowBackend {
    fn find_window(&self, _titles: &[&str]) -> Option<WindowHandle> {
        None
    }

    fn activate(&self, _window: WindowHandle) -> anyhow::Result<()> {
        Ok(())
    }

    fn resize(&self, _window: WindowHandle, _width: i32, _height: i32) -> anyhow::Result<()> {
        Ok(())
    }

    fn move_to(&self, _window: WindowHandle, _left: i32, _top: i32) -> anyhow::Result<()> {
        Ok(())
    }

    fn rect(&self, _window: WindowHandle) -> anyhow::Result<WindowRect> {
        anyhow::bail!("window management is not available on this platform")
    }
}

/// Capture backend backed by the `screenshots` crate. Converted through raw
/// bytes so the captured buffer lands in this crate's `image` types.
#[derive(Debug, Default)]
pub struct ScreenCapture;

impl CaptureBackend for ScreenCapture {
    fn capture_area(
        &self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    ) -> anyhow::Result<RgbaImage> {
        let screen = screenshots::Screen::from_point(left, top)?;
        let shot = screen.capture_area(
            left - screen.display_info.x,
            top - screen.display_info.y,
            width as u32,
            height as u32,
        )?;
        let (w, h) = shot.dimensions();
        RgbaImage::from_raw(w, h, shot.into_raw())
            .ok_or_else(|| anyhow::anyhow!("capture produced an invalid buffer"))
    }
}

/// Recording window backend for tests: one titled window whose rectangle is
/// mutated by the positioning calls.
#[derive(Debug)]
pub struct MockWindowBackend {
    title: String,
    rect: std::sync::Mutex<WindowRect>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl MockWindowBackend {
    pub fn new(title: &str, rect: WindowRect) -> Self {
        Self {
            title: title.to_string(),
            rect: std::sync::Mutex::new(rect),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }
}

impl WindowBackend for MockWindowBackend {
    fn find_window(&self, titles: &[&str]) -> Option<WindowHandle> {
        titles
            .iter()
            .any(|t| self.title.contains(t))
            .then_some(WindowHandle(1))
    }

    fn activate(&self, _window: WindowHandle) -> anyhow::Result<()> {
        self.log("activate");
        Ok(())
    }

    fn resize(&self, _window: WindowHandle, width: i32, height: i32) -> anyhow::Result<()> {
        self.log(format!("resize {width}x{height}"));
        if let Ok(mut rect) = self.rect.lock() {
            rect.width = width;
            rect.height = height;
        }
        Ok(())
    }

    fn move_to(&self, _window: WindowHandle, left: i32, top: i32) -> anyhow::Result<()> {
        self.log(format!("move {left},{top}"));
        if let Ok(mut rect) = self.rect.lock() {
            rect.left = left;
            rect.top = top;
        }
        Ok(())
    }

    fn rect(&self, _window: WindowHandle) -> anyhow::Result<WindowRect> {
        Ok(*self.rect.lock().map_err(|_| anyhow::anyhow!("poisoned"))?)
    }
}

/// Capture backend for tests returning a fixed image regardless of the
/// requested region (or failing when none is configured).
#[derive(Debug, Default)]
pub struct MockCaptureBackend {
    image: Option<RgbaImage>,
}

impl MockCaptureBackend {
    pub fn with_image(image: RgbaImage) -> Self {
        Self { image: Some(image) }
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn capture_area(
        &self,
        _left: i32,
        _top: i32,
        _width: i32,
        _height: i32,
    ) -> anyhow::Result<RgbaImage> {
        match &self.image {
            Some(image) => Ok(image.clone()),
            None => anyhow::bail!("no capture image configured"),
        }
    }
}
