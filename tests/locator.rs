use image::{Rgba, RgbaImage};
use stroke_pilot::coordinates::read_calibration;
use stroke_pilot::locator::{
    estimate_canvas, largest_gray_region, CalibrationRecord, CanvasLocator, MockCaptureBackend,
    MockWindowBackend, PersistTargets, SettleDelays, WindowRect, CANONICAL_POSITION,
    CANONICAL_SIZE,
};

fn targets(dir: &tempfile::TempDir) -> PersistTargets {
    PersistTargets {
        calibration_file: dir.path().join("canvas_coordinates.txt"),
        screenshot_file: dir.path().join("canvas_area.png"),
    }
}

#[test]
fn missing_window_is_a_terminal_error() {
    let dir = tempfile::tempdir().unwrap();
    let window = MockWindowBackend::new(
        "Some Other App",
        WindowRect {
            left: 0,
            top: 0,
            width: 800,
            height: 600,
        },
    );
    let locator = CanvasLocator::new(window, MockCaptureBackend::default(), targets(&dir))
        .with_settle_delays(SettleDelays::immediate());

    assert!(locator.calibrate().is_err());
}

#[test]
fn capture_failure_falls_back_to_the_geometric_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let window = MockWindowBackend::new(
        "喜茶GO - 定制",
        WindowRect {
            left: 10,
            top: 20,
            width: 800,
            height: 600,
        },
    );
    // No capture image configured, so segmentation cannot run.
    let locator = CanvasLocator::new(window, MockCaptureBackend::default(), targets(&dir))
        .with_settle_delays(SettleDelays::immediate());

    let outcome = locator.calibrate().unwrap();

    // The window was normalised to the canonical geometry first, so the
    // fallback fractions apply to 450x1089 at (1371, 0).
    assert_eq!(
        outcome.record,
        CalibrationRecord {
            left: 1371 + 45,
            top: 217,
            width: 360,
            height: 653,
        }
    );

    // The screenshot also needs the capture backend, so persistence fails,
    // but the record itself is still usable.
    assert!(outcome.persist_error.is_some());

    // The calibration text file was written before the screenshot attempt.
    let read_back = read_calibration(&targets(&dir).calibration_file).unwrap();
    assert_eq!(read_back, outcome.record);
}

#[test]
fn segmentation_locates_the_gray_canvas_region() {
    let dir = tempfile::tempdir().unwrap();
    let (width, height) = CANONICAL_SIZE;
    let (left, top) = CANONICAL_POSITION;

    // Window-sized capture: dark chrome with a canvas-gray rectangle where
    // the geometric estimate would also put it.
    let mut shot = RgbaImage::from_pixel(
        width as u32,
        height as u32,
        Rgba([40, 40, 40, 255]),
    );
    for y in 217..217 + 653 {
        for x in 45..45 + 360 {
            shot.put_pixel(x, y, Rgba([238, 238, 238, 255]));
        }
    }

    let window = MockWindowBackend::new(
        "定制喜贴",
        WindowRect {
            left: 300,
            top: 150,
            width: 900,
            height: 700,
        },
    );
    let locator = CanvasLocator::new(window, MockCaptureBackend::with_image(shot), targets(&dir))
        .with_settle_delays(SettleDelays::immediate());

    let outcome = locator.calibrate().unwrap();
    let record = outcome.record;

    assert_eq!(record.left, left + 45);
    assert_eq!(record.top, top + 217);
    assert!((358..=362).contains(&record.width), "width {}", record.width);
    assert!(
        (651..=655).contains(&record.height),
        "height {}",
        record.height
    );

    assert!(outcome.persist_error.is_none());
    assert!(targets(&dir).calibration_file.exists());
    assert!(targets(&dir).screenshot_file.exists());
}

#[test]
fn positioning_normalises_the_window_before_segmenting() {
    let dir = tempfile::tempdir().unwrap();
    let window = MockWindowBackend::new(
        "喜茶GO",
        WindowRect {
            left: 5,
            top: 5,
            width: 200,
            height: 200,
        },
    );
    let locator = CanvasLocator::new(window, MockCaptureBackend::default(), targets(&dir))
        .with_settle_delays(SettleDelays::immediate());

    let outcome = locator.calibrate().unwrap();
    // Fallback estimate over the canonical rectangle proves resize and move
    // both landed before the rect was read.
    assert_eq!(outcome.record.left, 1371 + 45);
    assert_eq!(outcome.record.top, 217);
}

#[test]
fn estimate_uses_fixed_window_fractions() {
    let rect = WindowRect {
        left: 10,
        top: 20,
        width: 450,
        height: 1089,
    };
    assert_eq!(
        estimate_canvas(&rect),
        CalibrationRecord {
            left: 55,
            top: 237,
            width: 360,
            height: 653,
        }
    );
}

#[test]
fn largest_gray_region_picks_the_bigger_of_two() {
    let mut image = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
    // Small gray patch.
    for y in 10..30 {
        for x in 10..30 {
            image.put_pixel(x, y, Rgba([230, 230, 230, 255]));
        }
    }
    // Larger gray patch.
    for y in 80..180 {
        for x in 60..160 {
            image.put_pixel(x, y, Rgba([238, 238, 238, 255]));
        }
    }

    let (x, y, w, h) = largest_gray_region(&image).unwrap();
    assert_eq!((x, y), (60, 80));
    assert_eq!((w, h), (100, 100));
}

#[test]
fn no_gray_pixels_means_no_region() {
    let image = RgbaImage::from_pixel(50, 50, Rgba([10, 10, 10, 255]));
    assert!(largest_gray_region(&image).is_none());
}
