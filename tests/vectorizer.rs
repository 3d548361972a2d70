use image::{DynamicImage, Rgb, RgbImage};
use stroke_pilot::vectorizer::{vectorize, TraceMode};

/// White 100x100 image with a 40x40 black square at (30, 30).
fn black_square_image() -> DynamicImage {
    let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
    for y in 30..70 {
        for x in 30..70 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

#[test]
fn contour_mode_traces_a_filled_square_as_one_path() {
    let paths = vectorize(&black_square_image(), TraceMode::Contour);
    assert_eq!(paths.len(), 1, "expected a single outer contour");

    let path = &paths[0];
    // Simplification collapses the square boundary to near its corners;
    // the blur rounds each corner slightly, so allow a few extra vertices.
    assert!(
        (4..=20).contains(&path.len()),
        "square should simplify to near its corners, got {} points",
        path.len()
    );

    // A filled blob is round-ish, so the width estimate is the equivalent
    // circle diameter of the enclosed area, roughly the square's side.
    assert!(
        (38.0..=50.0).contains(&path.width),
        "unexpected width estimate {}",
        path.width
    );

    // All traced points stay inside the image.
    for p in &path.points {
        assert!((0.0..100.0).contains(&p.x));
        assert!((0.0..100.0).contains(&p.y));
    }
}

#[test]
fn blank_image_produces_no_paths() {
    let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([255, 255, 255])));
    for mode in [TraceMode::Contour, TraceMode::StrictStroke, TraceMode::Skeleton] {
        let paths = vectorize(&blank, mode);
        assert!(paths.is_empty(), "{mode:?} found paths in a blank image");
    }
}

#[test]
fn tiny_specks_are_discarded() {
    // A single dark pixel is below the minimum stroke area.
    let mut img = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
    img.put_pixel(32, 32, Rgb([0, 0, 0]));

    let paths = vectorize(&DynamicImage::ImageRgb8(img), TraceMode::Contour);
    assert!(paths.is_empty());
}

#[test]
fn trace_mode_parses_its_cli_names() {
    assert_eq!("contour".parse::<TraceMode>().unwrap(), TraceMode::Contour);
    assert_eq!(
        "strict".parse::<TraceMode>().unwrap(),
        TraceMode::StrictStroke
    );
    assert_eq!(
        "strict-stroke".parse::<TraceMode>().unwrap(),
        TraceMode::StrictStroke
    );
    assert_eq!(
        "skeleton".parse::<TraceMode>().unwrap(),
        TraceMode::Skeleton
    );
    assert!("freehand".parse::<TraceMode>().is_err());
}
