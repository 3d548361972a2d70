use stroke_pilot::coordinates::{
    parse_point_pair, read_calibration, read_captured_points, write_calibration,
};
use stroke_pilot::error::{ConfigFileError, DrawError};
use stroke_pilot::locator::CalibrationRecord;

#[test]
fn calibration_round_trips_through_the_text_format() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("canvas_coordinates.txt");
    let record = CalibrationRecord {
        left: 100,
        top: 50,
        width: 300,
        height: 400,
    };

    write_calibration(&file, &record).unwrap();
    let read_back = read_calibration(&file).unwrap();
    assert_eq!(read_back, record);

    let contents = std::fs::read_to_string(&file).unwrap();
    assert!(contents.contains("(100, 50)"));
    assert!(contents.contains("300 x 400"));
    assert!(contents.contains("(400, 450)"));
}

#[test]
fn absent_calibration_file_is_reported_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_calibration(&dir.path().join("nope.txt")).unwrap_err();
    assert!(err.is_missing());
}

#[test]
fn truncated_calibration_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("canvas_coordinates.txt");
    std::fs::write(&file, "Canvas top-left: (10, 20)\n").unwrap();

    let err = read_calibration(&file).unwrap_err();
    assert!(!err.is_missing());
}

#[test]
fn garbage_calibration_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("canvas_coordinates.txt");
    std::fs::write(&file, "not a calibration\nfile at all\n").unwrap();

    let err = read_calibration(&file).unwrap_err();
    assert!(!err.is_missing());
}

#[test]
fn non_positive_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("canvas_coordinates.txt");
    std::fs::write(
        &file,
        "Canvas top-left: (10, 20)\nCanvas size: 0 x 400\nCanvas bottom-right: (10, 420)\n",
    )
    .unwrap();

    let err = read_calibration(&file).unwrap_err();
    assert!(!err.is_missing());
}

#[test]
fn point_pair_parses_first_parenthesized_group() {
    assert_eq!(parse_point_pair("Clicked at: (12, -7)"), Some((12, -7)));
    assert_eq!(parse_point_pair("( 3 ,4 )"), Some((3, 4)));
    assert_eq!(parse_point_pair("no pair here"), None);
    assert_eq!(parse_point_pair("(1; 2)"), None);
    assert_eq!(parse_point_pair("(x, y)"), None);
}

#[test]
fn captured_points_skip_unparsable_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("captured.txt");
    std::fs::write(
        &file,
        "Point 1: (10, 20)\n\ngarbage line\nPoint 2: (30, 40)\n(oops)\n",
    )
    .unwrap();

    let points = read_captured_points(&file).unwrap();
    assert_eq!(points, vec![(10, 20), (30, 40)]);
}

#[test]
fn config_errors_promote_to_draw_errors() {
    let err: DrawError = ConfigFileError::Malformed("bad size line".into()).into();
    assert!(err.to_string().contains("bad size line"));

    let missing: DrawError = ConfigFileError::Missing.into();
    assert!(matches!(missing, DrawError::ConfigParse(_)));
}

#[test]
fn absent_captured_points_file_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_captured_points(&dir.path().join("captured.txt")).unwrap_err();
    assert!(err.is_missing());
}
