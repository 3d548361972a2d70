use stroke_pilot::brush::{
    default_slider_layout, load_slider_map, save_slider_map, BrushSelector,
};
use stroke_pilot::input::{PointerEvent, RecordingPointer};
use stroke_pilot::locator::CalibrationRecord;

fn record() -> CalibrationRecord {
    CalibrationRecord {
        left: 100,
        top: 200,
        width: 400,
        height: 300,
    }
}

#[test]
fn default_layout_spreads_sizes_above_the_canvas() {
    let map = default_slider_layout(&record());
    assert!(map.is_valid());

    // Slider region centered above the canvas: starts at left + width/2 - 100.
    assert_eq!(map.position(1), Some((200, 150)));
    assert_eq!(map.position(10), Some((400, 150)));

    // Evenly spaced, monotonically increasing x at constant y.
    let mut previous_x = i32::MIN;
    for size in 1..=10 {
        let (x, y) = map.position(size).unwrap();
        assert_eq!(y, 150);
        assert!(x > previous_x);
        previous_x = x;
    }
}

#[test]
fn slider_map_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brush_slider_positions.json");
    let map = default_slider_layout(&record());

    save_slider_map(&file, &map).unwrap();
    let loaded = load_slider_map(&file).unwrap();
    assert_eq!(loaded, map);
}

#[test]
fn absent_slider_map_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_slider_map(&dir.path().join("nope.json")).unwrap_err();
    assert!(err.is_missing());
}

#[test]
fn malformed_slider_json_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brush_slider_positions.json");
    std::fs::write(&file, "{ not json").unwrap();

    let err = load_slider_map(&file).unwrap_err();
    assert!(!err.is_missing());
}

#[test]
fn slider_map_with_key_gap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brush_slider_positions.json");
    // Size 7 missing from an otherwise well-formed document.
    std::fs::write(
        &file,
        r#"{"1":[0,0],"2":[10,0],"3":[20,0],"4":[30,0],"5":[40,0],
           "6":[50,0],"8":[70,0],"9":[80,0],"10":[90,0]}"#,
    )
    .unwrap();

    let err = load_slider_map(&file).unwrap_err();
    assert!(!err.is_missing());
}

#[test]
fn switch_brush_clicks_the_slider_stop() {
    let selector = BrushSelector::new(default_slider_layout(&record()));
    let pointer = RecordingPointer::default();

    assert!(selector.switch_brush_to_size(3, &pointer));

    let (x, y) = selector.map().position(3).unwrap();
    assert_eq!(
        pointer.events(),
        vec![
            PointerEvent::MoveTo(x, y),
            PointerEvent::Press,
            PointerEvent::Release,
        ]
    );
}

#[test]
fn switch_brush_refuses_unknown_sizes() {
    let selector = BrushSelector::new(default_slider_layout(&record()));
    let pointer = RecordingPointer::default();

    assert!(!selector.switch_brush_to_size(0, &pointer));
    assert!(!selector.switch_brush_to_size(11, &pointer));
    assert!(pointer.events().is_empty());
}

#[test]
fn load_or_default_degrades_to_the_layout_guess() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brush_slider_positions.json");
    std::fs::write(&file, "garbage").unwrap();

    let selector = BrushSelector::load_or_default(&file, &record());
    assert_eq!(selector.map(), &default_slider_layout(&record()));
}
