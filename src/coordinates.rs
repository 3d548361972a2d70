//! Text formats shared with the calibration step: the three-line calibration
//! file and the free-form captured-coordinates file. Parsing reports
//! missing-vs-malformed explicitly so callers can decide which of the two is
//! ignorable.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigFileError, DrawError};
use crate::locator::CalibrationRecord;

/// Pull an `(x, y)` integer pair out of the first parenthesized group in a
/// line. Returns `None` when there is no well-formed pair.
pub fn parse_point_pair(line: &str) -> Option<(i32, i32)> {
    let start = line.find('(')?;
    let end = line[start..].find(')')? + start;
    let inner = &line[start + 1..end];
    let (x_str, y_str) = inner.split_once(',')?;
    let x = x_str.trim().parse().ok()?;
    let y = y_str.trim().parse().ok()?;
    Some((x, y))
}

/// Write the calibration record in its fixed human-readable layout:
/// top-left pair, labelled `W x H` size, derived bottom-right pair
/// (redundant, kept for eyeballing the file).
pub fn write_calibration(path: &Path, record: &CalibrationRecord) -> Result<(), DrawError> {
    let contents = format!(
        "Canvas top-left: ({}, {})\nCanvas size: {} x {}\nCanvas bottom-right: ({}, {})\n",
        record.left,
        record.top,
        record.width,
        record.height,
        record.left + record.width,
        record.top + record.height,
    );
    std::fs::write(path, contents).map_err(|e| DrawError::Persistence {
        what: "calibration file",
        cause: e.into(),
    })
}

/// Read a previously written calibration file.
///
/// A nonexistent file is [`ConfigFileError::Missing`]; fewer than two lines
/// or unparsable tokens are [`ConfigFileError::Malformed`]. The redundant
/// third line is ignored.
pub fn read_calibration(path: &Path) -> Result<CalibrationRecord, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigFileError::Missing
        } else {
            ConfigFileError::Malformed(e.to_string())
        }
    })?;
    let mut lines = contents.lines();

    let first = lines
        .next()
        .ok_or_else(|| ConfigFileError::Malformed("empty file".into()))?;
    let (left, top) = parse_point_pair(first)
        .ok_or_else(|| ConfigFileError::Malformed(format!("bad top-left line: {first:?}")))?;

    let second = lines
        .next()
        .ok_or_else(|| ConfigFileError::Malformed("missing size line".into()))?;
    let (width, height) = parse_size_line(second)
        .ok_or_else(|| ConfigFileError::Malformed(format!("bad size line: {second:?}")))?;

    if width <= 0 || height <= 0 {
        return Err(ConfigFileError::Malformed(format!(
            "non-positive canvas size {width} x {height}"
        )));
    }

    Ok(CalibrationRecord {
        left,
        top,
        width,
        height,
    })
}

/// Parse the `W x H` token after the label colon.
fn parse_size_line(line: &str) -> Option<(i32, i32)> {
    let (_, rest) = line.split_once(':')?;
    let (w_str, h_str) = rest.split_once('x')?;
    let width = w_str.trim().parse().ok()?;
    let height = h_str.trim().parse().ok()?;
    Some((width, height))
}

/// Load captured coordinate points, one parenthesized pair per line.
/// Lines that fail to parse are skipped; the skip count is logged so a
/// half-corrupt file is at least visible.
pub fn read_captured_points(path: &Path) -> Result<Vec<(i32, i32)>, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigFileError::Missing
        } else {
            ConfigFileError::Malformed(e.to_string())
        }
    })?;

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_point_pair(line) {
            Some(point) => points.push(point),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "ignored unparsable captured-coordinate lines");
    }
    Ok(points)
}
