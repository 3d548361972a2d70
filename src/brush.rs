//! Brush-size handling: a persisted map from discrete brush sizes to the
//! screen coordinates of their slider stops, and the click that switches the
//! active brush. A stale map is a known calibration-drift risk — a wrong
//! click selects the wrong size but never fails the run.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigFileError, DrawError};
use crate::input::PointerBackend;
use crate::locator::CalibrationRecord;
use crate::path_prep::BRUSH_SIZE_COUNT;

/// Pixel width of the slider region the default layout spreads sizes over.
const SLIDER_SPAN: i32 = 200;
/// Vertical offset of the slider above the canvas top edge.
const SLIDER_RAISE: i32 = 50;
/// Pause after a slider click so the application can react.
const SWITCH_SETTLE: Duration = Duration::from_millis(100);

/// Mapping from brush-size index (1..=10) to the screen coordinate of its
/// slider stop. Persisted as a keyed JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrushSliderMap {
    positions: BTreeMap<u8, (i32, i32)>,
}

impl BrushSliderMap {
    pub fn position(&self, size: u8) -> Option<(i32, i32)> {
        self.positions.get(&size).copied()
    }

    /// The map is only usable when its keys are exactly the configured size
    /// domain 1..=10.
    pub fn is_valid(&self) -> bool {
        self.positions.len() == usize::from(BRUSH_SIZE_COUNT)
            && (1..=BRUSH_SIZE_COUNT).all(|size| self.positions.contains_key(&size))
    }
}

/// Linear layout guess: sizes 1..=10 spread evenly across a slider region
/// centered above the calibrated canvas.
pub fn default_slider_layout(record: &CalibrationRecord) -> BrushSliderMap {
    let start_x = record.left + record.width / 2 - SLIDER_SPAN / 2;
    let y = record.top - SLIDER_RAISE;
    let steps = i32::from(BRUSH_SIZE_COUNT) - 1;

    let positions = (1..=BRUSH_SIZE_COUNT)
        .map(|size| {
            let step = i32::from(size) - 1;
            (size, (start_x + step * SLIDER_SPAN / steps, y))
        })
        .collect();
    BrushSliderMap { positions }
}

/// Load a persisted slider map. Missing and malformed files are reported
/// distinctly; an invalid key domain counts as malformed.
pub fn load_slider_map(path: &Path) -> Result<BrushSliderMap, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigFileError::Missing
        } else {
            ConfigFileError::Malformed(e.to_string())
        }
    })?;
    let map: BrushSliderMap =
        serde_json::from_str(&contents).map_err(|e| ConfigFileError::Malformed(e.to_string()))?;
    if !map.is_valid() {
        return Err(ConfigFileError::Malformed(
            "slider map keys do not cover the size domain 1..=10".into(),
        ));
    }
    Ok(map)
}

pub fn save_slider_map(path: &Path, map: &BrushSliderMap) -> Result<(), DrawError> {
    let json = serde_json::to_string_pretty(map).map_err(|e| DrawError::Persistence {
        what: "brush slider map",
        cause: e.into(),
    })?;
    std::fs::write(path, json).map_err(|e| DrawError::Persistence {
        what: "brush slider map",
        cause: e.into(),
    })
}

/// Owns the active slider map and drives brush switches.
#[derive(Debug, Clone)]
pub struct BrushSelector {
    map: BrushSliderMap,
}

impl BrushSelector {
    pub fn new(map: BrushSliderMap) -> Self {
        Self { map }
    }

    /// Load the cached map, falling back to the default layout when the
    /// cache is absent or unusable. Corrupt caches are logged; both cases
    /// degrade to the layout guess rather than failing the run.
    pub fn load_or_default(path: &Path, record: &CalibrationRecord) -> Self {
        match load_slider_map(path) {
            Ok(map) => Self { map },
            Err(e) => {
                if e.is_missing() {
                    debug!("no cached slider map; using default layout");
                } else {
                    warn!(error = %e, "cached slider map unusable; using default layout");
                }
                Self {
                    map: default_slider_layout(record),
                }
            }
        }
    }

    pub fn map(&self) -> &BrushSliderMap {
        &self.map
    }

    /// Click the slider stop for `size` and give the UI a moment to react.
    /// Unknown sizes return `false` with no side effects.
    pub fn switch_brush_to_size(&self, size: u8, pointer: &dyn PointerBackend) -> bool {
        let Some((x, y)) = self.map.position(size) else {
            return false;
        };
        if let Err(e) = pointer.click(x, y) {
            warn!(error = %e, size, "brush switch click failed");
            return false;
        }
        std::thread::sleep(SWITCH_SETTLE);
        true
    }
}
