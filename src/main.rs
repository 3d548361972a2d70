use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use stroke_pilot::brush::BrushSelector;
use stroke_pilot::config;
use stroke_pilot::coordinates;
use stroke_pilot::error::DrawError;
use stroke_pilot::executor::{DrawExecutionController, ExecutionSignal, Outcome};
use stroke_pilot::input::{SignalListener, SystemPointer};
use stroke_pilot::locator::{
    CalibrationRecord, CanvasLocator, PersistTargets, ScreenCapture, SystemWindowBackend,
};
use stroke_pilot::path_prep::{
    extend_short_path, filter_short_paths, DEFAULT_MIN_POINTS, EXTEND_TARGET_LENGTH,
    EXTEND_THRESHOLD,
};
use stroke_pilot::vectorizer::{vectorize_file, TraceMode};
use stroke_pilot::{logging, path_prep};

struct Args {
    image: PathBuf,
    mode: TraceMode,
    scale: f64,
    use_cached_calibration: bool,
    debug: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut image = None;
    let mut mode = TraceMode::default();
    let mut scale = 1.0;
    let mut use_cached_calibration = false;
    let mut debug = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = args.next().ok_or("--mode needs a value")?;
                mode = value.parse()?;
            }
            "--scale" => {
                let value = args.next().ok_or("--scale needs a value")?;
                scale = value
                    .parse()
                    .map_err(|_| format!("invalid scale '{value}'"))?;
            }
            "--cached" => use_cached_calibration = true,
            "--debug" => debug = true,
            other if image.is_none() && !other.starts_with('-') => {
                image = Some(PathBuf::from(other));
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    Ok(Args {
        image: image.ok_or_else(|| {
            "usage: stroke_pilot <image> [--mode contour|strict|skeleton] [--scale F] [--cached] [--debug]"
                .to_string()
        })?,
        mode,
        scale,
        use_cached_calibration,
        debug,
    })
}

fn calibrate(use_cached: bool) -> Result<CalibrationRecord, DrawError> {
    if use_cached {
        match coordinates::read_calibration(&config::calibration_file()) {
            Ok(record) => {
                info!(?record, "using cached calibration");
                return Ok(record);
            }
            Err(e) => warn!(error = %e, "cached calibration unusable; calibrating live"),
        }
    }

    let locator = CanvasLocator::new(
        SystemWindowBackend,
        ScreenCapture,
        PersistTargets {
            calibration_file: config::calibration_file(),
            screenshot_file: config::canvas_screenshot_file(),
        },
    );
    let outcome = locator.calibrate()?;
    if let Some(e) = outcome.persist_error {
        // The in-memory record is still good for this run.
        error!(error = %e, "calibration could not be persisted");
    }
    Ok(outcome.record)
}

fn run() -> anyhow::Result<Outcome> {
    let args = parse_args().map_err(|e| anyhow::anyhow!(e))?;
    logging::init(args.debug);
    config::ensure_dirs()?;

    let record = calibrate(args.use_cached_calibration)?;

    let paths = vectorize_file(&args.image, args.mode)?;
    let paths = filter_short_paths(paths, DEFAULT_MIN_POINTS);
    let paths: Vec<path_prep::StrokePath> = paths
        .into_iter()
        .map(|p| extend_short_path(p, EXTEND_THRESHOLD, EXTEND_TARGET_LENGTH))
        .collect();
    info!(paths = paths.len(), "paths ready");

    let brush = BrushSelector::load_or_default(&config::slider_map_file(), &record);

    let pointer = Arc::new(SystemPointer);
    let signal = ExecutionSignal::new();
    let _listener = SignalListener::spawn(signal.clone(), pointer.clone());

    let controller = DrawExecutionController::new(pointer.as_ref(), signal);
    controller.execute(&record, &paths, args.scale, Some(&brush))
}

fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Cancelled) => {
            info!("stopped by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
