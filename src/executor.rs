//! Stroke replay: scale prepared paths into screen space and drive them as
//! press/move/release pointer gestures, polling the execution signal between
//! every discrete action.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::brush::BrushSelector;
use crate::input::PointerBackend;
use crate::locator::CalibrationRecord;
use crate::path_prep::{map_width_to_brush_size, StrokePath};

/// Tri-state drawing control, written by the key listener and polled by the
/// execution loop. Single writer, single reader; staleness of one poll
/// interval is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalState {
    Running = 0,
    Paused = 1,
    Cancelled = 2,
}

/// Cloneable pause/cancel token shared between the listener and the
/// execution loop. Created at the start of one drawing execution and
/// discarded with it.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSignal(Arc<AtomicU8>);

impl ExecutionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SignalState {
        match self.0.load(Ordering::SeqCst) {
            1 => SignalState::Paused,
            2 => SignalState::Cancelled,
            _ => SignalState::Running,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == SignalState::Cancelled
    }

    /// Cancellation is terminal; no later toggle can undo it.
    pub fn cancel(&self) {
        self.0.store(SignalState::Cancelled as u8, Ordering::SeqCst);
    }

    /// Flip Running <-> Paused and return the new state. A cancelled signal
    /// stays cancelled.
    pub fn toggle_pause(&self) -> SignalState {
        let _ = self
            .0
            .compare_exchange(
                SignalState::Running as u8,
                SignalState::Paused as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .or_else(|_| {
                self.0.compare_exchange(
                    SignalState::Paused as u8,
                    SignalState::Running as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
            });
        self.state()
    }
}

/// How a drawing execution ended. Cancellation is a normal termination,
/// distinct from failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Calibrated latencies between pointer actions. These model the receiving
/// application's input cadence; they are not correctness guarantees.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Settle after the initial move to canvas center.
    pub center_settle: Duration,
    /// Around button press and the final release.
    pub button_delay: Duration,
    /// Between intra-stroke moves.
    pub move_delay: Duration,
    /// Poll interval while paused.
    pub pause_poll: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            center_settle: Duration::from_millis(500),
            button_delay: Duration::from_millis(10),
            move_delay: Duration::from_millis(1),
            pause_poll: Duration::from_millis(100),
        }
    }
}

impl Pacing {
    /// No artificial delays; used by tests driving a recording pointer.
    pub fn immediate() -> Self {
        Self {
            center_settle: Duration::ZERO,
            button_delay: Duration::ZERO,
            move_delay: Duration::ZERO,
            pause_poll: Duration::from_millis(1),
        }
    }
}

/// Releases the button when dropped so no exit path, including an error
/// bubbling out mid-stroke, can leave the simulated device stuck pressed.
struct ReleaseGuard<'a> {
    pointer: &'a dyn PointerBackend,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        let _ = self.pointer.release();
    }
}

/// Replays prepared stroke paths inside a calibrated canvas rectangle.
pub struct DrawExecutionController<'a> {
    pointer: &'a dyn PointerBackend,
    signal: ExecutionSignal,
    pacing: Pacing,
}

impl<'a> DrawExecutionController<'a> {
    pub fn new(pointer: &'a dyn PointerBackend, signal: ExecutionSignal) -> Self {
        Self {
            pointer,
            signal,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Draw `paths` in order, mapping each local point to
    /// `origin + round(local * scale)`.
    ///
    /// The signal is checked before each path and before each intra-stroke
    /// move: Cancelled stops everything (the button is released before the
    /// next point would be processed), Paused blocks until Running or
    /// Cancelled. Resuming after a mid-stroke pause continues the same
    /// path's remaining points without pressing the button again; the
    /// listener released it on pause, so the stroke shows a gap. That
    /// matches the long-observed behavior of the tool and is kept on
    /// purpose.
    pub fn execute(
        &self,
        record: &CalibrationRecord,
        paths: &[StrokePath],
        scale: f64,
        brush: Option<&BrushSelector>,
    ) -> anyhow::Result<Outcome> {
        let _guard = ReleaseGuard {
            pointer: self.pointer,
        };

        self.pointer
            .move_to(record.left + record.width / 2, record.top + record.height / 2)?;
        std::thread::sleep(self.pacing.center_settle);

        let mut active_brush_size: Option<u8> = None;
        let mut cancelled = false;

        for (index, path) in paths.iter().enumerate() {
            if self.wait_until_runnable().is_none() {
                cancelled = true;
                break;
            }
            if path.is_empty() {
                continue;
            }

            if let Some(selector) = brush {
                let size = map_width_to_brush_size(path.width);
                if active_brush_size != Some(size) {
                    if selector.switch_brush_to_size(size, self.pointer) {
                        active_brush_size = Some(size);
                    }
                }
            }

            let scaled: Vec<(i32, i32)> = path
                .points
                .iter()
                .map(|p| {
                    (
                        record.left + (p.x * scale).round() as i32,
                        record.top + (p.y * scale).round() as i32,
                    )
                })
                .collect();

            debug!(path = index, points = scaled.len(), "drawing stroke");

            self.pointer.move_to(scaled[0].0, scaled[0].1)?;
            std::thread::sleep(self.pacing.button_delay);
            self.pointer.press()?;
            std::thread::sleep(self.pacing.button_delay);

            for &(x, y) in &scaled[1..] {
                if self.signal.is_cancelled() {
                    self.pointer.release()?;
                    cancelled = true;
                    break;
                }
                if self.wait_until_runnable().is_none() {
                    self.pointer.release()?;
                    cancelled = true;
                    break;
                }
                self.pointer.move_to(x, y)?;
                std::thread::sleep(self.pacing.move_delay);
            }
            if cancelled {
                break;
            }

            self.pointer.release()?;
            std::thread::sleep(self.pacing.button_delay);
        }

        if cancelled {
            info!("drawing cancelled");
            Ok(Outcome::Cancelled)
        } else {
            info!(paths = paths.len(), "drawing completed");
            Ok(Outcome::Completed)
        }
    }

    /// Block while paused, polling the signal. Returns `Some(())` once
    /// Running, `None` on cancellation. There is deliberately no timeout:
    /// cancelling is the only way out of a pause.
    fn wait_until_runnable(&self) -> Option<()> {
        loop {
            match self.signal.state() {
                SignalState::Running => return Some(()),
                SignalState::Cancelled => return None,
                SignalState::Paused => std::thread::sleep(self.pacing.pause_poll),
            }
        }
    }
}
