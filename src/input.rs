//! Simulated pointer and keyboard plumbing.
//!
//! The execution controller and the brush selector only ever talk to a
//! [`PointerBackend`]; the real implementation injects Win32 input events,
//! and [`RecordingPointer`] stands in for it under test. The keyboard side
//! is a detached `rdev` listener that turns the abort/pause keys into
//! [`ExecutionSignal`] transitions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::warn;

use crate::executor::{ExecutionSignal, SignalState};

/// Simulated pointer device: absolute moves plus left-button state.
pub trait PointerBackend: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()>;
    fn press(&self) -> anyhow::Result<()>;
    fn release(&self) -> anyhow::Result<()>;

    fn click(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.move_to(x, y)?;
        self.press()?;
        self.release()
    }
}

/// Pointer backend driving the real cursor.
#[derive(Debug, Default)]
pub struct SystemPointer;

#[cfg(target_os = "windows")]
impl PointerBackend for SystemPointer {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;
        unsafe { SetCursorPos(x, y) }?;
        Ok(())
    }

    fn press(&self) -> anyhow::Result<()> {
        send_button_event(true)
    }

    fn release(&self) -> anyhow::Result<()> {
        send_button_event(false)
    }
}

#[cfg(target_os = "windows")]
fn send_button_event(down: bool) -> anyhow::Result<()> {
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEINPUT,
    };

    let flags = if down {
        MOUSEEVENTF_LEFTDOWN
    } else {
        MOUSEEVENTF_LEFTUP
    };
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dwFlags: flags,
                ..Default::default()
            },
        },
    };
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        anyhow::bail!("SendInput returned 0");
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
impl PointerBackend for SystemPointer {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        tracing::debug!(x, y, "pointer move (no input backend on this platform)");
        Ok(())
    }

    fn press(&self) -> anyhow::Result<()> {
        tracing::debug!("pointer press (no input backend on this platform)");
        Ok(())
    }

    fn release(&self) -> anyhow::Result<()> {
        tracing::debug!("pointer release (no input backend on this platform)");
        Ok(())
    }
}

/// One observed pointer action, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    MoveTo(i32, i32),
    Press,
    Release,
}

/// Recording mock used by the tests: stores every pointer action and never
/// touches the real cursor.
#[derive(Debug, Default)]
pub struct RecordingPointer {
    events: Mutex<Vec<PointerEvent>>,
    release_count: AtomicUsize,
}

impl RecordingPointer {
    pub fn events(&self) -> Vec<PointerEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn release_count(&self) -> usize {
        self.release_count.load(Ordering::SeqCst)
    }

    fn record(&self, event: PointerEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

impl PointerBackend for RecordingPointer {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.record(PointerEvent::MoveTo(x, y));
        Ok(())
    }

    fn press(&self) -> anyhow::Result<()> {
        self.record(PointerEvent::Press);
        Ok(())
    }

    fn release(&self) -> anyhow::Result<()> {
        self.release_count.fetch_add(1, Ordering::SeqCst);
        self.record(PointerEvent::Release);
        Ok(())
    }
}

/// Keys the listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    /// Stop the run entirely (Escape).
    Abort,
    /// Flip between Running and Paused (Space).
    TogglePause,
}

fn control_key_from(key: rdev::Key) -> Option<ControlKey> {
    match key {
        rdev::Key::Escape => Some(ControlKey::Abort),
        rdev::Key::Space => Some(ControlKey::TogglePause),
        _ => None,
    }
}

/// Apply one control key to the signal.
///
/// Abort cancels and immediately forces the button up, independent of where
/// the execution loop currently is. Entering Paused also forces the button
/// up so a held drag cannot keep painting. Pointer faults here are logged
/// and swallowed: a flaky input layer must not abort an in-flight drawing.
pub fn handle_control_key(key: ControlKey, signal: &ExecutionSignal, pointer: &dyn PointerBackend) {
    match key {
        ControlKey::Abort => {
            signal.cancel();
            if let Err(e) = pointer.release() {
                warn!(error = %e, "pointer release on abort failed");
            }
        }
        ControlKey::TogglePause => {
            if signal.toggle_pause() == SignalState::Paused {
                if let Err(e) = pointer.release() {
                    warn!(error = %e, "pointer release on pause failed");
                }
            }
        }
    }
}

/// Asynchronous key listener for one drawing execution.
///
/// `rdev::listen` has no teardown, so the thread is detached; once the
/// signal it owns is cancelled it stops reacting to further keys.
pub struct SignalListener {
    signal: ExecutionSignal,
}

impl SignalListener {
    pub fn spawn(signal: ExecutionSignal, pointer: Arc<dyn PointerBackend>) -> Self {
        let thread_signal = signal.clone();
        thread::spawn(move || {
            let result = rdev::listen(move |event| {
                if thread_signal.state() == SignalState::Cancelled {
                    return;
                }
                if let rdev::EventType::KeyPress(key) = event.event_type {
                    if let Some(control) = control_key_from(key) {
                        handle_control_key(control, &thread_signal, pointer.as_ref());
                    }
                }
            });
            if let Err(e) = result {
                warn!(error = ?e, "key listener unavailable; pause/cancel keys disabled");
            }
        });
        Self { signal }
    }

    /// The signal this listener writes to.
    pub fn signal(&self) -> &ExecutionSignal {
        &self.signal
    }
}
