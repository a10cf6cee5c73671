//! Terminal bell audio output

use std::io::Write;
use std::time::Duration;
use vigil_core::{AudioOutput, MonitorError};

/// Rings the terminal bell on stderr. Pitch and length are not controllable,
/// so they are only logged.
pub struct TerminalBell {
    enabled: bool,
}

impl TerminalBell {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl AudioOutput for TerminalBell {
    fn is_ready(&self) -> bool {
        self.enabled
    }

    fn beep(&self, frequency_hz: f32, duration: Duration) -> Result<(), MonitorError> {
        log::debug!("Bell requested: {frequency_hz} Hz for {duration:?}");
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| MonitorError::AudioUnavailable(e.to_string()))
    }
}
