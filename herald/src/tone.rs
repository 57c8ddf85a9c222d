// THEORY:
// The `tone` module produces the short attention beep that precedes each
// spoken announcement. The `ToneEmitter` trait keeps the announcer worker
// testable; `SineTone` is the production implementation on top of rodio.

use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};

use crate::error::{HeraldError, Result};

/// Contract for the per-detection tone.
pub trait ToneEmitter: Send {
    /// Plays the tone, blocking for its duration.
    fn beep(&mut self) -> Result<()>;
}

/// Configuration for `SineTone`.
#[derive(Debug, Clone)]
pub struct ToneConfig {
    /// Tone frequency in hertz.
    pub frequency_hz: f32,
    /// Tone length.
    pub duration: Duration,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000.0,
            duration: Duration::from_millis(200),
        }
    }
}

/// Sine-wave tone on the host's default output device.
///
/// rodio's `OutputStream` is `!Send`, so it is opened inside `beep` rather
/// than held across calls; the emitter itself stays movable onto the
/// announcer worker thread.
pub struct SineTone {
    config: ToneConfig,
}

impl SineTone {
    pub fn new(config: ToneConfig) -> Self {
        Self { config }
    }
}

impl ToneEmitter for SineTone {
    fn beep(&mut self) -> Result<()> {
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| HeraldError::AudioOutput(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| HeraldError::AudioOutput(e.to_string()))?;
        sink.append(SineWave::new(self.config.frequency_hz).take_duration(self.config.duration));
        sink.sleep_until_end();
        Ok(())
    }
}
