//! Recording session lifecycle
//!
//! A session pairs the live input stream with the buffer it fills. The stop
//! signal is shared between the duration timer, the manual stop reader, and
//! the stream error callback; whichever fires first wins and the rest are
//! no-ops.

use super::Clip;
use anyhow::{Result, anyhow};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Shared stop flag with first-caller-wins semantics
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the session stop. Returns true for the caller that actually
    /// performed the stop; any later call is a no-op returning false.
    pub fn request_stop(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// An active recording: the cpal stream and the sample buffer it appends to.
/// Exactly one exists per cycle; `finish` consumes it, so the stream is
/// released exactly once no matter which trigger stopped the recording.
pub struct RecordingSession {
    stream: cpal::Stream,
    buffer: Arc<Mutex<Vec<i16>>>,
    stop: StopSignal,
    sample_rate: u32,
    started_at: Instant,
}

impl RecordingSession {
    pub(crate) fn new(
        stream: cpal::Stream,
        buffer: Arc<Mutex<Vec<i16>>>,
        stop: StopSignal,
        sample_rate: u32,
    ) -> Self {
        Self {
            stream,
            buffer,
            stop,
            sample_rate,
            started_at: Instant::now(),
        }
    }

    /// Tear down the session and produce the recorded clip.
    ///
    /// Sets the stop flag (harmless if already set), drops the stream to
    /// release the capture device, and takes ownership of the buffer.
    pub fn finish(self) -> Result<Clip> {
        self.stop.request_stop();
        let duration = self.started_at.elapsed();
        drop(self.stream);

        let samples = match Arc::try_unwrap(self.buffer) {
            Ok(mutex) => mutex
                .into_inner()
                .map_err(|_| anyhow!("Audio buffer lock poisoned"))?,
            // The callback may still hold its clone for a moment after the
            // stream is dropped on some backends
            Err(shared) => shared
                .lock()
                .map_err(|_| anyhow!("Audio buffer lock poisoned"))?
                .clone(),
        };

        if samples.is_empty() {
            return Err(anyhow!("No audio captured, check your microphone"));
        }

        Ok(Clip::new(samples, self.sample_rate, duration))
    }
}
