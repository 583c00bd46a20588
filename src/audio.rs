//! Audio capture and clip encoding
//!
//! Provides microphone recording via CPAL and WAV encoding of the recorded
//! clip via hound. The capture format is fixed: single channel, 16-bit
//! signed PCM, 44.1kHz by default.

mod recorder;
mod session;

pub use recorder::{AudioDeviceInfo, AudioRecorder};
pub use session::{RecordingSession, StopSignal};

use anyhow::{Result, anyhow};
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// Default capture rate expected by the recognition endpoint
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// A recorded audio clip: mono 16-bit PCM samples plus the rate they were
/// captured at. Produced by [`RecordingSession::finish`] and consumed by the
/// upload step.
pub struct Clip {
    samples: Vec<i16>,
    sample_rate: u32,
    duration: Duration,
}

impl Clip {
    pub(crate) fn new(samples: Vec<i16>, sample_rate: u32, duration: Duration) -> Self {
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Actual recording duration (timer or manual stop, whichever came first)
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Encode the clip as an in-memory WAV file for upload
    pub fn wav_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buffer, self.spec())?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(buffer.into_inner())
    }

    /// Write the clip to a WAV file (used by --keep)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = WavWriter::create(path, self.spec())?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Quick RIFF/WAVE container check for files submitted with `identify`
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Read a WAV file from disk, rejecting anything without a RIFF header
pub fn read_wav_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    if !is_wav(&bytes) {
        return Err(anyhow!("{} is not a WAV file", path.display()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_wav_bytes_header() {
        let samples = vec![0i16, 1000, -1000, i16::MAX];
        let clip = Clip::new(samples.clone(), 44_100, Duration::from_secs(5));
        let bytes = clip.wav_bytes().unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // Standard 44-byte header followed by 16-bit samples
        assert_eq!(bytes.len(), 44 + samples.len() * 2);
        assert_eq!(u16_at(&bytes, 22), 1, "channels");
        assert_eq!(u32_at(&bytes, 24), 44_100, "sample rate");
        assert_eq!(u16_at(&bytes, 34), 16, "bits per sample");
    }

    #[test]
    fn test_wav_bytes_non_default_rate() {
        let clip = Clip::new(vec![0i16; 48], 48_000, Duration::from_secs(1));
        let bytes = clip.wav_bytes().unwrap();
        assert_eq!(u32_at(&bytes, 24), 48_000);
    }

    #[test]
    fn test_is_wav() {
        let clip = Clip::new(vec![0i16; 4], 44_100, Duration::from_secs(1));
        assert!(is_wav(&clip.wav_bytes().unwrap()));
        assert!(!is_wav(b"RIFFxxxx\x00\x00\x00\x00"));
        assert!(!is_wav(b"not audio"));
        assert!(!is_wav(b""));
    }
}
