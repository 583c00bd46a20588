//! Microphone capture via CPAL
//!
//! Supports device enumeration and starting a capture session on the default
//! input device. Multi-channel devices are downmixed to mono so the clip
//! always matches the upload format.

use super::session::{RecordingSession, StopSignal};
use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex};

/// Audio recording device with its chosen stream configuration
pub struct AudioRecorder {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
}

/// Information about an available audio input device
#[derive(Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub supported_sample_rates: Vec<u32>,
    pub supported_formats: Vec<SampleFormat>,
}

impl AudioRecorder {
    /// Create a recorder on the default input device, targeting the given
    /// sample rate (44.1kHz for recognition uploads)
    pub fn new(target_sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device found"))?;

        let (config, sample_rate) = Self::get_optimal_config(&device, target_sample_rate)?;

        Ok(Self {
            device,
            config,
            sample_rate,
        })
    }

    /// Find the input configuration closest to the target sample rate,
    /// preferring f32 sample formats
    fn get_optimal_config(device: &Device, target_sample_rate: u32) -> Result<(StreamConfig, u32)> {
        let supported_configs = device.supported_input_configs()?;

        let mut best_range = None;
        let mut best_key = (true, u32::MAX);

        for range in supported_configs {
            let clamped = target_sample_rate
                .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            let key = (
                range.sample_format() != SampleFormat::F32,
                clamped.abs_diff(target_sample_rate),
            );
            if key < best_key {
                best_key = key;
                best_range = Some((range, clamped));
            }
        }

        let (range, sample_rate) =
            best_range.ok_or_else(|| anyhow!("No suitable audio configuration found"))?;

        let config = range.with_sample_rate(cpal::SampleRate(sample_rate));
        Ok((config.into(), sample_rate))
    }

    /// List all available audio input devices
    pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        let default_device = host.default_input_device();

        let mut device_infos = Vec::new();

        for device in devices {
            let name = device.name().unwrap_or("Unknown Device".to_string());
            let is_default = default_device
                .as_ref()
                .map(|d| d.name().unwrap_or_default() == name)
                .unwrap_or(false);

            let supported_sample_rates = device
                .supported_input_configs()?
                .map(|c| c.max_sample_rate().0)
                .collect();

            let supported_formats = device
                .supported_input_configs()?
                .map(|c| c.sample_format())
                .collect();

            device_infos.push(AudioDeviceInfo {
                name,
                is_default,
                supported_sample_rates,
                supported_formats,
            });
        }

        Ok(device_infos)
    }

    /// Start capturing into a new session.
    ///
    /// The stream callback appends mono i16 samples to the session buffer
    /// until the stop signal fires. A stream error also fires the signal so
    /// the wait loop ends instead of recording silence forever.
    pub fn start_session(&self, stop: StopSignal) -> Result<RecordingSession> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let buffer_clone = buffer.clone();
        let stop_capture = stop.clone();
        let stop_on_error = stop.clone();
        let channels = self.config.channels.max(1) as usize;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if stop_capture.is_stopped() {
                    return;
                }

                if let Ok(mut buffer) = buffer_clone.lock() {
                    for frame in data.chunks(channels) {
                        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                        let sample =
                            (mono * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32);
                        buffer.push(sample as i16);
                    }
                }
            },
            move |err| {
                eprintln!("Audio stream error: {}", err);
                stop_on_error.request_stop();
            },
            None,
        )?;

        stream.play()?;

        Ok(RecordingSession::new(
            stream,
            buffer,
            stop,
            self.sample_rate,
        ))
    }
}
