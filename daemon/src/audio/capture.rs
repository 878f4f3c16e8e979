use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{rms, AudioFrame, AudioSource};
use crate::errors::AudioDeviceError;

const CHANNELS: u16 = 1;

/// One cpal input stream feeding tagged, gain-weighted frames into the shared
/// frame queue. The callback only copies, scales and enqueues; all processing
/// happens on the consumer side.
pub struct AudioCapture {
    device: Device,
    stream: Option<Box<Stream>>,
    sample_rate: u32,
}

impl AudioCapture {
    /// Opens `device_spec` ("default" or a device name substring) for input.
    pub fn new(device_spec: &str) -> Result<Self, AudioDeviceError> {
        let host = cpal::default_host();

        let device = if device_spec.is_empty() || device_spec == "default" {
            host.default_input_device()
                .ok_or_else(|| AudioDeviceError::DeviceNotFound("default".to_string()))?
        } else {
            let mut found = None;
            let devices = host
                .input_devices()
                .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
            for candidate in devices {
                if let Ok(name) = candidate.name() {
                    if name.contains(device_spec) {
                        found = Some(candidate);
                        break;
                    }
                }
            }
            found.ok_or_else(|| AudioDeviceError::DeviceNotFound(device_spec.to_string()))?
        };

        tracing::info!(
            "Opened input device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        Ok(Self {
            device,
            stream: None,
            sample_rate: 0,
        })
    }

    /// Starts the stream. Every callback frame is scaled by `gain`, tagged
    /// with `source` and sent into `frame_tx`. When `level` is given, the
    /// scaled rolling loudness (`min(1, rms * 10)`) is published there for
    /// monitoring.
    pub fn start(
        &mut self,
        frame_tx: broadcast::Sender<AudioFrame>,
        source: AudioSource,
        gain: f32,
        preferred_rate: u32,
        chunk_size: u32,
        level: Option<Arc<AtomicU32>>,
    ) -> Result<(), AudioDeviceError> {
        let device_name = self
            .device
            .name()
            .unwrap_or_else(|_| "<unnamed>".to_string());

        let (config, sample_format) = self.pick_config(preferred_rate, chunk_size)?;
        self.sample_rate = config.sample_rate.0;

        tracing::info!(
            "Configuring {:?} stream on '{}': {} Hz, {} channel(s), gain {:.2}",
            source,
            device_name,
            self.sample_rate,
            config.channels,
            gain
        );

        let sample_rate = self.sample_rate;
        let error_callback = move |err| {
            // Overruns and other stream hiccups are logged, not fatal.
            tracing::warn!("Audio stream error on '{}': {}", device_name, err);
        };

        let stream: Box<Stream> = match sample_format {
            SampleFormat::F32 => {
                let tx = frame_tx.clone();
                let level = level.clone();
                let stream = self
                    .device
                    .build_input_stream(
                        &config,
                        move |data: &[f32], _: &_| {
                            Self::enqueue(data, gain, sample_rate, source, &tx, &level);
                        },
                        error_callback,
                        None,
                    )
                    .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
                Box::new(stream)
            }
            SampleFormat::I16 => {
                let tx = frame_tx.clone();
                let level = level.clone();
                let stream = self
                    .device
                    .build_input_stream(
                        &config,
                        move |data: &[i16], _: &_| {
                            let converted: Vec<f32> =
                                data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                            Self::enqueue(&converted, gain, sample_rate, source, &tx, &level);
                        },
                        error_callback,
                        None,
                    )
                    .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
                Box::new(stream)
            }
            SampleFormat::U16 => {
                let tx = frame_tx.clone();
                let level = level.clone();
                let stream = self
                    .device
                    .build_input_stream(
                        &config,
                        move |data: &[u16], _: &_| {
                            let converted: Vec<f32> = data
                                .iter()
                                .map(|&s| (s as i32 - i16::MAX as i32) as f32 / i16::MAX as f32)
                                .collect();
                            Self::enqueue(&converted, gain, sample_rate, source, &tx, &level);
                        },
                        error_callback,
                        None,
                    )
                    .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
                Box::new(stream)
            }
            format => {
                return Err(AudioDeviceError::UnsupportedFormat(format!("{:?}", format)));
            }
        };

        stream
            .play()
            .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
        self.stream = Some(stream);

        tracing::info!("{:?} capture started", source);
        Ok(())
    }

    /// Picks a mono input configuration, preferring `preferred_rate` and
    /// falling back to each config's own maximum rate.
    fn pick_config(
        &self,
        preferred_rate: u32,
        chunk_size: u32,
    ) -> Result<(StreamConfig, SampleFormat), AudioDeviceError> {
        let device_name = self
            .device
            .name()
            .unwrap_or_else(|_| "<unnamed>".to_string());

        let supported = self
            .device
            .supported_input_configs()
            .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;

        let mut fallback: Option<(StreamConfig, SampleFormat)> = None;
        for candidate in supported {
            if candidate.channels() != CHANNELS {
                continue;
            }
            if candidate.min_sample_rate().0 <= preferred_rate
                && candidate.max_sample_rate().0 >= preferred_rate
            {
                let format = candidate.sample_format();
                let mut config: StreamConfig = candidate
                    .with_sample_rate(cpal::SampleRate(preferred_rate))
                    .into();
                config.buffer_size = cpal::BufferSize::Fixed(chunk_size);
                return Ok((config, format));
            }
            if fallback.is_none() {
                let format = candidate.sample_format();
                let mut config: StreamConfig = candidate.with_max_sample_rate().into();
                config.buffer_size = cpal::BufferSize::Fixed(chunk_size);
                fallback = Some((config, format));
            }
        }

        if let Some((config, format)) = fallback {
            tracing::info!(
                "Device '{}' does not support {} Hz, capturing at {} Hz and resampling",
                device_name,
                preferred_rate,
                config.sample_rate.0
            );
            return Ok((config, format));
        }

        Err(AudioDeviceError::UnsupportedConfig {
            device: device_name,
        })
    }

    /// Real-time callback path: one fixed-size copy plus a non-blocking send.
    fn enqueue(
        data: &[f32],
        gain: f32,
        sample_rate: u32,
        source: AudioSource,
        frame_tx: &broadcast::Sender<AudioFrame>,
        level: &Option<Arc<AtomicU32>>,
    ) {
        let samples: Vec<f32> = data.iter().map(|&s| s * gain).collect();

        if let Some(level) = level {
            let loudness = (rms(&samples) * 10.0).min(1.0);
            level.store(loudness.to_bits(), Ordering::Relaxed);
        }

        // send never blocks; when the consumer lags, the channel drops the
        // oldest frames and the receiver observes a Lagged error.
        let _ = frame_tx.send(AudioFrame {
            samples,
            sample_rate,
            source,
        });
    }

    /// Native rate the stream actually runs at; 0 before `start`.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Releases the stream. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::info!("Audio capture stopped");
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

// cpal streams are not Send on every platform; the capture handle is owned by
// the session and only started/stopped from the control task.
unsafe impl Send for AudioCapture {}
unsafe impl Sync for AudioCapture {}
