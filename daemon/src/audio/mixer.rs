use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{AudioCapture, AudioFrame, AudioSource};
use crate::config::AudioConfig;
use crate::errors::AudioDeviceError;

/// Owns the active capture streams and funnels their frames into one
/// arrival-ordered queue.
///
/// Mixing is an amplitude weighting of two independently captured streams,
/// not a sample-synchronized sum: mic frames are scaled by `1 - mix_ratio`,
/// loopback frames by `mix_ratio`, and frames interleave by arrival time.
pub struct AudioSourceMixer {
    microphone: AudioCapture,
    loopback: Option<AudioCapture>,
}

impl AudioSourceMixer {
    /// Opens the microphone (fatal on failure) and, when enabled, the
    /// loopback device (non-fatal: logged, session continues mic-only).
    pub fn start(
        config: &AudioConfig,
        frame_tx: broadcast::Sender<AudioFrame>,
        level: Arc<AtomicU32>,
    ) -> Result<Self, AudioDeviceError> {
        let mix_ratio = config.loopback_mix_ratio.clamp(0.0, 1.0);
        let mic_gain = if config.loopback_enabled {
            1.0 - mix_ratio
        } else {
            1.0
        };

        let mut microphone = AudioCapture::new(&config.device)?;
        microphone.start(
            frame_tx.clone(),
            AudioSource::Microphone,
            mic_gain,
            config.sample_rate,
            config.chunk_size,
            Some(level),
        )?;
        if microphone.sample_rate() != config.sample_rate {
            tracing::info!(
                "Microphone capturing at {} Hz, frames will be resampled to {} Hz",
                microphone.sample_rate(),
                config.sample_rate
            );
        }

        let loopback = if config.loopback_enabled {
            match Self::start_loopback(config, frame_tx, mix_ratio) {
                Ok(capture) => {
                    tracing::info!(
                        "Loopback capture active, mix ratio {:.0}% system audio",
                        mix_ratio * 100.0
                    );
                    Some(capture)
                }
                Err(e) => {
                    tracing::warn!("Failed to start loopback capture: {}", e);
                    tracing::warn!("Continuing with microphone only");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            microphone,
            loopback,
        })
    }

    fn start_loopback(
        config: &AudioConfig,
        frame_tx: broadcast::Sender<AudioFrame>,
        mix_ratio: f32,
    ) -> Result<AudioCapture, AudioDeviceError> {
        let mut capture = AudioCapture::new(&config.loopback_device)?;
        capture.start(
            frame_tx,
            AudioSource::Loopback,
            mix_ratio,
            config.sample_rate,
            config.chunk_size,
            None,
        )?;
        Ok(capture)
    }

    pub fn loopback_active(&self) -> bool {
        self.loopback.is_some()
    }

    /// Releases all streams. Idempotent.
    pub fn stop(&mut self) {
        self.microphone.stop();
        if let Some(loopback) = self.loopback.as_mut() {
            loopback.stop();
        }
    }
}
