pub mod buffer;
pub mod capture;
pub mod mixer;
pub mod resample;

pub use buffer::RollingBuffer;
pub use capture::AudioCapture;
pub use mixer::AudioSourceMixer;

/// Which capture stream produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    Microphone,
    Loopback,
}

/// One callback's worth of mono samples, already amplitude-weighted by the
/// source gain. Immutable once created; ownership moves into the frame queue.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub source: AudioSource,
}

/// Root-mean-square amplitude, the pipeline's loudness metric.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
