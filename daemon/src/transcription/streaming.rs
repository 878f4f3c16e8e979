use std::path::Path;
use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{EngineMode, SpeechEngine};
use crate::errors::TranscriptionError;

/// Streaming whisper.cpp engine: accumulates chunks into a sliding window and
/// emits a finalized segment each time the window fills, keeping a short
/// overlap so words on the boundary are not lost. The model's own endpointing
/// does the silence gating; the scheduler applies no extra RMS gate.
pub struct StreamingWhisperEngine {
    _context: WhisperContext,
    state: WhisperState,
    buffer: Vec<f32>,
    window_samples: usize,
    keep_samples: usize,
    last_text: String,
    language: String,
}

impl StreamingWhisperEngine {
    pub fn new(
        model_path: &Path,
        language: &str,
        window_ms: u32,
        keep_ms: u32,
        sample_rate: u32,
    ) -> Result<Self, TranscriptionError> {
        if !model_path.exists() {
            return Err(TranscriptionError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        info!("Loading Whisper model for streaming from: {:?}", model_path);

        let path_str = model_path
            .to_str()
            .ok_or_else(|| TranscriptionError::ModelNotFound(model_path.display().to_string()))?;

        let context =
            WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
                .map_err(|e| TranscriptionError::Engine(format!("failed to load model: {}", e)))?;

        let state = context
            .create_state()
            .map_err(|e| TranscriptionError::Engine(format!("failed to create state: {}", e)))?;

        let window_samples = (window_ms as usize * sample_rate as usize) / 1000;
        let keep_samples = (keep_ms as usize * sample_rate as usize) / 1000;

        info!(
            "Streaming engine ready: window {} samples, overlap {} samples",
            window_samples, keep_samples
        );

        Ok(Self {
            _context: context,
            state,
            buffer: Vec::with_capacity(window_samples),
            window_samples,
            keep_samples,
            last_text: String::new(),
            language: language.to_string(),
        })
    }

    fn transcribe_window(&mut self) -> Result<String, TranscriptionError> {
        debug!("Processing window with {} samples", self.buffer.len());

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(Some(&self.language));
        params.set_single_segment(true);

        self.state
            .full(params, &self.buffer)
            .map_err(|e| TranscriptionError::Engine(format!("transcription failed: {}", e)))?;

        let num_segments = self.state.full_n_segments();
        let mut transcription = String::new();
        for i in 0..num_segments {
            if let Some(segment) = self.state.get_segment(i) {
                if let Ok(text) = segment.to_str() {
                    transcription.push_str(text);
                }
            }
        }

        Ok(transcription.trim().to_string())
    }
}

impl SpeechEngine for StreamingWhisperEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Streaming
    }

    fn transcribe(&mut self, samples: &[f32]) -> Result<String, TranscriptionError> {
        // Streaming engines are fed through `accept`; a direct call just
        // transcribes the given samples as one window.
        self.buffer = samples.to_vec();
        let text = self.transcribe_window()?;
        self.buffer.clear();
        Ok(text)
    }

    fn accept(&mut self, chunk: &[f32]) -> Result<Option<String>, TranscriptionError> {
        self.buffer.extend_from_slice(chunk);

        if self.buffer.len() < self.window_samples {
            return Ok(None);
        }

        let text = self.transcribe_window()?;

        // Slide the window, keeping the overlap tail.
        let skip = self.window_samples.saturating_sub(self.keep_samples);
        self.buffer = self.buffer.iter().skip(skip).copied().collect();

        if !text.is_empty() && text != self.last_text {
            self.last_text = text.clone();
            debug!("Finalized streaming segment: '{}'", text);
            return Ok(Some(text));
        }

        Ok(None)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last_text.clear();
        debug!("Streaming engine reset");
    }
}
