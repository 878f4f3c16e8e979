use std::path::Path;
use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{EngineMode, SpeechEngine};
use crate::errors::TranscriptionError;

/// Whisper needs roughly a second of audio to produce anything useful;
/// shorter buffers are padded with silence.
const MIN_AUDIO_SAMPLES: usize = 16000;

/// Batch whisper.cpp engine: transcribes the whole rolling buffer on demand.
pub struct BatchWhisperEngine {
    _context: WhisperContext,
    state: WhisperState,
    language: String,
}

impl BatchWhisperEngine {
    /// Loads the model eagerly; a missing file is a startup error, not a
    /// mid-session one.
    pub fn new(model_path: &Path, language: &str) -> Result<Self, TranscriptionError> {
        if !model_path.exists() {
            return Err(TranscriptionError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        info!("Loading Whisper model from: {:?}", model_path);

        let path_str = model_path
            .to_str()
            .ok_or_else(|| TranscriptionError::ModelNotFound(model_path.display().to_string()))?;

        let context =
            WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
                .map_err(|e| TranscriptionError::Engine(format!("failed to load model: {}", e)))?;

        let state = context
            .create_state()
            .map_err(|e| TranscriptionError::Engine(format!("failed to create state: {}", e)))?;

        info!("Whisper model loaded successfully");

        Ok(Self {
            _context: context,
            state,
            language: language.to_string(),
        })
    }

    fn pad_audio(audio: &[f32]) -> Vec<f32> {
        if audio.len() >= MIN_AUDIO_SAMPLES {
            return audio.to_vec();
        }

        let padding = MIN_AUDIO_SAMPLES - audio.len();
        debug!(
            "Padding audio: {} samples + {} samples of silence",
            audio.len(),
            padding
        );

        let mut padded = audio.to_vec();
        padded.extend(std::iter::repeat(0.0).take(padding));
        padded
    }
}

impl SpeechEngine for BatchWhisperEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Batch
    }

    fn transcribe(&mut self, samples: &[f32]) -> Result<String, TranscriptionError> {
        debug!("Transcribing {} audio samples", samples.len());

        let audio = Self::pad_audio(samples);

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(Some(&self.language));

        self.state
            .full(params, &audio)
            .map_err(|e| TranscriptionError::Engine(format!("transcription failed: {}", e)))?;

        let num_segments = self.state.full_n_segments();
        let mut transcription = String::new();
        for i in 0..num_segments {
            if let Some(segment) = self.state.get_segment(i) {
                if let Ok(text) = segment.to_str() {
                    transcription.push_str(text);
                    transcription.push(' ');
                }
            }
        }

        let cleaned = transcription.trim().to_string();
        debug!(
            "Transcription: '{}' ({} ms of audio)",
            cleaned,
            (audio.len() * 1000) / 16000
        );

        Ok(cleaned)
    }

    fn accept(&mut self, _chunk: &[f32]) -> Result<Option<String>, TranscriptionError> {
        // Batch engines are driven through `transcribe` by the scheduler.
        Ok(None)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let result = BatchWhisperEngine::new(&path, "en");
        assert!(matches!(result, Err(TranscriptionError::ModelNotFound(_))));
    }

    #[test]
    fn test_pad_audio_no_padding_needed() {
        let audio = vec![0.0f32; 20000];
        let padded = BatchWhisperEngine::pad_audio(&audio);
        assert_eq!(padded.len(), 20000);
    }

    #[test]
    fn test_pad_audio_with_padding() {
        let audio = vec![0.3f32; 10000];
        let padded = BatchWhisperEngine::pad_audio(&audio);
        assert_eq!(padded.len(), MIN_AUDIO_SAMPLES);
        assert_eq!(&padded[..10000], &audio[..]);
        assert!(padded[10000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pad_audio_exact_length() {
        let audio = vec![0.1f32; MIN_AUDIO_SAMPLES];
        let padded = BatchWhisperEngine::pad_audio(&audio);
        assert_eq!(padded.len(), MIN_AUDIO_SAMPLES);
        assert_eq!(padded, audio);
    }

    #[test]
    fn test_pad_audio_empty() {
        let padded = BatchWhisperEngine::pad_audio(&[]);
        assert_eq!(padded.len(), MIN_AUDIO_SAMPLES);
        assert!(padded.iter().all(|&s| s == 0.0));
    }
}
