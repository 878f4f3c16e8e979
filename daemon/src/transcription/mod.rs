pub mod engine;
pub mod scheduler;
pub mod streaming;

pub use engine::BatchWhisperEngine;
pub use scheduler::TranscriptionScheduler;
pub use streaming::StreamingWhisperEngine;

use std::time::Instant;

use crate::errors::TranscriptionError;

/// How an engine integrates with the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Transcribes a whole buffer on demand; no incremental state. The
    /// scheduler decides when to invoke it.
    Batch,
    /// Maintains incremental state and reports finalized segments; performs
    /// its own endpointing.
    Streaming,
}

/// One recognized utterance, consumed immediately by the deduplicator.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub observed_at: Instant,
}

/// Speech-recognition collaborator. Batch engines implement `transcribe`;
/// streaming engines implement `accept` and `reset`.
pub trait SpeechEngine: Send {
    fn mode(&self) -> EngineMode;

    /// Transcribes an entire sample buffer (batch).
    fn transcribe(&mut self, samples: &[f32]) -> Result<String, TranscriptionError>;

    /// Feeds one chunk, returning a finalized segment when one completes
    /// (streaming).
    fn accept(&mut self, chunk: &[f32]) -> Result<Option<String>, TranscriptionError>;

    /// Drops any incremental state.
    fn reset(&mut self);
}

impl<T: SpeechEngine + ?Sized> SpeechEngine for Box<T> {
    fn mode(&self) -> EngineMode {
        (**self).mode()
    }

    fn transcribe(&mut self, samples: &[f32]) -> Result<String, TranscriptionError> {
        (**self).transcribe(samples)
    }

    fn accept(&mut self, chunk: &[f32]) -> Result<Option<String>, TranscriptionError> {
        (**self).accept(chunk)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Normalizes engine output before deduplication: strips whisper's bracketed
/// annotations ("[BLANK_AUDIO]", "(music)"), lowercases, collapses whitespace.
pub fn post_process_transcript(text: &str) -> String {
    let re = regex::Regex::new(r"\[.*?\]|\{.*?\}|\(.*?\)").unwrap();
    let stripped = re.replace_all(text, "");

    let cleaned = stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    tracing::debug!("Post-processed: '{}' -> '{}'", text.trim(), cleaned);

    cleaned
}
