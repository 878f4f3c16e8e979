/// Classification of a transcript relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Nothing but whitespace survived post-processing.
    Empty,
    /// Identical to the previous transcript.
    Duplicate,
    /// Previous transcript plus a trailing continuation. Happens when the
    /// rolling window is re-transcribed while the speaker keeps talking.
    Extension,
    /// New utterance.
    Fresh,
}

/// Suppresses repeated transcriptions of the same rolling window.
///
/// Batch mode re-transcribes overlapping audio, so consecutive results are
/// often identical or prefix-extended. Only `Fresh` results should reach
/// extraction; `Extension` is suppressed because the fresh version of that
/// utterance already did.
#[derive(Debug, Default)]
pub struct TranscriptDeduplicator {
    last: String,
}

impl TranscriptDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, text: &str) -> DedupOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DedupOutcome::Empty;
        }
        if trimmed == self.last {
            return DedupOutcome::Duplicate;
        }
        let outcome = if !self.last.is_empty() && trimmed.starts_with(self.last.as_str()) {
            DedupOutcome::Extension
        } else {
            DedupOutcome::Fresh
        };
        self.last = trimmed.to_string();
        outcome
    }

    /// Forgets the previous transcript so the next one is always `Fresh`.
    pub fn reset(&mut self) {
        self.last.clear();
    }
}
