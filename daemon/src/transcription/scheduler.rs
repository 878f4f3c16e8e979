use std::time::{Duration, Instant};
use tracing::debug;

use super::{post_process_transcript, EngineMode, SpeechEngine, Transcript};
use crate::audio::RollingBuffer;
use crate::errors::TranscriptionError;
use crate::vad::VoiceActivityTracker;

/// Decides, per resampled chunk, whether to invoke the engine now.
///
/// Batch policy: transcribe the rolling buffer once speech has been followed
/// by enough silence, or periodically while armed and speech is present,
/// unless the buffer is mostly silence, which is treated as spurious.
/// Streaming policy: feed every chunk and let the engine's own endpointing
/// decide when a segment finalizes.
///
/// At most one transcription call is in flight at a time: `submit` runs
/// synchronously on the single processing task and may block it for the
/// duration of the engine call; capture callbacks keep filling the frame
/// queue meanwhile.
pub struct TranscriptionScheduler<E: SpeechEngine> {
    engine: E,
    buffer: RollingBuffer,
    silence_threshold: f32,
    silence_duration: Duration,
    transcribe_interval: Duration,
    last_transcribe: Option<Instant>,
}

impl<E: SpeechEngine> TranscriptionScheduler<E> {
    pub fn new(
        engine: E,
        buffer: RollingBuffer,
        silence_threshold: f32,
        silence_duration: Duration,
        transcribe_interval: Duration,
    ) -> Self {
        Self {
            engine,
            buffer,
            silence_threshold,
            silence_duration,
            transcribe_interval,
            last_transcribe: None,
        }
    }

    /// Feeds one resampled chunk. Returns a post-processed transcript when
    /// the policy invoked the engine and it produced text.
    pub fn submit(
        &mut self,
        chunk: &[f32],
        vad: &mut VoiceActivityTracker,
        armed: bool,
        now: Instant,
    ) -> Result<Option<Transcript>, TranscriptionError> {
        match self.engine.mode() {
            EngineMode::Streaming => {
                let finalized = self.engine.accept(chunk)?;
                Ok(finalized.map(|text| Transcript {
                    text: post_process_transcript(&text),
                    observed_at: now,
                }))
            }
            EngineMode::Batch => {
                self.buffer.extend(chunk);

                let silence_elapsed = vad.silence_elapsed(now);
                let since_last = self
                    .last_transcribe
                    .map(|t| now.duration_since(t))
                    .unwrap_or(Duration::MAX);

                let should_transcribe = (vad.has_speech()
                    && silence_elapsed > self.silence_duration)
                    || (armed && since_last > self.transcribe_interval && vad.has_speech());

                if !should_transcribe {
                    return Ok(None);
                }

                // Spurious trigger: the window is mostly silence.
                if self.buffer.rms() < self.silence_threshold {
                    debug!("Buffer below silence threshold, skipping transcription");
                    vad.clear_speech();
                    return Ok(None);
                }

                self.last_transcribe = Some(now);

                let text = self.engine.transcribe(self.buffer.samples())?;
                Ok(Some(Transcript {
                    text: post_process_transcript(&text),
                    observed_at: now,
                }))
            }
        }
    }

    /// Clears the buffer, the interval clock and any engine-side state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_transcribe = None;
        self.engine.reset();
    }

    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted engine: hands out canned transcripts and records calls.
    struct MockEngine {
        mode: EngineMode,
        responses: Vec<String>,
        transcribe_calls: usize,
        accept_calls: usize,
        resets: usize,
    }

    impl MockEngine {
        fn batch(responses: &[&str]) -> Self {
            Self {
                mode: EngineMode::Batch,
                responses: responses.iter().rev().map(|s| s.to_string()).collect(),
                transcribe_calls: 0,
                accept_calls: 0,
                resets: 0,
            }
        }

        fn streaming(responses: &[&str]) -> Self {
            Self {
                mode: EngineMode::Streaming,
                responses: responses.iter().rev().map(|s| s.to_string()).collect(),
                transcribe_calls: 0,
                accept_calls: 0,
                resets: 0,
            }
        }
    }

    impl SpeechEngine for MockEngine {
        fn mode(&self) -> EngineMode {
            self.mode
        }

        fn transcribe(&mut self, _samples: &[f32]) -> Result<String, TranscriptionError> {
            self.transcribe_calls += 1;
            Ok(self.responses.pop().unwrap_or_default())
        }

        fn accept(&mut self, _chunk: &[f32]) -> Result<Option<String>, TranscriptionError> {
            self.accept_calls += 1;
            Ok(self.responses.pop().filter(|s| !s.is_empty()))
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn scheduler(engine: MockEngine) -> TranscriptionScheduler<MockEngine> {
        TranscriptionScheduler::new(
            engine,
            RollingBuffer::new(48000),
            0.01,
            Duration::from_millis(500),
            Duration::from_millis(800),
        )
    }

    fn vad() -> VoiceActivityTracker {
        VoiceActivityTracker::new(0.01, Duration::from_secs(5))
    }

    const LOUD: [f32; 512] = [0.2; 512];
    const QUIET: [f32; 512] = [0.0; 512];

    #[test]
    fn test_batch_no_transcription_without_speech() {
        let mut s = scheduler(MockEngine::batch(&["hello"]));
        let mut v = vad();
        let now = Instant::now();

        v.observe(0.0, now);
        let result = s.submit(&QUIET, &mut v, true, now).unwrap();
        assert!(result.is_none());
        assert_eq!(s.engine.transcribe_calls, 0);
    }

    #[test]
    fn test_batch_transcribes_on_silence_edge() {
        let mut s = scheduler(MockEngine::batch(&["Lightning Bolt Thirty"]));
        let mut v = vad();
        let t0 = Instant::now();

        // Speech, then silence past the threshold duration.
        v.observe(0.2, t0);
        s.submit(&LOUD, &mut v, false, t0).unwrap();

        let t1 = t0 + Duration::from_millis(100);
        v.observe(0.0, t1);

        let t2 = t1 + Duration::from_millis(700);
        v.observe(0.0, t2);
        let result = s.submit(&QUIET, &mut v, false, t2).unwrap();

        let transcript = result.expect("silence edge should trigger transcription");
        assert_eq!(transcript.text, "lightning bolt thirty");
        assert_eq!(transcript.observed_at, t2);
    }

    #[test]
    fn test_batch_armed_interval_transcription() {
        let mut s = scheduler(MockEngine::batch(&["first", "second"]));
        let mut v = vad();
        let t0 = Instant::now();

        v.observe(0.2, t0);
        let first = s.submit(&LOUD, &mut v, true, t0).unwrap();
        // since_last is MAX before the first call, so armed speech fires.
        assert!(first.is_some());

        // Within the interval: no second call.
        let t1 = t0 + Duration::from_millis(300);
        v.observe(0.2, t1);
        assert!(s.submit(&LOUD, &mut v, true, t1).unwrap().is_none());

        // Past the interval: fires again.
        let t2 = t0 + Duration::from_millis(900);
        v.observe(0.2, t2);
        assert!(s.submit(&LOUD, &mut v, true, t2).unwrap().is_some());
        assert_eq!(s.engine.transcribe_calls, 2);
    }

    #[test]
    fn test_batch_interval_policy_requires_armed() {
        let mut s = scheduler(MockEngine::batch(&["text"]));
        let mut v = vad();
        let t0 = Instant::now();

        v.observe(0.2, t0);
        let result = s.submit(&LOUD, &mut v, false, t0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_batch_quiet_buffer_skipped_and_clears_speech() {
        let mut s = scheduler(MockEngine::batch(&["ghost"]));
        let mut v = vad();
        let t0 = Instant::now();

        // Speech flag set, but only near-silent samples in the buffer.
        v.observe(0.2, t0);
        let result = s.submit(&QUIET, &mut v, true, t0).unwrap();

        assert!(result.is_none());
        assert_eq!(s.engine.transcribe_calls, 0);
        assert!(!v.has_speech());
    }

    #[test]
    fn test_batch_silence_edge_fires_once_per_edge() {
        let mut s = scheduler(MockEngine::batch(&["one", "two"]));
        let mut v = vad();
        let t0 = Instant::now();

        v.observe(0.2, t0);
        s.submit(&LOUD, &mut v, true, t0).unwrap();
        v.clear_speech();
        s.reset();

        // After the reset, silence alone must not trigger anything.
        let t1 = t0 + Duration::from_secs(2);
        v.observe(0.0, t1);
        assert!(s.submit(&QUIET, &mut v, true, t1).unwrap().is_none());
    }

    #[test]
    fn test_streaming_passes_every_chunk() {
        let mut s = scheduler(MockEngine::streaming(&["", "", "lightning bolt ten"]));
        let mut v = vad();
        let now = Instant::now();

        assert!(s.submit(&QUIET, &mut v, true, now).unwrap().is_none());
        assert!(s.submit(&QUIET, &mut v, true, now).unwrap().is_none());
        let third = s.submit(&QUIET, &mut v, true, now).unwrap();
        assert_eq!(third.unwrap().text, "lightning bolt ten");
        assert_eq!(s.engine.accept_calls, 3);
        assert_eq!(s.engine.transcribe_calls, 0);
    }

    #[test]
    fn test_reset_clears_buffer_and_engine() {
        let mut s = scheduler(MockEngine::batch(&[]));
        let mut v = vad();
        let now = Instant::now();

        v.observe(0.0, now);
        s.submit(&LOUD, &mut v, false, now).unwrap();
        assert!(!s.buffer().is_empty());

        s.reset();
        assert!(s.buffer().is_empty());
        assert_eq!(s.engine.resets, 1);
    }
}
