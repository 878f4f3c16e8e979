use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Speech/silence state derived from per-chunk loudness.
///
/// `silence_start` is set only while silence holds continuously and clears on
/// any non-silent chunk.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoiceActivityState {
    pub is_silent: bool,
    pub silence_start: Option<Instant>,
    pub has_speech: bool,
    pub last_speech_time: Option<Instant>,
}

/// Outcome of observing one chunk.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub state: VoiceActivityState,
    /// The stale-session guard fired: no speech for longer than the reset
    /// timeout while flags were still set. The caller must reset the rest of
    /// the session (buffer, dedup, arbiter) as well.
    pub stale_reset: bool,
}

pub struct VoiceActivityTracker {
    state: VoiceActivityState,
    silence_threshold: f32,
    state_reset_timeout: Duration,
}

impl VoiceActivityTracker {
    pub fn new(silence_threshold: f32, state_reset_timeout: Duration) -> Self {
        debug!(
            "VAD tracker initialized: silence_threshold={:.4}, state_reset_timeout={:?}",
            silence_threshold, state_reset_timeout
        );
        Self {
            state: VoiceActivityState::default(),
            silence_threshold,
            state_reset_timeout,
        }
    }

    /// Feeds one chunk's RMS at time `now` and applies the transition rules.
    pub fn observe(&mut self, chunk_rms: f32, now: Instant) -> Observation {
        let is_silent = chunk_rms < self.silence_threshold;
        self.state.is_silent = is_silent;

        if is_silent {
            if self.state.silence_start.is_none() {
                self.state.silence_start = Some(now);
            }
        } else {
            self.state.silence_start = None;
            self.state.has_speech = true;
            self.state.last_speech_time = Some(now);
        }

        // Stale-session guard: recovers from flags a failed downstream step
        // never cleared.
        let mut stale_reset = false;
        if let Some(last_speech) = self.state.last_speech_time {
            if now.duration_since(last_speech) > self.state_reset_timeout {
                warn!("No speech for {:?}, forcing state reset", self.state_reset_timeout);
                self.reset();
                stale_reset = true;
            }
        }

        Observation {
            state: self.state,
            stale_reset,
        }
    }

    /// How long silence has held continuously; zero while not silent.
    pub fn silence_elapsed(&self, now: Instant) -> Duration {
        self.state
            .silence_start
            .map(|start| now.duration_since(start))
            .unwrap_or(Duration::ZERO)
    }

    pub fn has_speech(&self) -> bool {
        self.state.has_speech
    }

    pub fn clear_speech(&mut self) {
        self.state.has_speech = false;
    }

    pub fn state(&self) -> VoiceActivityState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = VoiceActivityState::default();
    }
}
