use std::time::Duration;

use crate::dispatch::DispatchAck;
use crate::errors::DispatchError;

/// Whether the daemon will act on the next qualifying utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    /// Ready to fire.
    Armed,
    /// Fired recently; waiting for enough silence to re-arm.
    Disarmed,
    /// Last attempt was rejected by the cooldown gate.
    CooldownActive,
}

impl ArbiterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArbiterState::Armed => "armed",
            ArbiterState::Disarmed => "disarmed",
            ArbiterState::CooldownActive => "cooldown",
        }
    }
}

/// Guarantees one dispatch per utterance.
///
/// Every dispatch attempt disarms, whatever its outcome, so a transcript
/// that keeps matching across overlapping windows cannot fire twice. The
/// arbiter re-arms only after sustained silence, twice the utterance-end
/// silence so trailing words of the same sentence cannot re-trigger.
pub struct CommandArbiter {
    state: ArbiterState,
    rearm_after: Duration,
}

impl CommandArbiter {
    pub fn new(silence_duration: Duration) -> Self {
        Self {
            state: ArbiterState::Armed,
            rearm_after: silence_duration * 2,
        }
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArbiterState::Armed
    }

    /// Records the outcome of a dispatch attempt and disarms.
    pub fn on_dispatch_attempt(&mut self, outcome: &Result<DispatchAck, DispatchError>) {
        self.state = match outcome {
            Err(DispatchError::CooldownActive { .. }) => ArbiterState::CooldownActive,
            _ => ArbiterState::Disarmed,
        };
    }

    /// Feeds the current silence run. Returns true on the disarmed-to-armed
    /// transition so the caller can log it once.
    pub fn observe_silence(&mut self, elapsed: Duration) -> bool {
        if self.state != ArbiterState::Armed && elapsed > self.rearm_after {
            self.state = ArbiterState::Armed;
            return true;
        }
        false
    }

    /// Immediate re-arm, used when a stale session is reset.
    pub fn force_rearm(&mut self) {
        self.state = ArbiterState::Armed;
    }
}
