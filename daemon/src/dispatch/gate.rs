use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{CommandSink, DispatchAck, ShockCommand};
use crate::config::DispatchConfig;
use crate::errors::DispatchError;

/// Last line of defence before the wire: clamps intensity to the configured
/// maximum and enforces the cooldown window.
///
/// The cooldown clock starts only on an accepted send, so a failed request
/// does not block the retry that follows it.
pub struct DispatchGate<S: CommandSink> {
    sink: S,
    control_id: String,
    max_intensity: u32,
    duration_ms: u32,
    cooldown: Duration,
    last_dispatch: Option<Instant>,
}

impl<S: CommandSink> DispatchGate<S> {
    pub fn new(sink: S, config: &DispatchConfig) -> Self {
        Self {
            sink,
            control_id: config.control_id.clone(),
            max_intensity: config.max_intensity,
            duration_ms: config.duration_ms,
            cooldown: config.cooldown(),
            last_dispatch: None,
        }
    }

    pub async fn dispatch(
        &mut self,
        intensity: u32,
        now: Instant,
    ) -> Result<DispatchAck, DispatchError> {
        if let Some(last) = self.last_dispatch {
            let elapsed = now.duration_since(last);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                return Err(DispatchError::CooldownActive {
                    remaining_secs: remaining.as_secs_f64(),
                });
            }
        }

        let clamped = intensity.min(self.max_intensity);
        if clamped != intensity {
            warn!(requested = intensity, clamped, "Intensity clamped to configured maximum");
        }

        let command = ShockCommand {
            intensity: clamped,
            duration_ms: self.duration_ms,
            control_id: self.control_id.clone(),
        };

        let ack = self.sink.send(&command).await?;
        self.last_dispatch = Some(now);
        info!(intensity = clamped, status = ack.status, "Command dispatched");
        Ok(ack)
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let elapsed = now.duration_since(last);
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }
}
