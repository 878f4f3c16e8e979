use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::audio::{resample::resample, rms, AudioFrame};
use crate::command::{ArbiterState, CommandArbiter, CommandExtractor, DedupOutcome, Extraction, TranscriptDeduplicator};
use crate::dispatch::{CommandSink, DispatchGate};
use crate::transcription::{SpeechEngine, Transcript, TranscriptionScheduler};
use crate::vad::VoiceActivityTracker;

const RECV_POLL: Duration = Duration::from_millis(100);

/// Shared view of the running pipeline, read by the IPC status handler.
///
/// `running` doubles as the shutdown flag: clearing it makes the processing
/// task exit its loop at the next poll.
pub struct PipelineMonitor {
    running: AtomicBool,
    level: Arc<AtomicU32>,
    arbiter: AtomicU8,
}

impl PipelineMonitor {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            level: Arc::new(AtomicU32::new(0)),
            arbiter: AtomicU8::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// Handle the capture callbacks write the VU level through.
    pub fn level_handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.level)
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    pub fn set_arbiter(&self, state: ArbiterState) {
        let code = match state {
            ArbiterState::Armed => 0,
            ArbiterState::Disarmed => 1,
            ArbiterState::CooldownActive => 2,
        };
        self.arbiter.store(code, Ordering::Relaxed);
    }

    pub fn arbiter_str(&self) -> &'static str {
        match self.arbiter.load(Ordering::Relaxed) {
            1 => "disarmed",
            2 => "cooldown",
            _ => "armed",
        }
    }
}

impl Default for PipelineMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// The processing task: consumes mixed audio frames and drives VAD,
/// transcription, extraction and dispatch.
pub struct Pipeline<E: SpeechEngine, S: CommandSink> {
    vad: VoiceActivityTracker,
    scheduler: TranscriptionScheduler<E>,
    dedup: TranscriptDeduplicator,
    extractor: CommandExtractor,
    arbiter: CommandArbiter,
    gate: Arc<Mutex<DispatchGate<S>>>,
    target_rate: u32,
    monitor: Arc<PipelineMonitor>,
}

impl<E: SpeechEngine, S: CommandSink> Pipeline<E, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vad: VoiceActivityTracker,
        scheduler: TranscriptionScheduler<E>,
        extractor: CommandExtractor,
        arbiter: CommandArbiter,
        gate: Arc<Mutex<DispatchGate<S>>>,
        target_rate: u32,
        monitor: Arc<PipelineMonitor>,
    ) -> Self {
        monitor.set_arbiter(arbiter.state());
        Self {
            vad,
            scheduler,
            dedup: TranscriptDeduplicator::new(),
            extractor,
            arbiter,
            gate,
            target_rate,
            monitor,
        }
    }

    pub async fn run(mut self, mut frame_rx: broadcast::Receiver<AudioFrame>) {
        info!(wake_phrase = self.extractor.wake_phrase(), "Pipeline started");

        while self.monitor.is_running() {
            let frame = match timeout(RECV_POLL, frame_rx.recv()).await {
                Err(_) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                    warn!(dropped = n, "Processing fell behind, dropped oldest frames");
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    debug!("Frame channel closed");
                    break;
                }
                Ok(Ok(frame)) => frame,
            };

            self.process_frame(frame).await;
        }

        info!("Pipeline stopped");
    }

    async fn process_frame(&mut self, frame: AudioFrame) {
        let now = Instant::now();

        let observation = self.vad.observe(rms(&frame.samples), now);
        if observation.stale_reset {
            self.reset_session();
        }

        if self.arbiter.observe_silence(self.vad.silence_elapsed(now)) {
            info!("Re-arming on silence");
            self.vad.clear_speech();
            self.monitor.set_arbiter(self.arbiter.state());
        }

        let chunk = resample(&frame.samples, frame.sample_rate, self.target_rate);

        let transcript = match self
            .scheduler
            .submit(&chunk, &mut self.vad, self.arbiter.is_armed(), now)
        {
            Ok(Some(transcript)) => transcript,
            Ok(None) => return,
            Err(e) => {
                error!("Transcription failed: {e}");
                return;
            }
        };

        self.handle_transcript(transcript, now).await;
    }

    async fn handle_transcript(&mut self, transcript: Transcript, now: Instant) {
        match self.dedup.observe(&transcript.text) {
            DedupOutcome::Empty => {
                self.vad.clear_speech();
                return;
            }
            DedupOutcome::Duplicate | DedupOutcome::Extension => return,
            DedupOutcome::Fresh => {}
        }

        info!("Heard: {}", transcript.text);

        if !self.arbiter.is_armed() {
            self.vad.clear_speech();
            return;
        }

        match self.extractor.extract(&transcript.text) {
            Extraction::NoWake => {
                self.vad.clear_speech();
            }
            Extraction::WakeNoIntensity => {
                info!("Wake phrase heard, no intensity given");
                self.vad.clear_speech();
            }
            Extraction::Command(intensity) => {
                let outcome = self.gate.lock().await.dispatch(intensity, now).await;
                match &outcome {
                    Ok(ack) => info!(intensity, status = ack.status, "Fired"),
                    Err(e) => warn!("Dispatch rejected: {e}"),
                }
                self.arbiter.on_dispatch_attempt(&outcome);
                self.monitor.set_arbiter(self.arbiter.state());
                // One attempt per utterance: drop everything heard so far.
                self.vad.reset();
                self.dedup.reset();
                self.scheduler.reset();
            }
        }
    }

    fn reset_session(&mut self) {
        self.scheduler.reset();
        self.dedup.reset();
        self.arbiter.force_rearm();
        self.monitor.set_arbiter(self.arbiter.state());
    }
}
