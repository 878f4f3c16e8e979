use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::audio::{AudioFrame, AudioSourceMixer, RollingBuffer};
use crate::command::{CommandArbiter, CommandExtractor};
use crate::config::Config;
use crate::dispatch::{DispatchAck, DispatchGate, OpenShockClient};
use crate::errors::DispatchError;
use crate::pipeline::{Pipeline, PipelineMonitor};
use crate::transcription::{
    BatchWhisperEngine, SpeechEngine, StreamingWhisperEngine, TranscriptionScheduler,
};
use crate::vad::VoiceActivityTracker;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Intensity used by the `test` IPC command, low enough to verify the whole
/// dispatch path without being unpleasant.
const TEST_INTENSITY: u32 = 10;

/// Owns the session: audio streams, the processing task and the dispatch
/// gate. The gate is shared so the test command and the pipeline observe the
/// same cooldown window.
pub struct DaemonState {
    config: Config,
    monitor: Arc<PipelineMonitor>,
    mixer: Option<AudioSourceMixer>,
    pipeline_handle: Option<JoinHandle<()>>,
    gate: Arc<Mutex<DispatchGate<OpenShockClient>>>,
}

impl DaemonState {
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenShockClient::new(&config.dispatch)?;
        let gate = Arc::new(Mutex::new(DispatchGate::new(client, &config.dispatch)));

        Ok(Self {
            config,
            monitor: Arc::new(PipelineMonitor::new()),
            mixer: None,
            pipeline_handle: None,
            gate,
        })
    }

    pub fn is_listening(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens the audio streams and spawns the processing task. The engine is
    /// built by the caller (see [`DaemonState::build_engine`]) so the model
    /// load, which can take seconds, happens outside the state lock and
    /// `status`/`stop` stay responsive.
    pub fn start(&mut self, engine: Box<dyn SpeechEngine + Send>) -> Result<()> {
        if self.monitor.is_running() {
            bail!("Already listening");
        }
        self.config
            .validate_for_start()
            .map_err(|reason| anyhow!(reason))?;

        let vad = &self.config.vad;
        let whisper = &self.config.whisper;
        let target_rate = self.config.audio.sample_rate;

        let scheduler = TranscriptionScheduler::new(
            engine,
            RollingBuffer::with_window(self.config.buffer.rolling_seconds, target_rate),
            vad.silence_threshold,
            vad.silence_duration(),
            whisper.transcribe_interval(),
        );

        let pipeline = Pipeline::new(
            VoiceActivityTracker::new(vad.silence_threshold, vad.state_reset_timeout()),
            scheduler,
            CommandExtractor::new(&self.config.command.wake_word),
            CommandArbiter::new(vad.silence_duration()),
            Arc::clone(&self.gate),
            target_rate,
            Arc::clone(&self.monitor),
        );

        let (frame_tx, frame_rx) = broadcast::channel::<AudioFrame>(self.config.buffer.queue_capacity);
        let mixer = AudioSourceMixer::start(&self.config.audio, frame_tx, self.monitor.level_handle())?;
        if mixer.loopback_active() {
            info!("Capturing microphone and system loopback audio");
        }

        self.monitor.set_running(true);
        self.mixer = Some(mixer);
        self.pipeline_handle = Some(tokio::spawn(pipeline.run(frame_rx)));

        info!(wake_word = self.config.command.wake_word, "Listening started");
        Ok(())
    }

    /// Loads the whisper model named by the config. Blocking; callers on the
    /// async path should run it on a blocking task.
    pub fn build_engine(config: &Config) -> Result<Box<dyn SpeechEngine + Send>> {
        let whisper = &config.whisper;
        let model_path = whisper
            .model_path
            .as_deref()
            .ok_or_else(|| anyhow!("whisper.model_path is not configured"))?;
        let model_path = Path::new(model_path);

        let engine: Box<dyn SpeechEngine + Send> = if whisper.streaming_mode {
            Box::new(StreamingWhisperEngine::new(
                model_path,
                &whisper.language,
                whisper.window_ms,
                whisper.keep_ms,
                config.audio.sample_rate,
            )?)
        } else {
            Box::new(BatchWhisperEngine::new(model_path, &whisper.language)?)
        };
        Ok(engine)
    }

    /// Stops capture and waits for the processing task to drain, aborting it
    /// if it does not exit in time.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.monitor.is_running() && self.pipeline_handle.is_none() {
            bail!("Not listening");
        }

        self.monitor.set_running(false);
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.stop();
        }
        self.mixer = None;

        if let Some(mut handle) = self.pipeline_handle.take() {
            if timeout(STOP_TIMEOUT, &mut handle).await.is_err() {
                warn!("Processing task did not stop in time, aborting");
                handle.abort();
            }
        }

        info!("Listening stopped");
        Ok(())
    }

    pub fn status(&self) -> shared::StatusInfo {
        shared::StatusInfo {
            is_running: true,
            is_listening: self.monitor.is_running(),
            audio_level: self.monitor.level(),
            arbiter: self.monitor.arbiter_str().to_string(),
            wake_word: self.config.command.wake_word.clone(),
        }
    }

    /// Fires a low-intensity command through the shared gate, so a test
    /// consumes the same cooldown a voice command would.
    pub async fn test_fire(&self) -> Result<DispatchAck, DispatchError> {
        if self.config.dispatch.api_token.is_empty() || self.config.dispatch.control_id.is_empty() {
            return Err(DispatchError::Request(
                "dispatch.api_token and dispatch.control_id must be configured".to_string(),
            ));
        }
        self.gate.lock().await.dispatch(TEST_INTENSITY, Instant::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_engine_requires_model_path() {
        let config = Config::default();
        let err = match DaemonState::build_engine(&config) {
            Err(e) => e,
            Ok(_) => panic!("engine built without a model path"),
        };
        assert!(err.to_string().contains("model_path"));
    }

    #[test]
    fn test_build_engine_reports_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("ggml-base.en.bin");
        let mut config = Config::default();
        config.whisper.model_path = Some(missing.display().to_string());
        let err = match DaemonState::build_engine(&config) {
            Err(e) => e,
            Ok(_) => panic!("engine built from a missing model file"),
        };
        assert!(err.to_string().contains("ggml-base.en.bin"), "{err}");
    }
}
