use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub command: CommandConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub loopback_enabled: bool,
    #[serde(default)]
    pub loopback_device: String,
    #[serde(default = "default_mix_ratio")]
    pub loopback_mix_ratio: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

fn default_device() -> String {
    "default".to_string()
}
fn default_mix_ratio() -> f32 {
    0.5
}
fn default_sample_rate() -> u32 {
    16000
}
fn default_chunk_size() -> u32 {
    512
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            loopback_enabled: false,
            loopback_device: String::new(),
            loopback_mix_ratio: default_mix_ratio(),
            sample_rate: default_sample_rate(),
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VadConfig {
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    #[serde(default = "default_silence_duration")]
    pub silence_duration_secs: f64,
    #[serde(default = "default_state_reset_timeout")]
    pub state_reset_timeout_secs: f64,
}

fn default_silence_threshold() -> f32 {
    0.01
}
fn default_silence_duration() -> f64 {
    0.5
}
fn default_state_reset_timeout() -> f64 {
    5.0
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_threshold: default_silence_threshold(),
            silence_duration_secs: default_silence_duration(),
            state_reset_timeout_secs: default_state_reset_timeout(),
        }
    }
}

impl VadConfig {
    pub fn silence_duration(&self) -> Duration {
        Duration::from_secs_f64(self.silence_duration_secs)
    }

    pub fn state_reset_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.state_reset_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BufferConfig {
    #[serde(default = "default_rolling_seconds")]
    pub rolling_seconds: u32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_rolling_seconds() -> u32 {
    3
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            rolling_seconds: default_rolling_seconds(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WhisperConfig {
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub streaming_mode: bool,
    #[serde(default = "default_transcribe_interval")]
    pub transcribe_interval_secs: f64,
    #[serde(default = "default_window_ms")]
    pub window_ms: u32,
    #[serde(default = "default_keep_ms")]
    pub keep_ms: u32,
}

fn default_language() -> String {
    "en".to_string()
}
fn default_transcribe_interval() -> f64 {
    0.8
}
fn default_window_ms() -> u32 {
    3000
}
fn default_keep_ms() -> u32 {
    500
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            language: default_language(),
            streaming_mode: false,
            transcribe_interval_secs: default_transcribe_interval(),
            window_ms: default_window_ms(),
            keep_ms: default_keep_ms(),
        }
    }
}

impl WhisperConfig {
    pub fn transcribe_interval(&self) -> Duration {
        Duration::from_secs_f64(self.transcribe_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CommandConfig {
    #[serde(default = "default_wake_word")]
    pub wake_word: String,
}

fn default_wake_word() -> String {
    "lightning bolt".to_string()
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            wake_word: default_wake_word(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DispatchConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub control_id: String,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: u32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_url() -> String {
    "https://api.openshock.app/2/shockers/control".to_string()
}
fn default_max_intensity() -> u32 {
    100
}
fn default_duration_ms() -> u32 {
    1000
}
fn default_cooldown_seconds() -> f64 {
    10.0
}
fn default_request_timeout() -> u64 {
    5
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: String::new(),
            control_id: String::new(),
            max_intensity: default_max_intensity(),
            duration_ms: default_duration_ms(),
            cooldown_seconds: default_cooldown_seconds(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl DispatchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_seconds)
    }
}

impl Config {
    /// Checks the fields a session cannot start without. Everything else has
    /// a usable default.
    pub fn validate_for_start(&self) -> Result<(), String> {
        if self.dispatch.api_token.is_empty() {
            return Err("dispatch.api_token is not configured".to_string());
        }
        if self.dispatch.control_id.is_empty() {
            return Err("dispatch.control_id is not configured".to_string());
        }
        if self.whisper.model_path.is_none() {
            return Err("whisper.model_path is not configured".to_string());
        }
        Ok(())
    }
}

/// Loads the config file, merging defaults for any missing fields. A missing
/// or unparsable file degrades to full defaults; startup never aborts on
/// config problems.
pub fn load_config() -> Config {
    let config_path = get_config_path();

    if !config_path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", config_path);
        return Config::default();
    }

    tracing::info!("Loading config from {:?}", config_path);
    let config_str = match std::fs::read_to_string(&config_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to read config file, using defaults: {}", e);
            return Config::default();
        }
    };

    match toml::from_str(&config_str) {
        Ok(config) => {
            tracing::info!("Config loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to parse config file, using defaults: {}", e);
            Config::default()
        }
    }
}

fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxshock")
        .join("config.toml")
}
