pub mod audio;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod transcription;
pub mod vad;

pub use command::{CommandArbiter, CommandExtractor, TranscriptDeduplicator};
pub use dispatch::{DispatchGate, OpenShockClient};
pub use pipeline::Pipeline;
pub use vad::VoiceActivityTracker;
