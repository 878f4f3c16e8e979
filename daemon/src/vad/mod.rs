pub mod tracker;

pub use tracker::{VoiceActivityState, VoiceActivityTracker};
