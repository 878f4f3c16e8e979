//! Turns transcripts into dispatch decisions: duplicate suppression,
//! wake-phrase and intensity extraction, and the armed/disarmed policy.

pub mod arbiter;
pub mod dedup;
pub mod extract;

pub use arbiter::{ArbiterState, CommandArbiter};
pub use dedup::{DedupOutcome, TranscriptDeduplicator};
pub use extract::{CommandExtractor, Extraction};
