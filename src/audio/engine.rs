// The seam between the playlist state machine and whatever actually makes sound.
// The state machine only ever talks to this trait; the rodio backend lives in
// rodio_engine.rs and tests use an in-memory fake.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("audio thread is gone")]
    Disconnected,

    #[error("nothing is loaded")]
    NothingLoaded,

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("engine state lock poisoned")]
    Poisoned,
}

/// Asynchronous notifications raised by the engine.
///
/// These are delivered over a channel into the UI event loop, never by calling
/// back into the player from the audio thread. Each one carries the load it
/// belongs to, so events that were already queued when the user moved on can
/// be told apart from current ones.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The loaded stream played to its end.
    EndReached { load: u64 },
    /// Loading or decoding the stream failed after `load` had returned.
    Error { load: u64, reason: String },
}

impl EngineEvent {
    pub fn load(&self) -> u64 {
        match self {
            EngineEvent::EndReached { load } | EngineEvent::Error { load, .. } => *load,
        }
    }
}

pub trait PlaybackEngine {
    /// Hand the engine a stream address. Fetching/decoding may finish later.
    fn load(&mut self, address: &str) -> Result<(), EngineError>;

    fn play(&mut self) -> Result<(), EngineError>;

    /// Pause when playing, resume when paused.
    fn toggle_pause(&mut self) -> Result<(), EngineError>;

    fn stop(&mut self) -> Result<(), EngineError>;

    /// Normalized position in `[0.0, 1.0]`.
    fn position(&self) -> Result<f64, EngineError>;

    fn set_position(&mut self, fraction: f64) -> Result<(), EngineError>;

    fn elapsed_millis(&self) -> Result<u64, EngineError>;

    fn total_millis(&self) -> Result<u64, EngineError>;

    /// Counter bumped by every `load` and `stop`. Events tagged with an older
    /// value describe something the engine has since abandoned.
    fn current_load(&self) -> u64;
}
