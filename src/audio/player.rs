use super::engine::{EngineError, PlaybackEngine};
use super::Track;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("track is not playable (missing title, stream or not loaded)")]
    InvalidTrack,

    #[error("index {index} is out of range for a playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("'{0}' has no resolved stream")]
    NoStream(String),

    #[error("already at the last track")]
    AtEnd,

    #[error("already at the first track")]
    AtStart,

    #[error("nothing is playing or paused")]
    NotStarted,

    #[error("playback engine error: {0}")]
    Engine(#[from] EngineError),
}

pub type TrackEndCallback = Box<dyn FnMut() + Send>;

/// Ordered playlist plus a cursor, driving a playback engine.
///
/// The UI owns exactly one of these and goes through its methods; nothing
/// outside this module can poke the index or the list directly.
pub struct Player<E: PlaybackEngine> {
    engine: E,
    playlist: Vec<Track>,
    current_index: usize,
    now_playing: Option<Track>,
    playing: bool,
    paused: bool, // loaded in the engine but held; false once stopped
    on_track_end: Option<TrackEndCallback>,
}

impl<E: PlaybackEngine> Player<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            playlist: Vec::new(),
            current_index: 0,
            now_playing: None,
            playing: false,
            paused: false,
            on_track_end: None,
        }
    }

    /// Replace the default end-of-track behaviour (advance to the next track).
    pub fn set_on_track_end(&mut self, callback: TrackEndCallback) {
        self.on_track_end = Some(callback);
    }

    pub fn add(&mut self, track: Track) -> Result<(), PlayerError> {
        if !track.is_valid() {
            return Err(PlayerError::InvalidTrack);
        }

        info!("Queued '{}' at position {}", track.title(), self.playlist.len());
        self.playlist.push(track);
        Ok(())
    }

    /// Drop the entry at `index`.
    ///
    /// The cursor is only clamped when it falls off the end, so removing an
    /// entry before it leaves the cursor on what used to be the next track.
    /// The engine is left alone unless the playlist ends up empty.
    pub fn remove(&mut self, index: usize) -> Result<Track, PlayerError> {
        if index >= self.playlist.len() {
            return Err(PlayerError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            });
        }

        let removed = self.playlist.remove(index);
        debug!("Removed '{}' from position {}", removed.title(), index);

        if self.playlist.is_empty() {
            if let Err(e) = self.engine.stop() {
                warn!("Engine refused to stop after the playlist emptied: {}", e);
            }
            self.current_index = 0;
            self.now_playing = None;
            self.playing = false;
            self.paused = false;
        } else if self.current_index >= self.playlist.len() {
            self.current_index = self.playlist.len() - 1;
        }

        Ok(removed)
    }

    /// Drop the entry under the cursor, stopping the engine first if that
    /// entry is the one playing.
    pub fn remove_current(&mut self) -> Result<Track, PlayerError> {
        let index = self.current_index;
        let is_now_playing = match (self.playlist.get(index), self.now_playing.as_ref()) {
            (Some(track), Some(playing)) => track.id() == playing.id(),
            _ => false,
        };

        if is_now_playing {
            // Already logged by stop(); removal goes ahead regardless
            let _ = self.stop();
        }

        let removed = self.remove(index)?;
        if is_now_playing {
            self.now_playing = None;
        }
        Ok(removed)
    }

    pub fn play_current(&mut self) -> Result<(), PlayerError> {
        if self.playlist.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }

        let track = self
            .playlist
            .get(self.current_index)
            .ok_or(PlayerError::IndexOutOfRange {
                index: self.current_index,
                len: self.playlist.len(),
            })?
            .clone();

        if track.stream_url().is_empty() {
            return Err(PlayerError::NoStream(track.title().to_string()));
        }

        self.engine.load(track.stream_url())?;
        self.engine.play()?;

        info!("Playing '{}' ({}/{})", track.title(), self.current_index + 1, self.playlist.len());
        self.now_playing = Some(track);
        self.playing = true;
        self.paused = false;
        Ok(())
    }

    /// Pause while playing, resume while paused. A stopped engine has
    /// nothing to resume, so that case is refused without touching it.
    pub fn toggle_pause(&mut self) -> Result<(), PlayerError> {
        if !self.playing && !self.paused {
            return Err(PlayerError::NotStarted);
        }

        self.engine.toggle_pause()?;
        self.paused = self.playing;
        self.playing = !self.playing;
        debug!("Toggled pause, playing = {}", self.playing);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), PlayerError> {
        match self.engine.stop() {
            Ok(()) => {
                self.playing = false;
                self.paused = false;
                Ok(())
            }
            Err(e) => {
                warn!("Engine stop failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn next(&mut self) -> Result<(), PlayerError> {
        if self.current_index + 1 >= self.playlist.len() {
            return Err(PlayerError::AtEnd);
        }
        self.current_index += 1;
        self.play_current()
    }

    pub fn previous(&mut self) -> Result<(), PlayerError> {
        if self.current_index == 0 {
            return Err(PlayerError::AtStart);
        }
        self.current_index -= 1;
        self.play_current()
    }

    /// Normalized position, `0.0` when the engine can't say.
    pub fn position(&self) -> f64 {
        self.engine.position().unwrap_or_else(|e| {
            debug!("Position unavailable: {}", e);
            0.0
        })
    }

    pub fn set_position(&mut self, fraction: f64) -> Result<(), PlayerError> {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.engine.set_position(fraction)?;
        Ok(())
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.engine.elapsed_millis().unwrap_or(0)
    }

    pub fn total_millis(&self) -> u64 {
        self.engine.total_millis().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        // A failed stop is already logged; clearing goes ahead regardless
        let _ = self.stop();
        self.playlist.clear();
        self.current_index = 0;
        self.now_playing = None;
        self.playing = false;
        self.paused = false;
    }

    /// Entry point for the engine's end-of-stream notification.
    pub fn handle_end_reached(&mut self) {
        self.playing = false;
        self.paused = false;

        if let Some(callback) = self.on_track_end.as_mut() {
            callback();
            return;
        }

        if let Err(e) = self.next() {
            debug!("No automatic advance after track end: {}", e);
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.playlist
    }

    pub fn len(&self) -> usize {
        self.playlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.current_index)
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.now_playing.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
