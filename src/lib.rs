// tubepipe library - playlist/player core, URL resolution and the terminal UI
// The binary is a thin shell over these; the core never prints anything itself

pub mod audio;    // playlist state machine and playback engines
pub mod config;   // settings file
pub mod resolver; // URL -> Track via yt-dlp
#[cfg(feature = "tui")]
pub mod ui;       // terminal interface

pub use audio::{Player, PlayerError, Track};
pub use config::Config;
pub use resolver::{ResolveError, TrackResolver};
