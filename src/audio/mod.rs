pub mod engine;
pub mod player;
pub mod track;
#[cfg(feature = "audio")]
pub mod rodio_engine;

pub use engine::{EngineError, EngineEvent, PlaybackEngine};
pub use player::{Player, PlayerError};
pub use track::Track;
#[cfg(feature = "audio")]
pub use rodio_engine::{PlaybackState, RodioEngine};

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
    pub user_agent: String, // sent when fetching the resolved stream
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string(),
        }
    }
}

impl From<&crate::config::Config> for AudioConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            volume: config.player.volume(),
            ..AudioConfig::default()
        }
    }
}
