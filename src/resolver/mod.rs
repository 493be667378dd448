// Track resolution - turns a pasted URL into a queued Track
// The extractor does the heavy lifting on a blocking thread; this module owns
// validation and the bookkeeping for requests that are still in flight.

pub mod ytdlp;

pub use ytdlp::YtDlp;

use crate::audio::Track;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SUPPORTED_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("unreadable extractor output: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no URL given")]
    EmptyUrl,

    #[error("not a YouTube URL: {0}")]
    UnsupportedUrl(String),

    #[error("already resolving {0}")]
    AlreadyInProgress(String),

    #[error("no video information returned for {0}")]
    NoData(String),

    #[error("extraction failed for {url}: {source}")]
    Extraction {
        url: String,
        #[source]
        source: ExtractError,
    },

    #[error("resolver task failed: {0}")]
    TaskFailed(String),
}

/// The subset of extractor metadata a Track needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub url: Option<String>, // the selected audio stream
}

impl ExtractedInfo {
    pub fn into_track(self, source_url: &str) -> Track {
        let duration_secs = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0);

        Track::resolved(
            source_url,
            self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration_secs,
            self.uploader
                .or(self.channel)
                .unwrap_or_else(|| "Unknown Channel".to_string()),
            self.url.unwrap_or_default(),
        )
    }
}

/// Something that can look up a video and pick its best audio stream.
///
/// Called from a blocking thread, so implementations may block freely.
pub trait Extractor: Send + Sync + 'static {
    /// `Ok(None)` means the extractor ran but had nothing to say about the URL.
    fn extract(&self, url: &str) -> Result<Option<ExtractedInfo>, ExtractError>;
}

/// Substring check against the known video hosts. No real URL parsing.
pub fn is_supported_url(url: &str) -> bool {
    let url = url.trim();
    SUPPORTED_HOSTS.iter().any(|host| url.contains(host))
}

pub fn validate(url: Option<&str>) -> bool {
    url.is_some_and(validate_str)
}

pub fn validate_str(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && is_supported_url(url)
}

/// Stateless: every call goes to the extractor, no retries and no caching.
pub struct TrackResolver<X: Extractor> {
    extractor: Arc<X>,
}

impl<X: Extractor> TrackResolver<X> {
    pub fn new(extractor: X) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }

    pub async fn resolve(&self, url: &str) -> Result<Track, ResolveError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ResolveError::EmptyUrl);
        }
        if !is_supported_url(url) {
            return Err(ResolveError::UnsupportedUrl(url.to_string()));
        }

        debug!("Resolving {}", url);
        let extractor = Arc::clone(&self.extractor);
        let owned_url = url.to_string();
        let outcome = tokio::task::spawn_blocking(move || extractor.extract(&owned_url))
            .await
            .map_err(|e| ResolveError::TaskFailed(e.to_string()))?;

        match outcome {
            Ok(Some(info)) => {
                let track = info.into_track(url);
                info!("Resolved {} -> '{}' by {}", url, track.title(), track.channel());
                Ok(track)
            }
            Ok(None) => {
                warn!("Extractor returned nothing for {}", url);
                Err(ResolveError::NoData(url.to_string()))
            }
            Err(source) => {
                warn!("Extraction failed for {}: {}", url, source);
                Err(ResolveError::Extraction {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }
}

/// Outcome of one background resolution, delivered back to the event loop.
#[derive(Debug)]
pub struct Resolution {
    pub url: String,
    pub outcome: Result<Track, ResolveError>,
}

/// Runs resolutions in the background and remembers which URLs are in flight.
///
/// A second request for a URL that is still pending is turned away rather than
/// queued or shared. The owner must call `finish` for every `Resolution` it
/// receives so the URL can be requested again.
pub struct ResolutionQueue<X: Extractor> {
    resolver: Arc<TrackResolver<X>>,
    pending: HashSet<String>,
    completed: mpsc::UnboundedSender<Resolution>,
}

impl<X: Extractor> ResolutionQueue<X> {
    pub fn new(resolver: TrackResolver<X>, completed: mpsc::UnboundedSender<Resolution>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            pending: HashSet::new(),
            completed,
        }
    }

    /// Start resolving `url`. Must be called from within a tokio runtime.
    pub fn submit(&mut self, url: &str) -> Result<(), ResolveError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ResolveError::EmptyUrl);
        }
        if self.pending.contains(url) {
            return Err(ResolveError::AlreadyInProgress(url.to_string()));
        }
        if !is_supported_url(url) {
            return Err(ResolveError::UnsupportedUrl(url.to_string()));
        }

        let url = url.to_string();
        self.pending.insert(url.clone());

        let resolver = Arc::clone(&self.resolver);
        let completed = self.completed.clone();
        tokio::spawn(async move {
            let outcome = resolver.resolve(&url).await;
            // Nobody listening any more (shutdown) - the result is simply dropped
            let _ = completed.send(Resolution { url, outcome });
        });

        Ok(())
    }

    /// Forget a finished resolution. Returns false if the URL wasn't pending.
    pub fn finish(&mut self, resolution: &Resolution) -> bool {
        self.pending.remove(&resolution.url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url.trim())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
