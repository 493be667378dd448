use std::fmt;
use uuid::Uuid;

/// One queued item: a source URL plus whatever the resolver learned about it.
///
/// Everything except the `loaded` flag is fixed once the track is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: Uuid,
    url: String,
    title: String,
    duration_secs: u64, // 0 = unknown
    channel: String,
    stream_url: String,
    loaded: bool,
}

impl Track {
    /// An unresolved entry - only the source URL is known.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: String::new(),
            duration_secs: 0,
            channel: String::new(),
            stream_url: String::new(),
            loaded: false,
        }
    }

    /// A fully resolved entry, ready to be queued.
    pub fn resolved(
        url: impl Into<String>,
        title: impl Into<String>,
        duration_secs: u64,
        channel: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            duration_secs,
            channel: channel.into(),
            stream_url: stream_url.into(),
            loaded: true,
            ..Self::new(url)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    /// Playable only when every field the engine and the UI need is present.
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty() && !self.title.is_empty() && !self.stream_url.is_empty() && self.loaded
    }

    /// `m:ss`, or `00:00` when the duration is unknown.
    pub fn format_duration(&self) -> String {
        if self.duration_secs == 0 {
            return "00:00".to_string();
        }
        format!("{}:{:02}", self.duration_secs / 60, self.duration_secs % 60)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} [{}]", self.title, self.channel, self.format_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_track_is_valid() {
        let track = Track::resolved("https://youtu.be/abc", "Song", 215, "Channel", "https://cdn/a.m4a");
        assert!(track.is_valid());
        assert!(track.is_loaded());
        assert_eq!(track.duration_secs(), 215);
    }

    #[test]
    fn test_validity_requires_every_field() {
        assert!(!Track::new("https://youtu.be/abc").is_valid());
        assert!(!Track::resolved("", "Song", 1, "c", "s").is_valid());
        assert!(!Track::resolved("u", "", 1, "c", "s").is_valid());
        assert!(!Track::resolved("u", "Song", 1, "c", "").is_valid());

        let mut track = Track::resolved("u", "Song", 1, "", "s");
        assert!(track.is_valid(), "channel is optional");
        track.set_loaded(false);
        assert!(!track.is_valid());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(Track::resolved("u", "t", 0, "c", "s").format_duration(), "00:00");
        assert_eq!(Track::resolved("u", "t", 59, "c", "s").format_duration(), "0:59");
        assert_eq!(Track::resolved("u", "t", 215, "c", "s").format_duration(), "3:35");
        assert_eq!(Track::resolved("u", "t", 3725, "c", "s").format_duration(), "62:05");
    }

    #[test]
    fn test_copies_of_the_same_url_stay_distinct() {
        let a = Track::resolved("u", "t", 1, "c", "s");
        let b = Track::resolved("u", "t", 1, "c", "s");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_display() {
        let track = Track::resolved("u", "Song", 61, "Band", "s");
        assert_eq!(track.to_string(), "Song - Band [1:01]");
    }
}
