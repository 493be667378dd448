// yt-dlp subprocess extractor
// Asks for the single-video JSON dump and keeps the fields a Track needs

use super::{ExtractError, ExtractedInfo, Extractor};
use crate::config::ExtractorConfig;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    format: String,
}

impl YtDlp {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            program: config.program.clone(),
            format: config.format.clone(),
        }
    }

    fn args<'a>(&'a self, url: &'a str) -> Vec<&'a str> {
        vec![
            "--dump-single-json",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "-f",
            self.format.as_str(),
            "--",
            url,
        ]
    }

    /// True if the configured program runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Extractor for YtDlp {
    fn extract(&self, url: &str) -> Result<Option<ExtractedInfo>, ExtractError> {
        debug!("Running {} for {}", self.program.display(), url);

        let output = Command::new(&self.program)
            .args(self.args(url))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_output(&output.stdout)
    }
}

/// Empty output and a literal `null` both mean "nothing found".
pub(crate) fn parse_output(stdout: &[u8]) -> Result<Option<ExtractedInfo>, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str::<Option<ExtractedInfo>>(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Never Gonna Give You Up",
        "duration": 212,
        "uploader": "Rick Astley",
        "channel": "RickAstleyVEVO",
        "ext": "m4a",
        "url": "https://rr3---sn.googlevideo.com/videoplayback?itag=140",
        "formats": [{"format_id": "140"}]
    }"#;

    #[test]
    fn test_parse_full_dump() {
        let info = parse_output(DUMP.as_bytes()).unwrap().unwrap();
        assert_eq!(info.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(info.duration, Some(212.0));
        assert_eq!(info.uploader.as_deref(), Some("Rick Astley"));
        assert_eq!(
            info.url.as_deref(),
            Some("https://rr3---sn.googlevideo.com/videoplayback?itag=140")
        );
    }

    #[test]
    fn test_parse_nothing() {
        assert_eq!(parse_output(b"").unwrap(), None);
        assert_eq!(parse_output(b"  \n").unwrap(), None);
        assert_eq!(parse_output(b"null\n").unwrap(), None);
    }

    #[test]
    fn test_parse_sparse_and_broken_output() {
        let info = parse_output(br#"{"title": null, "duration": 61.6}"#).unwrap().unwrap();
        assert_eq!(info.title, None);
        assert_eq!(info.duration, Some(61.6));
        assert_eq!(info.uploader, None);

        assert!(matches!(parse_output(b"ERROR: oops"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_arguments_select_a_single_audio_stream() {
        let ytdlp = YtDlp::new(&ExtractorConfig::default());
        let args = ytdlp.args("https://youtu.be/abc");
        assert_eq!(args[0], "--dump-single-json");
        assert!(args.contains(&"--no-playlist"));
        let format_at = args.iter().position(|a| *a == "-f").unwrap();
        assert_eq!(args[format_at + 1], crate::config::DEFAULT_FORMAT);
        assert_eq!(args.last(), Some(&"https://youtu.be/abc"));
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let ytdlp = YtDlp::new(&ExtractorConfig {
            program: PathBuf::from("/nonexistent/tubepipe-yt-dlp"),
            format: "bestaudio".to_string(),
        });
        assert!(!ytdlp.is_available());
        assert!(matches!(
            ytdlp.extract("https://youtu.be/abc"),
            Err(ExtractError::Spawn { .. })
        ));
    }
}
