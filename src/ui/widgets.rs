// Text for the player widgets
// Kept free of ratatui types so the exact strings can be tested

use crate::audio::Track;

pub const PROGRESS_WIDTH: usize = 40;
const LINE_LIMIT: usize = 80;
const LIST_TITLE_LIMIT: usize = 40;
const STATUS_TITLE_LIMIT: usize = 30;
pub const DIALOG_TITLE_LIMIT: usize = 40;

/// Cut `text` to `max` characters, the last three being "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

pub fn format_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn banner(track_count: usize, resolving: usize) -> String {
    let mut text = String::from("tubepipe | 'a' to add a URL | ");
    if track_count == 0 {
        text.push_str("playlist is empty");
    } else if track_count == 1 {
        text.push_str("1 track in playlist");
    } else {
        text.push_str(&format!("{track_count} tracks in playlist"));
    }
    if resolving > 0 {
        text.push_str(&format!(" | resolving {resolving}..."));
    }
    text
}

pub fn playlist_line(track: &Track, is_current: bool) -> String {
    let prefix = if is_current { "▶ " } else { "  " };
    let line = format!("{prefix}{track}");
    if line.chars().count() <= LINE_LIMIT {
        return line;
    }

    format!(
        "{prefix}{} - {} [{}]",
        truncate(track.title(), LIST_TITLE_LIMIT),
        track.channel(),
        track.format_duration()
    )
}

pub fn status_line(now_playing: Option<&Track>, playing: bool) -> String {
    match now_playing {
        Some(track) if playing => format!("♪ {}", truncate(track.title(), STATUS_TITLE_LIMIT)),
        Some(track) => format!("⏸ {}", truncate(track.title(), STATUS_TITLE_LIMIT)),
        None => "Stopped".to_string(),
    }
}

/// `│███░░░│ NN%`, or a dashed bar at zero.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    if progress == 0.0 {
        return format!("│{}│ 0%", "─".repeat(width));
    }

    let filled = ((progress * width as f64) as usize).min(width);
    format!(
        "│{}{}│ {}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        (progress * 100.0) as u32
    )
}

/// "elapsed / total" and "remaining" lines.
pub fn time_lines(elapsed_millis: u64, total_millis: u64) -> (String, String) {
    let elapsed = elapsed_millis / 1000;
    let total = total_millis / 1000;
    if total == 0 {
        return (
            format!("{} / --:--", format_time(elapsed)),
            "remaining --:--".to_string(),
        );
    }

    let elapsed = elapsed.min(total);
    (
        format!("{} / {}", format_time(elapsed), format_time(total)),
        format!("remaining {}", format_time(total - elapsed)),
    )
}
