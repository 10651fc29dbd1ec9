//! Presentation helpers for course content.

/// Marker stored in `lessons.video_url` for lessons without video
pub const TEXT_LESSON: &str = "Text Lesson";

/// Turn a stored video reference into a playable URL.
///
/// Full URLs pass through, `"Text Lesson"` is kept as is, and anything else is taken to be a
/// bare Vimeo video ID.
pub fn normalize_video_url(raw: &str) -> String {
    if raw == TEXT_LESSON || raw.contains("http") {
        raw.to_string()
    } else {
        format!("https://vimeo.com/{raw}")
    }
}

/// Format a length in seconds for display: `"1h 20m"`, `"5:30"`, `"0:45"`, or `"TBD"` when unknown.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "TBD".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Share of completed lessons as a whole percentage, rounded half up. Zero for an empty course.
pub fn completion_percent(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let percent = (completed.clamp(0, total) * 200 + total) / (total * 2);
    percent as i32
}
