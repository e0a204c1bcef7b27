/// Width of the textual playback progress bar.
pub const BAR_WIDTH: usize = 20;

/// Format a duration in seconds as `M:SS`, or `H:MM:SS` once it reaches an
/// hour. Fractional seconds are floored; negative durations clamp to `0:00`.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Render a bar with `floor(completed / total * width)` filled segments.
pub fn render_bar(completed: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        (completed * width / total).min(width)
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
