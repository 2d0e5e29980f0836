//! Build timing utilities.

use std::time::Instant;

/// Wall-clock timer for one pipeline stage.
pub struct Timer {
    label: String,
    started: Instant,
}

impl Timer {
    /// Start timing the named stage.
    pub fn start(label: &str) -> Self {
        Self {
            label: label.to_string(),
            started: Instant::now(),
        }
    }

    /// Stop the timer and print the elapsed time.
    pub fn finish(self) {
        println!(
            "  [{}] {}",
            format_duration(self.started.elapsed().as_secs_f64()),
            self.label
        );
    }
}

/// Render seconds as "12.3s" or "2.1m".
pub fn format_duration(secs: f64) -> String {
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}
