use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::stats::Stats;

/// Single spinner line with running success/failure counts.
pub struct FuzzProgress {
    bar: ProgressBar,
}

impl FuzzProgress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} [{elapsed}] {msg}") {
            bar.set_style(style);
        }
        bar.set_message("Starting...");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, node: &str, stats: &Stats) {
        self.bar.set_message(format!(
            "{} | successes: {} | failures: {}",
            node, stats.number_of_successes, stats.number_of_failures
        ));
    }

    pub fn finish(&self, stats: &Stats) {
        self.bar.finish_with_message(format!(
            "Done | unique successes: {}/{}",
            stats.unique_operation_successes(),
            stats.operation_count()
        ));
    }
}
