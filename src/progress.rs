//! Progress display for update runs
//!
//! Provides visual feedback on stderr using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for the update workflow
pub struct Progress {
    /// Whether progress display is enabled (disabled in quiet mode and structured output)
    enabled: bool,
    /// Current progress bar
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Create a new progress reporter
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// Create a disabled progress reporter
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Show a spinner for resolving and planning
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.replace(spinner);
    }

    /// Start a bar counting execution units
    pub fn start(&mut self, total: u64, message: &str) {
        if !self.enabled {
            return;
        }

        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} units")
        {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.replace(bar);
    }

    fn replace(&mut self, bar: ProgressBar) {
        if let Some(old) = self.bar.replace(bar) {
            old.finish_and_clear();
        }
    }

    /// Increment progress by one
    pub fn inc(&self) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    /// Update the message
    pub fn set_message(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Finish and clear the current progress bar
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish_and_clear();
    }
}
