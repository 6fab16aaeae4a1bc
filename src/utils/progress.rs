//! Terminal progress indicators.
//!
//! Wraps `indicatif` with consistent styling and plugs it into the engine's
//! [`ProgressSink`] seam. Bars render on stderr so stdout stays clean for
//! `show --json` and scripts.
//!
//! # Environment Variables
//!
//! - `EPSYNC_NO_PROGRESS`: set to any value to hide every progress indicator
//!
//! Progress is also hidden when `--no-progress` is passed; [`TerminalProgress`]
//! then degrades to the same behavior as [`crate::core::NoopProgress`].

use crate::constants::NO_PROGRESS_ENV_VAR;
use crate::core::{ProgressSink, TransferProgress};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Checks if progress bars are disabled through the environment.
fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok()
}

/// A progress bar with consistent styling.
///
/// Hidden bars accept every call and draw nothing.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar for `len` work units with the default style.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(ProgressStyle::default_style());
            bar
        };
        Self { inner: bar }
    }

    /// Creates a byte-counting bar for a download of `total` bytes.
    ///
    /// When the size is unknown a spinner with a running byte count is used.
    pub fn new_download(total: Option<u64>) -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }
        let bar = match total {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(ProgressStyle::download());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(ProgressStyle::download_unknown());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        Self { inner: bar }
    }

    /// A bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_length(&self, len: u64) {
        self.inner.set_length(len);
    }

    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// Predefined styles.
pub struct ProgressStyle;

impl ProgressStyle {
    /// Counted work units.
    pub fn default_style() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Downloads with a known size.
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Downloads without a `Content-Length`.
    pub fn download_unknown() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
    }
}

#[derive(Default)]
struct Bars {
    download: Option<ProgressBar>,
    apply: Option<ProgressBar>,
}

/// [`ProgressSink`] that draws download and merge bars on the terminal.
///
/// Bars are created lazily on the first event of each phase and cleared when
/// the phase ends.
pub struct TerminalProgress {
    enabled: bool,
    bars: Mutex<Bars>,
}

impl TerminalProgress {
    /// Creates a sink. `enabled = false` hides everything.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: enabled && !is_progress_disabled(),
            bars: Mutex::new(Bars::default()),
        }
    }

    /// Whether anything will be drawn.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl ProgressSink for TerminalProgress {
    fn on_transfer(&self, progress: TransferProgress) {
        if !self.enabled {
            return;
        }
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars.download.get_or_insert_with(|| {
            let bar = ProgressBar::new_download(progress.total_bytes);
            bar.set_prefix("Downloading");
            bar
        });
        if let Some(total) = progress.total_bytes {
            bar.set_length(total);
        }
        bar.set_position(progress.bytes_transferred);
    }

    fn on_apply(&self, done: usize, total: usize) {
        if !self.enabled {
            return;
        }
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars.apply.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_prefix("Applying");
            bar
        });
        bar.set_position(done as u64);
    }

    fn on_phase_end(&self) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        if let Some(bar) = bars.download.take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = bars.apply.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_accepts_updates() {
        let bar = ProgressBar::hidden();
        bar.set_length(10);
        bar.set_position(5);
        bar.set_message("working");
        assert_eq!(bar.position(), 5);
        bar.finish_and_clear();
    }

    #[test]
    fn test_disabled_sink_draws_nothing() {
        let sink = TerminalProgress::new(false);
        assert!(!sink.is_enabled());
        sink.on_transfer(TransferProgress {
            bytes_transferred: 10,
            total_bytes: Some(100),
        });
        sink.on_apply(1, 2);
        sink.on_phase_end();
        let bars = sink.bars.lock().unwrap();
        assert!(bars.download.is_none());
        assert!(bars.apply.is_none());
    }

    #[test]
    fn test_styles_build() {
        let _ = ProgressStyle::default_style();
        let _ = ProgressStyle::download();
        let _ = ProgressStyle::download_unknown();
    }
}
