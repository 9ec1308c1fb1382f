#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal helpers for the `popzone` binary: clipping and step bars on a
//! shared [`MultiProgress`], and [`init_logger`], which routes `log` output
//! through `indicatif-log-bridge` so log lines print above the bars.

use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressStyle;
use popzone_partition::progress::ClipProgress;

pub use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};

/// Clipping progress drawn as an `indicatif` bar.
///
/// Shows a spinner until the maintainer announces how many buffers it will
/// clip.
pub struct IndicatifProgress {
    bar: ProgressBar,
    counting: ProgressStyle,
}

impl IndicatifProgress {
    #[must_use]
    pub fn clip_bar(multi: &MultiProgress) -> Arc<dyn ClipProgress> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Building Voronoi ridges");

        let counting = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, counting })
    }
}

impl ClipProgress for IndicatifProgress {
    fn start(&self, radius_km: f64, total: u64) {
        self.bar.set_style(self.counting.clone());
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_message(format!("Clipping {radius_km} km buffers"));
    }

    fn clipped(&self, _location_id: &str) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Adds a bar counting `total` steps, labelled `message`.
#[must_use]
pub fn steps_bar(multi: &MultiProgress, message: &str, total: u64) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message(message.to_string());
    bar
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn clip_bar_counts_clipped_buffers() {
        let multi = hidden();
        let progress = IndicatifProgress::clip_bar(&multi);
        progress.start(5.0, 4);
        progress.clipped("a");
        progress.clipped("b");
        progress.finish();
    }

    #[test]
    fn steps_bar_has_fixed_length() {
        let bar = steps_bar(&hidden(), "Partitions", 3);
        bar.inc(2);
        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.position(), 2);
        bar.finish_and_clear();
    }
}
