// THEORY:
// Two configuration structs, split by who reads them.
//
// 1.  `DetectionConfig` is the tuning of the detector itself. An operator may change
//     it at any time, so the pipeline never holds on to it: every detection cycle
//     takes one snapshot and uses that snapshot for its whole duration, including
//     the searcher it spawns.
// 2.  `IngestConfig` is the tuning of the loop around the detector (how long to wait
//     for a frame, how many searchers may run at once). It is fixed for the life of
//     a loop.
//
// Both are validated before use. Bad values are rejected with a `ConfigError`,
// never clamped into range.

use crate::core_modules::color::DEFAULT_COLOR_DIFF_THRESHOLD;
use crate::core_modules::sector_grid::SectorGrid;
use crate::core_modules::shot::LaserColor;
use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);
pub const DEFAULT_BRIGHTNESS_THRESHOLD: u8 = 230;
pub const DEFAULT_CENTER_BORDER_WIDTH: u32 = 3;
pub const DEFAULT_MIN_SHOT_DIMENSION: u32 = 7;
pub const DEFAULT_ACCUMULATOR_DEPTH: usize = 10;

pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(30);
pub const DEFAULT_MAX_MISSED_POLLS: u32 = 3;

/// Tuning for the detector, read once per detection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum time between two detection cycles. Should be about as long as the
    /// laser trainer stays on for one shot.
    pub cadence: Duration,
    /// Grayscale intensity a pixel must exceed to count as bright (1-255). As high
    /// as possible while still detecting shots.
    pub brightness_threshold: u8,
    /// How much the dominant channel must exceed the other two (> 1.0).
    pub color_diff_threshold: f64,
    /// Run of dark pixels that marks the edge of a flash during center approximation.
    pub center_border_width: u32,
    /// A candidate is rejected when both its width and height fall below this.
    pub min_shot_dimension: u32,
    /// Number of past masks in the background window. Zero disables detection.
    pub accumulator_depth: usize,
    pub sector_grid: SectorGrid,
    /// Shots of this color are skipped entirely.
    pub ignored_color: Option<LaserColor>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            color_diff_threshold: DEFAULT_COLOR_DIFF_THRESHOLD,
            center_border_width: DEFAULT_CENTER_BORDER_WIDTH,
            min_shot_dimension: DEFAULT_MIN_SHOT_DIMENSION,
            accumulator_depth: DEFAULT_ACCUMULATOR_DEPTH,
            sector_grid: SectorGrid::all_enabled(),
            ignored_color: None,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cadence.is_zero() {
            return Err(ConfigError::Cadence(self.cadence.as_millis()));
        }
        if self.brightness_threshold == 0 {
            return Err(ConfigError::BrightnessThreshold(self.brightness_threshold));
        }
        if !(self.color_diff_threshold.is_finite() && self.color_diff_threshold > 1.0) {
            return Err(ConfigError::ColorDiffThreshold(self.color_diff_threshold));
        }
        if self.center_border_width == 0 {
            return Err(ConfigError::CenterBorderWidth(self.center_border_width));
        }
        if self.accumulator_depth > u16::MAX as usize {
            return Err(ConfigError::AccumulatorDepth(self.accumulator_depth));
        }
        Ok(())
    }

    /// Whether cycles run at all under this configuration.
    pub fn detection_enabled(&self) -> bool {
        self.accumulator_depth > 0
    }
}

/// Tuning for an ingest loop, fixed when the loop is built.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// How long to wait before polling again when an open source had no frame.
    pub idle_backoff: Duration,
    /// Consecutive empty polls from a closed live source before it counts as lost.
    pub max_missed_polls: u32,
    /// Upper bound on searcher tasks running at the same time.
    pub searcher_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            max_missed_polls: DEFAULT_MAX_MISSED_POLLS,
            searcher_concurrency: num_cpus::get().max(1),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.searcher_concurrency == 0 {
            return Err(ConfigError::SearcherConcurrency);
        }
        if self.max_missed_polls == 0 {
            return Err(ConfigError::MissedPolls);
        }
        Ok(())
    }
}
