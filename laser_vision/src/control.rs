// THEORY:
// `DetectionControl` is the operator's handle on a running detector. It can be
// cloned freely and used from any thread (a GUI, a debugger window, a test).
//
// The detection config sits in a `tokio::sync::watch` channel. Writers validate a
// complete new value and swap it in; the ingest loop clones the current value once
// per cycle. There is no per-pixel locking and a cycle can never see half of an
// update. Concurrent writers resolve as last-writer-wins.
//
// The streaming and detecting switches are plain atomics: they are checked once per
// frame and nothing else depends on their exact ordering.

use crate::config::DetectionConfig;
use crate::core_modules::sector_grid::SectorGrid;
use crate::core_modules::shot::LaserColor;
use crate::error::ConfigError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug)]
struct ControlState {
    config: watch::Sender<DetectionConfig>,
    detecting: AtomicBool,
    streaming: AtomicBool,
}

/// Shared, cloneable operator handle over one detector.
#[derive(Debug, Clone)]
pub struct DetectionControl {
    state: Arc<ControlState>,
}

impl DetectionControl {
    pub fn new(config: DetectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: DetectionConfig) -> Self {
        let (sender, _) = watch::channel(config);
        Self {
            state: Arc::new(ControlState {
                config: sender,
                detecting: AtomicBool::new(true),
                streaming: AtomicBool::new(true),
            }),
        }
    }

    /// A consistent copy of the current detection config.
    pub fn snapshot(&self) -> DetectionConfig {
        self.state.config.borrow().clone()
    }

    /// Receiver that observes every accepted config change.
    pub fn subscribe(&self) -> watch::Receiver<DetectionConfig> {
        self.state.config.subscribe()
    }

    /// Applies `change` to a copy of the current config and publishes it if it validates.
    pub fn update(&self, change: impl FnOnce(&mut DetectionConfig)) -> Result<(), ConfigError> {
        let mut next = self.snapshot();
        change(&mut next);
        self.replace(next)
    }

    pub fn replace(&self, config: DetectionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.state.config.send_replace(config);
        Ok(())
    }

    pub fn set_cadence(&self, cadence: Duration) -> Result<(), ConfigError> {
        self.update(|config| config.cadence = cadence)
    }

    pub fn set_brightness_threshold(&self, threshold: u8) -> Result<(), ConfigError> {
        self.update(|config| config.brightness_threshold = threshold)
    }

    pub fn set_color_diff_threshold(&self, threshold: f64) -> Result<(), ConfigError> {
        log::debug!("set color component difference threshold: {}", threshold);
        self.update(|config| config.color_diff_threshold = threshold)
    }

    pub fn set_center_border_width(&self, width: u32) -> Result<(), ConfigError> {
        log::debug!("set the shot center approximation border size to: {}", width);
        self.update(|config| config.center_border_width = width)
    }

    pub fn set_min_shot_dimension(&self, dimension: u32) -> Result<(), ConfigError> {
        log::debug!("set the minimum dimension for shots to: {}", dimension);
        self.update(|config| config.min_shot_dimension = dimension)
    }

    /// Changing the depth makes the background model start a fresh warm-up.
    pub fn set_accumulator_depth(&self, depth: usize) -> Result<(), ConfigError> {
        self.update(|config| config.accumulator_depth = depth)
    }

    pub fn set_ignored_color(&self, color: Option<LaserColor>) -> Result<(), ConfigError> {
        self.update(|config| config.ignored_color = color)
    }

    pub fn set_sector_grid(&self, grid: SectorGrid) -> Result<(), ConfigError> {
        self.update(|config| config.sector_grid = grid)
    }

    pub fn set_sector(&self, row: usize, col: usize, enabled: bool) -> Result<(), ConfigError> {
        let mut next = self.snapshot();
        next.sector_grid.set(row, col, enabled)?;
        self.replace(next)
    }

    /// Turning detection off only stops new cycles; searches already running still report.
    pub fn set_detecting(&self, detecting: bool) {
        self.state.detecting.store(detecting, Ordering::Release);
    }

    pub fn is_detecting(&self) -> bool {
        self.state.detecting.load(Ordering::Acquire)
    }

    /// Turning streaming off makes the ingest loop finish after the current frame.
    pub fn set_streaming(&self, streaming: bool) {
        self.state.streaming.store(streaming, Ordering::Release);
    }

    pub fn is_streaming(&self) -> bool {
        self.state.streaming.load(Ordering::Acquire)
    }
}

impl Default for DetectionControl {
    fn default() -> Self {
        Self::from_valid(DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_updates_leave_config_untouched() {
        let control = DetectionControl::default();
        assert_eq!(
            control.set_brightness_threshold(0),
            Err(ConfigError::BrightnessThreshold(0))
        );
        assert_eq!(control.snapshot(), DetectionConfig::default());
    }

    #[test]
    fn clones_share_state() {
        let control = DetectionControl::default();
        let operator = control.clone();
        operator.set_accumulator_depth(4).unwrap();
        operator.set_sector(0, 0, false).unwrap();
        operator.set_detecting(false);

        let snapshot = control.snapshot();
        assert_eq!(snapshot.accumulator_depth, 4);
        assert!(!snapshot.sector_grid.is_enabled(0, 0));
        assert!(!control.is_detecting());
        assert!(control.is_streaming());
    }

    #[test]
    fn snapshots_do_not_change_under_later_updates() {
        let control = DetectionControl::default();
        let snapshot = control.snapshot();
        control.set_min_shot_dimension(1).unwrap();
        assert_eq!(snapshot.min_shot_dimension, DetectionConfig::default().min_shot_dimension);
        assert_eq!(control.snapshot().min_shot_dimension, 1);
    }

    #[test]
    fn subscribers_see_changes() {
        let control = DetectionControl::default();
        let mut receiver = control.subscribe();
        control.set_ignored_color(Some(LaserColor::Green)).unwrap();
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().ignored_color, Some(LaserColor::Green));
    }

    #[test]
    fn rejects_invalid_initial_config() {
        let config = DetectionConfig { center_border_width: 0, ..DetectionConfig::default() };
        assert_eq!(
            DetectionControl::new(config).unwrap_err(),
            ConfigError::CenterBorderWidth(0)
        );
    }
}
