// THEORY:
// Errors are split by where they can happen. Configuration problems are caught
// before a value ever reaches the pipeline, device problems end an ingest loop,
// and frame construction problems are reported to whoever builds the frame.
// Anything that goes wrong inside a single detection cycle (a zero color ratio,
// a candidate that is too small) is not an error at all: it simply means "no
// shot this cycle" and is only logged.

use thiserror::Error;

/// A configuration value outside its accepted range. Values are rejected, never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("detection cadence has an invalid value: {0} ms. Acceptable values are greater than 0")]
    Cadence(u128),
    #[error("brightness threshold has an invalid value: {0}. Acceptable values are between 1 and 255")]
    BrightnessThreshold(u8),
    #[error("color difference threshold has an invalid value: {0}. Acceptable values are greater than 1.0")]
    ColorDiffThreshold(f64),
    #[error("center border width has an invalid value: {0}. Acceptable values are greater than 0")]
    CenterBorderWidth(u32),
    #[error("accumulator depth has an invalid value: {0}. Acceptable values are at most {max}", max = u16::MAX)]
    AccumulatorDepth(usize),
    #[error("ignored laser color has an invalid value: {0}. Acceptable values are \"red\" and \"green\"")]
    LaserColor(String),
    #[error("sector ({row}, {col}) is outside the 3x3 sector grid")]
    Sector { row: usize, col: usize },
    #[error("searcher concurrency must be at least 1")]
    SearcherConcurrency,
    #[error("missed poll limit must be at least 1")]
    MissedPolls,
}

/// The frame source became permanently unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("can no longer communicate with video source {source_id}; was it unplugged?")]
    Lost { source_id: String },
}

/// A raw buffer could not be turned into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame buffer holds {actual} bytes but {width}x{height} RGBA needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
