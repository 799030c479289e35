// THEORY:
// This file is the main entry point for the `laser_vision` library crate: a
// detector that watches a camera pointed at a target and reports where a laser
// training pistol's flash lands, and in which color.
//
// The public surface is small. Build a `DetectionControl` (the
// operator's live tuning handle), pick a `FrameSource`, bundle the consumers in
// `IngestSinks` and hand all of it to an `IngestLoop`. The per-frame machinery in
// `core_modules` (thresholding, the background model, the sector search) is
// public for tools and tests but never needs to be driven by hand.

pub mod config;
pub mod control;
pub mod core_modules;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod searcher_pool;
pub mod sinks;
pub mod source;

pub use config::{DetectionConfig, IngestConfig};
pub use control::DetectionControl;
pub use core_modules::frame::Frame;
pub use core_modules::sector_grid::SectorGrid;
pub use core_modules::shot::{LaserColor, Shot};
pub use error::{ConfigError, DeviceError, FrameError};
pub use ingest::{IngestLoop, IngestSummary};
pub use sinks::{DeviceLostNotifier, DisplaySink, IngestSinks, ShotLog, ShotSink, ThresholdListener};
pub use source::{FrameSource, ReplaySource, StreamSource};
