// THEORY:
// The `ShotSearcher` is the spatial half of the detector. Given one cycle's private
// snapshot (the color frame, the foreground mask and the config in force when the
// cycle started) it finds at most one shot.
//
// Algorithm steps:
// 1.  **Sector Walk**: Visit the enabled sectors row-major. Inside a sector, walk
//     each column top to bottom, left column first.
// 2.  **Candidate**: The first foreground pixel is a candidate.
// 3.  **Color Check**: Classify the laser color around the candidate. No color, or
//     the operator's ignored color, means keep scanning.
// 4.  **Center Approximation**: Walk down from the candidate until `border_width`
//     dark pixels in a row mark the bottom edge. The top edge is assumed to sit
//     `border_width` above the candidate. Then walk right along the middle row the
//     same way. This is a fast estimate, not a bounding box. It is biased towards
//     the bottom right and must stay that way.
// 5.  **Size Check**: Reject only when both width and height are below the minimum.
// 6.  **Stop**: The first accepted candidate ends the whole search.
//
// The searcher is a stateless utility. It never sees the background model and can
// run on any thread while the next cycle is being prepared.

use crate::config::DetectionConfig;
use crate::core_modules::mask::BinaryMask;
use crate::core_modules::shot::Shot;
use image::RgbImage;
use std::sync::Arc;

/// Everything one search needs, owned by that search alone.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    pub cycle: u64,
    pub frame: Arc<RgbImage>,
    pub foreground: BinaryMask,
    pub config: DetectionConfig,
}

/// The approximate extent and center of a flash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterEstimate {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CenterEstimate {
    /// Too small only when neither dimension reaches the minimum.
    pub fn is_too_small(&self, min_dimension: u32) -> bool {
        let min = min_dimension as f64;
        self.width < min && self.height < min
    }
}

pub mod shot_searcher {
    use super::*; // Make structs from parent module available.
    use crate::core_modules::color::detect_color;

    /// Finds the first qualifying shot in the snapshot, if any.
    pub fn find_shot(snapshot: &SearchSnapshot) -> Option<Shot> {
        let SearchSnapshot {
            cycle,
            frame,
            foreground,
            config,
        } = snapshot;

        if frame.dimensions() != foreground.dimensions() {
            log::debug!(
                "cycle {}: frame {:?} and foreground {:?} differ in size; skipping search",
                cycle,
                frame.dimensions(),
                foreground.dimensions()
            );
            return None;
        }

        let (width, height) = foreground.dimensions();
        for sector in config.sector_grid.enabled_sectors(width, height) {
            for x in sector.x.clone() {
                for y in sector.y.clone() {
                    if !foreground.is_on(x, y) {
                        continue;
                    }

                    let Some(color) = detect_color(frame, x, y, config.color_diff_threshold)
                    else {
                        continue;
                    };

                    if config.ignored_color == Some(color) {
                        continue;
                    }

                    let center = approximate_center(foreground, x, y, config.center_border_width);
                    if center.is_too_small(config.min_shot_dimension) {
                        log::debug!(
                            "suspected shot rejected: dimensions too small (x={}, y={}, width={} height={} min={})",
                            x,
                            y,
                            center.width,
                            center.height,
                            config.min_shot_dimension
                        );
                        continue;
                    }

                    log::debug!(
                        "suspected shot accepted: original coords ({}, {}), center ({}, {})",
                        x,
                        y,
                        center.x,
                        center.y
                    );
                    return Some(Shot {
                        color,
                        x: center.x,
                        y: center.y,
                        cycle: *cycle,
                    });
                }
            }
        }

        log::debug!("cycle {}: no shot found", cycle);
        None
    }

    /// Estimates the center of the flash whose candidate pixel is (x0, y0).
    ///
    /// The top and left edges are not searched: they are assumed to be
    /// `border_width` from the candidate, the same run the bottom and right
    /// searches need to see before they stop.
    pub fn approximate_center(
        mask: &BinaryMask,
        x0: u32,
        y0: u32,
        border_width: u32,
    ) -> CenterEstimate {
        let (width, height) = mask.dimensions();
        let border = border_width as f64;

        // --- 1. Bottom Edge ---
        let max_y = scan_to_border(y0, height, border_width, |y| mask.is_on(x0, y));
        let min_y = y0 as f64 - border;
        let shot_height = max_y as f64 - min_y;
        let center_y = min_y + shot_height / 2.0;

        // --- 2. Right Edge ---
        let row = (center_y.max(0.0) as u32).min(height.saturating_sub(1));
        let max_x = scan_to_border(x0, width, border_width, |x| mask.is_on(x, row)) as f64 - border;
        let shot_width = max_x - x0 as f64;
        let center_x = x0 as f64 + shot_width / 2.0;

        CenterEstimate {
            x: center_x,
            y: center_y,
            width: shot_width,
            height: shot_height,
        }
    }

    /// Walks from `start` towards `end` and returns the position at which
    /// `border_width` consecutive off pixels have been seen, or `end` if that
    /// never happens.
    fn scan_to_border(
        start: u32,
        end: u32,
        border_width: u32,
        is_on: impl Fn(u32) -> bool,
    ) -> u32 {
        let mut off_count = 0;
        for position in start..end {
            if is_on(position) {
                off_count = 0;
            } else {
                off_count += 1;
            }
            if off_count == border_width {
                return position;
            }
        }
        end
    }
}
