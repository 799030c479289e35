// THEORY:
// The `SectorGrid` splits the frame into a fixed 3x3 grid of sectors that an
// operator can switch on and off independently (for example to blank out a
// window or a monitor that keeps producing false shots).
//
// Key architectural principles:
// 1.  **Fixed Partition**: Sector bounds come from integer division of the frame
//     size by 3. Remainder pixels on the right and bottom edges belong to no
//     sector and are never searched.
// 2.  **Deterministic Order**: Sectors are always visited row-major, top-left
//     first. Combined with the column-major pixel scan inside a sector this makes
//     "which candidate wins" fully reproducible.
// 3.  **Plain Value**: The grid is a small `Copy` value. Each detection cycle takes
//     its own copy, so an operator toggling sectors never races a running search.

use crate::error::ConfigError;
use std::ops::Range;

pub const SECTOR_ROWS: usize = 3;
pub const SECTOR_COLUMNS: usize = 3;

/// Which of the 3x3 sectors are enabled for detection, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorGrid {
    enabled: [[bool; SECTOR_COLUMNS]; SECTOR_ROWS],
}

/// The pixel bounds of one sector. Ranges are half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorBounds {
    pub row: usize,
    pub col: usize,
    pub x: Range<u32>,
    pub y: Range<u32>,
}

impl SectorBounds {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.x.contains(&x) && self.y.contains(&y)
    }
}

impl Default for SectorGrid {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl SectorGrid {
    pub fn all_enabled() -> Self {
        Self {
            enabled: [[true; SECTOR_COLUMNS]; SECTOR_ROWS],
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            enabled: [[false; SECTOR_COLUMNS]; SECTOR_ROWS],
        }
    }

    pub fn from_statuses(enabled: [[bool; SECTOR_COLUMNS]; SECTOR_ROWS]) -> Self {
        Self { enabled }
    }

    pub fn statuses(&self) -> [[bool; SECTOR_COLUMNS]; SECTOR_ROWS] {
        self.enabled
    }

    pub fn is_enabled(&self, row: usize, col: usize) -> bool {
        self.enabled
            .get(row)
            .and_then(|cols| cols.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, row: usize, col: usize, enabled: bool) -> Result<(), ConfigError> {
        let slot = self
            .enabled
            .get_mut(row)
            .and_then(|cols| cols.get_mut(col))
            .ok_or(ConfigError::Sector { row, col })?;
        *slot = enabled;
        Ok(())
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled.iter().flatten().filter(|&&on| on).count()
    }

    /// Bounds of every sector for a frame of the given size, row-major.
    /// A frame narrower or shorter than the grid has no sectors.
    pub fn sectors(width: u32, height: u32) -> Vec<SectorBounds> {
        let sub_width = width / SECTOR_COLUMNS as u32;
        let sub_height = height / SECTOR_ROWS as u32;
        if sub_width == 0 || sub_height == 0 {
            return Vec::new();
        }

        let mut bounds = Vec::with_capacity(SECTOR_ROWS * SECTOR_COLUMNS);
        for row in 0..SECTOR_ROWS {
            for col in 0..SECTOR_COLUMNS {
                let x_start = col as u32 * sub_width;
                let y_start = row as u32 * sub_height;
                bounds.push(SectorBounds {
                    row,
                    col,
                    x: x_start..x_start + sub_width,
                    y: y_start..y_start + sub_height,
                });
            }
        }
        bounds
    }

    /// Bounds of the enabled sectors only, in scan order.
    pub fn enabled_sectors(&self, width: u32, height: u32) -> Vec<SectorBounds> {
        Self::sectors(width, height)
            .into_iter()
            .filter(|sector| self.is_enabled(sector.row, sector.col))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_pixels_belong_to_no_sector() {
        let sectors = SectorGrid::sectors(10, 11);
        assert_eq!(sectors.len(), 9);
        let last = sectors.last().unwrap();
        assert_eq!((last.row, last.col), (2, 2));
        assert_eq!(last.x, 6..9);
        assert_eq!(last.y, 6..9);
        assert!(sectors.iter().all(|s| !s.contains(9, 0) && !s.contains(0, 9)));
    }

    #[test]
    fn sectors_are_row_major() {
        let order: Vec<(usize, usize)> = SectorGrid::sectors(640, 480)
            .iter()
            .map(|s| (s.row, s.col))
            .collect();
        assert_eq!(order[..4], [(0, 0), (0, 1), (0, 2), (1, 0)]);
        let center = &SectorGrid::sectors(640, 480)[4];
        assert_eq!(center.x, 213..426);
        assert_eq!(center.y, 160..320);
    }

    #[test]
    fn tiny_frames_have_no_sectors() {
        assert!(SectorGrid::sectors(2, 100).is_empty());
        assert!(SectorGrid::sectors(100, 0).is_empty());
    }

    #[test]
    fn toggling_sectors() {
        let mut grid = SectorGrid::all_disabled();
        grid.set(1, 2, true).unwrap();
        assert!(grid.is_enabled(1, 2));
        assert_eq!(grid.enabled_count(), 1);
        assert_eq!(grid.set(3, 0, true), Err(ConfigError::Sector { row: 3, col: 0 }));

        let enabled = grid.enabled_sectors(9, 9);
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].x, 6..9);
        assert_eq!(enabled[0].y, 3..6);
    }
}
