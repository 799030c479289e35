// THEORY:
// A `Shot` is the only thing the detector ever tells the outside world: "a laser
// of this color hit here". It is a transient value, created by a searcher and
// handed to the shot sink; the detector keeps no record of it.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// The laser colors the classifier can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaserColor {
    Red,
    Green,
}

impl fmt::Display for LaserColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaserColor::Red => write!(f, "red"),
            LaserColor::Green => write!(f, "green"),
        }
    }
}

impl FromStr for LaserColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(LaserColor::Red),
            "green" => Ok(LaserColor::Green),
            _ => Err(ConfigError::LaserColor(s.to_string())),
        }
    }
}

/// A single detected laser hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub color: LaserColor,
    /// Approximate center of the flash, in frame pixels.
    pub x: f64,
    pub y: f64,
    /// The detection cycle that produced this shot. Reports may arrive out of
    /// cycle order; this is how a consumer tells them apart.
    pub cycle: u64,
}
