// THEORY:
// Color classification decides whether a bright spot is a laser at all, and which
// one. A single pixel is too noisy to judge, so the classifier averages a small
// cross-shaped neighborhood around the candidate (the pixel itself plus up to
// `COLOR_DETECTION_RADIUS` pixels left, right, up and down, clipped at the frame
// edges) and then compares channel ratios.
//
// We only call a color when its channel is at least `threshold` times bigger than
// both other channels. Noise tends to have channel values that are very similar,
// so the default 5% margin (1.05) is enough to reject most of it.
//
// A zero denominator is not an error. It only means that branch cannot match.

use crate::core_modules::pixel::pixel::{ComputedChannel, Pixel};
use crate::core_modules::shot::LaserColor;
use image::RgbImage;

pub const COLOR_DETECTION_RADIUS: u32 = 5;
pub const DEFAULT_COLOR_DIFF_THRESHOLD: f64 = 1.05;

/// Mean R, G and B over a set of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelAverage {
    pub red: ComputedChannel,
    pub green: ComputedChannel,
    pub blue: ComputedChannel,
}

impl ChannelAverage {
    pub fn new(red: ComputedChannel, green: ComputedChannel, blue: ComputedChannel) -> Self {
        Self { red, green, blue }
    }

    /// Averages the cross-shaped neighborhood of `radius` around (x, y).
    pub fn around(image: &RgbImage, x: u32, y: u32, radius: u32) -> Self {
        let (width, height) = image.dimensions();
        let sample = |x: u32, y: u32| Pixel::from(*image.get_pixel(x, y));

        let mut samples = vec![sample(x, y)];
        for offset in 1..=radius {
            if x >= offset {
                samples.push(sample(x - offset, y));
            }
            if x + offset < width {
                samples.push(sample(x + offset, y));
            }
            if y >= offset {
                samples.push(sample(x, y - offset));
            }
            if y + offset < height {
                samples.push(sample(x, y + offset));
            }
        }

        Self::of(&samples)
    }

    pub fn of(pixels: &[Pixel]) -> Self {
        if pixels.is_empty() {
            return Self::default();
        }
        let (red, green, blue) = pixels.iter().fold((0.0, 0.0, 0.0), |(r, g, b), pixel| {
            (
                r + pixel.red_computed(),
                g + pixel.green_computed(),
                b + pixel.blue_computed(),
            )
        });
        let count = pixels.len() as ComputedChannel;
        Self::new(red / count, green / count, blue / count)
    }

    /// RED wins when red dominates both other channels by `threshold`, otherwise
    /// GREEN is tried the same way.
    pub fn classify(&self, threshold: f64) -> Option<LaserColor> {
        if dominates(self.red, self.green, self.blue, threshold) {
            return Some(LaserColor::Red);
        }
        if dominates(self.green, self.red, self.blue, threshold) {
            return Some(LaserColor::Green);
        }
        None
    }
}

fn dominates(
    channel: ComputedChannel,
    first: ComputedChannel,
    second: ComputedChannel,
    threshold: f64,
) -> bool {
    if first == 0.0 || second == 0.0 {
        return false;
    }
    channel / first > threshold && channel / second > threshold
}

/// Classifies the laser color around a candidate pixel.
pub fn detect_color(image: &RgbImage, x: u32, y: u32, threshold: f64) -> Option<LaserColor> {
    let average = ChannelAverage::around(image, x, y, COLOR_DETECTION_RADIUS);
    let color = average.classify(threshold);
    if color.is_none() {
        log::debug!(
            "no laser color at ({}, {}): average r={:.1} g={:.1} b={:.1}",
            x,
            y,
            average.red,
            average.green,
            average.blue
        );
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn classifies_reference_colors() {
        let t = DEFAULT_COLOR_DIFF_THRESHOLD;
        assert_eq!(ChannelAverage::new(200.0, 90.0, 80.0).classify(t), Some(LaserColor::Red));
        assert_eq!(ChannelAverage::new(90.0, 90.0, 90.0).classify(t), None);
        assert_eq!(ChannelAverage::new(60.0, 150.0, 70.0).classify(t), Some(LaserColor::Green));
    }

    #[test]
    fn zero_denominator_skips_only_that_branch() {
        // No green: the red branch is skipped and green cannot dominate.
        assert_eq!(ChannelAverage::new(200.0, 0.0, 80.0).classify(1.05), None);
        // No red: the green branch is skipped.
        assert_eq!(ChannelAverage::new(0.0, 200.0, 80.0).classify(1.05), None);
        // No blue: both branches are skipped.
        assert_eq!(ChannelAverage::new(200.0, 90.0, 0.0).classify(1.05), None);
        assert_eq!(ChannelAverage::default().classify(1.05), None);
    }

    #[test]
    fn threshold_margin_is_strict() {
        assert_eq!(ChannelAverage::new(105.0, 100.0, 100.0).classify(1.05), None);
        assert_eq!(ChannelAverage::new(106.0, 100.0, 100.0).classify(1.05), Some(LaserColor::Red));
    }

    #[test]
    fn neighborhood_is_a_clipped_cross() {
        // Only the cross around (0, 0) is red; the diagonal pixel (1, 1) is green.
        let image = RgbImage::from_fn(3, 3, |x, y| {
            if x == 0 || y == 0 { Rgb([200, 90, 80]) } else { Rgb([0, 255, 0]) }
        });
        let average = ChannelAverage::around(&image, 0, 0, COLOR_DETECTION_RADIUS);
        assert_eq!(average, ChannelAverage::new(200.0, 90.0, 80.0));
        assert_eq!(detect_color(&image, 0, 0, 1.05), Some(LaserColor::Red));
    }

    #[test]
    fn neighborhood_averages_center_and_arms() {
        // 11 samples: the center plus 5 right and 5 down (left and up are clipped).
        let image = RgbImage::from_fn(20, 20, |x, y| {
            if x == 0 && y == 0 { Rgb([110, 0, 0]) } else { Rgb([0, 0, 0]) }
        });
        let average = ChannelAverage::around(&image, 0, 0, COLOR_DETECTION_RADIUS);
        assert!((average.red - 10.0).abs() < 1e-9);
    }
}
