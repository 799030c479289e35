// THEORY:
// A `Frame` is one captured picture plus the instant it was captured. Frames are
// immutable once built: the pixel data sits behind an `Arc`, so handing a frame to
// the display sink and to a searcher snapshot never copies or mutates it.
//
// Sources hand us either an `image::RgbImage` directly or, like the rest of the
// engine's history, a flat RGBA byte buffer. Both paths end in the same type.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::FrameError;
use image::{GrayImage, Rgb, RgbImage};
use std::sync::Arc;
use tokio::time::Instant;

const RGBA_CHANNELS: usize = 4;

/// An immutable color frame with its capture timestamp.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: Instant) -> Self {
        Self {
            image: Arc::new(image),
            captured_at,
        }
    }

    /// Builds a frame from a raw RGBA buffer laid out row by row.
    pub fn from_rgba(
        width: u32,
        height: u32,
        buffer: &[u8],
        captured_at: Instant,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        let size_error = || FrameError::BufferSize {
            width,
            height,
            expected,
            actual: buffer.len(),
        };
        if buffer.len() != expected {
            return Err(size_error());
        }

        let rgb: Vec<u8> = buffer
            .chunks_exact(RGBA_CHANNELS)
            .filter_map(Pixel::from_bytes)
            .flat_map(|pixel| Rgb::<u8>::from(pixel).0)
            .collect();
        let image = RgbImage::from_raw(width, height, rgb).ok_or_else(size_error)?;
        Ok(Self::new(image, captured_at))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Shared handle to the pixel data, used to build searcher snapshots.
    pub fn shared_image(&self) -> Arc<RgbImage> {
        Arc::clone(&self.image)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        Pixel::from(*self.image.get_pixel(x, y))
    }

    /// The single-channel intensity frame the thresholder works on.
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(self.image.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_keeps_color_and_drops_alpha() {
        let buffer = [10, 20, 30, 255, 40, 50, 60, 0];
        let frame = Frame::from_rgba(2, 1, &buffer, Instant::now()).expect("valid buffer");
        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.pixel(0, 0), Pixel::new(10, 20, 30));
        assert_eq!(frame.pixel(1, 0), Pixel::new(40, 50, 60));
    }

    #[test]
    fn from_rgba_rejects_short_buffers() {
        let err = Frame::from_rgba(2, 2, &[0u8; 12], Instant::now()).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferSize {
                width: 2,
                height: 2,
                expected: 16,
                actual: 12,
            }
        );
    }

    #[test]
    fn white_frame_is_bright_in_gray() {
        let frame = Frame::new(RgbImage::from_pixel(3, 3, Rgb([255, 255, 255])), Instant::now());
        assert!(frame.to_gray().pixels().all(|p| p.0[0] == 255));
    }
}
