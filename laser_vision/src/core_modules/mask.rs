// THEORY:
// A `BinaryMask` is the on/off picture produced once per detection cycle. The
// thresholder produces one for "bright right now", the background model produces
// one for "newly bright". Masks are immutable once built; every stage that needs a
// different mask builds a new one.

use image::{GrayImage, Luma};

const ON: u8 = 1;
const OFF: u8 = 0;

/// An immutable W x H grid of on/off pixels stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl BinaryMask {
    /// A mask with every pixel off.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![OFF; width as usize * height as usize],
        }
    }

    /// Builds a mask by asking `is_on` about every pixel.
    pub fn from_fn(width: u32, height: u32, mut is_on: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(if is_on(x, y) { ON } else { OFF });
            }
        }
        Self { width, height, bits }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the pixel at (x, y) is on. Out-of-bounds pixels read as off.
    #[inline]
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[self.index(x, y)] == ON
    }

    /// Row-major 0/1 values, one per pixel.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn count_on(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit == ON).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&bit| bit == OFF)
    }

    /// Renders the mask as a displayable image: on is white, off is black.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_on(x, y) { Luma([255]) } else { Luma([0]) }
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
