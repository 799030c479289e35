// THEORY:
// The thresholder is the first stage of every detection cycle. A laser flash is
// the brightest thing in view, so the cheapest useful question to ask of every
// pixel is "is it brighter than the cutoff?". The answer is a `BinaryMask`; all
// later stages work on masks and never look at intensity again.

use crate::core_modules::frame::Frame;
use crate::core_modules::mask::BinaryMask;
use image::GrayImage;

/// Marks every pixel strictly brighter than `cutoff` as on.
pub fn threshold(gray: &GrayImage, cutoff: u8) -> BinaryMask {
    BinaryMask::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] > cutoff
    })
}

/// Grayscale conversion followed by `threshold`.
pub fn threshold_frame(frame: &Frame, cutoff: u8) -> BinaryMask {
    threshold(&frame.to_gray(), cutoff)
}
