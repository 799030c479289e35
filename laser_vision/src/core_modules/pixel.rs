// THEORY (Single Pixel):
// The `Pixel` module is the most fundamental unit of the detector. It is a "dumb"
// data container for one RGB sample plus the handful of single-pixel helpers the
// color classifier needs. Anything that needs more than one pixel (neighborhood
// averages, blob edges) belongs in higher-level modules like `color` or
// `shot_searcher`.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors or history.
// 2) Alpha is dropped at the frame boundary. A laser flash is judged on R, G and B only.

pub mod pixel {
    use image::Rgb;

    pub type Byte = u8;
    pub type Channel = Byte;
    pub type ComputedChannel = f64;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Builds a pixel from the first three bytes of an RGB or RGBA quad.
        /// Returns `None` when fewer than three bytes are given.
        pub fn from_bytes(bytes: &[Byte]) -> Option<Self> {
            match bytes {
                [red, green, blue, ..] => Some(Pixel::new(*red, *green, *blue)),
                _ => None,
            }
        }

        pub fn red_computed(&self) -> ComputedChannel {
            self.red as ComputedChannel
        }

        pub fn green_computed(&self) -> ComputedChannel {
            self.green as ComputedChannel
        }

        pub fn blue_computed(&self) -> ComputedChannel {
            self.blue as ComputedChannel
        }
    }

    impl From<Rgb<Channel>> for Pixel {
        fn from(rgb: Rgb<Channel>) -> Self {
            let [red, green, blue] = rgb.0;
            Pixel::new(red, green, blue)
        }
    }

    impl From<Pixel> for Rgb<Channel> {
        fn from(pixel: Pixel) -> Self {
            Rgb([pixel.red, pixel.green, pixel.blue])
        }
    }

}
