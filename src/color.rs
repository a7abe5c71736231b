//! Color types for the monochrome (grayscale) output pipeline.

/// The number of channels (bytes) of an RGB pixel.
pub const RGB_SIZE: usize = 3;

/// Defines a type that represents a color pixel
/// in the RGB format.
pub type Pixel = [u8; RGB_SIZE];
