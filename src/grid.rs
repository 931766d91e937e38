//! Pixel grid - an 8-bit RGB image, read-only during sampling

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::pipeline::VerifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(p: image::Rgb<u8>) -> Self {
        let [r, g, b] = p.0;
        Self::new(r, g, b)
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(p: Rgb) -> Self {
        image::Rgb(p.channels())
    }
}

/// A decoded image with non-zero dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    image: RgbImage,
}

impl PixelGrid {
    pub fn from_image(image: RgbImage) -> Result<Self, VerifyError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VerifyError::InvalidImage(format!(
                "image must have positive dimensions, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    /// Build from packed 8-bit RGB bytes (three bytes per pixel, row-major).
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, VerifyError> {
        let expected = width as usize * height as usize * 3;
        let image = RgbImage::from_raw(width, height, bytes.to_vec()).filter(|_| bytes.len() == expected);
        match image {
            Some(image) => Self::from_image(image),
            None => Err(VerifyError::InvalidImage(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                bytes.len()
            ))),
        }
    }

    /// A grid filled by `f(x, y)`. Handy for synthetic images.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgb) -> Result<Self, VerifyError> {
        Self::from_image(RgbImage::from_fn(width, height, |x, y| f(x, y).into()))
    }

    /// Wraps a buffer derived from an existing grid, so dimensions are
    /// already non-zero.
    pub(crate) fn wrap(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// # Panics
    /// If `(x, y)` lies outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        assert!(
            x < self.width() && y < self.height(),
            "pixel ({}, {}) outside {}x{} grid",
            x,
            y,
            self.width(),
            self.height()
        );
        (*self.image.get_pixel(x, y)).into()
    }

    /// # Panics
    /// If `(x, y)` lies outside the grid.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: Rgb) {
        self.image.put_pixel(x, y, rgb.into());
    }
}
