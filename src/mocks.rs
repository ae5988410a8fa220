use crate::errors::{RembgError, Result};
use crate::traits::BackgroundRemovalModel;
use image::{DynamicImage, GenericImageView, Rgba};
use std::cell::Cell;

/// Foreground the mock model keeps opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockForeground {
    /// Every pixel stays opaque.
    Everything,
    /// Only the `[x, y, width, height]` rectangle stays opaque.
    Rect([u32; 4]),
    /// Every pixel becomes transparent.
    Nothing,
    /// The model fails.
    Error,
}

/// Mock background-removal model for tests.
#[derive(Debug)]
pub struct MockRemovalModel {
    foreground: MockForeground,
    calls: Cell<usize>,
}

impl MockRemovalModel {
    pub const fn new(foreground: MockForeground) -> Self {
        Self {
            foreground,
            calls: Cell::new(0),
        }
    }

    /// Number of images passed to `remove_background` so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl BackgroundRemovalModel for MockRemovalModel {
    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        self.calls.set(self.calls.get() + 1);

        let mut rgba = img.to_rgba8();
        let keep: Box<dyn Fn(u32, u32) -> bool> = match self.foreground {
            MockForeground::Everything => Box::new(|_, _| true),
            MockForeground::Nothing => Box::new(|_, _| false),
            MockForeground::Rect([rx, ry, rw, rh]) => {
                Box::new(move |x, y| x >= rx && x < rx + rw && y >= ry && y < ry + rh)
            }
            MockForeground::Error => {
                let (width, height) = img.dimensions();
                return Err(RembgError::model(
                    "mock inference",
                    format!("refusing {width}x{height} image"),
                ));
            }
        };

        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let Rgba([r, g, b, _]) = *pixel;
            let alpha = if keep(x, y) { 255 } else { 0 };
            *pixel = Rgba([r, g, b, alpha]);
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

/// Mock that keeps the whole image opaque.
pub const fn create_mock_model() -> MockRemovalModel {
    MockRemovalModel::new(MockForeground::Everything)
}
