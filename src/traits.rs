use crate::errors::Result;
use image::DynamicImage;

/// Abstraction over the background-removal capability.
///
/// The processor depends on this trait rather than on the ONNX session, so the
/// pipeline can be exercised with mock models that need no model file.
pub trait BackgroundRemovalModel {
    /// Return a copy of `img` whose background pixels have alpha set to zero.
    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage>;
}

impl<M: BackgroundRemovalModel + ?Sized> BackgroundRemovalModel for &M {
    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        (**self).remove_background(img)
    }
}
