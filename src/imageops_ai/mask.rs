use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, Rgb, Rgba};
use num_traits::AsPrimitive;

use crate::errors::{RembgError, Result};
use crate::imageops_ai::get_max_value;

/// Combine an RGB image with a single-channel mask into RGBA, the mask
/// becoming the alpha channel. Mask values are rescaled from the mask's
/// subpixel range to the image's.
pub fn apply<I, M, SI, SM>(image: &I, mask: &M) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>>
where
    I: GenericImageView<Pixel = Rgb<SI>>,
    M: GenericImageView<Pixel = Luma<SM>>,
    Rgba<SI>: Pixel<Subpixel = SI>,
    SI: Primitive + 'static + AsPrimitive<f32>,
    SM: Primitive + 'static + AsPrimitive<f32>,
    f32: AsPrimitive<SI>,
{
    if image.dimensions() != mask.dimensions() {
        let (iw, ih) = image.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(RembgError::model(
            "mask application",
            format!("image is {iw}x{ih} but mask is {mw}x{mh}"),
        ));
    }

    let sm_max: f32 = get_max_value::<SM>().as_();
    let si_max: f32 = get_max_value::<SI>().as_();

    let processed_pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|(image_pixel, mask_pixel)| {
            let Rgb([red, green, blue]) = image_pixel.2;
            let Luma([alpha]) = mask_pixel.2;
            let alpha = (alpha.as_() / sm_max).clamp(0.0, 1.0) * si_max;
            [red, green, blue, alpha.round().as_()]
        })
        .collect::<Vec<SI>>();

    ImageBuffer::from_raw(image.width(), image.height(), processed_pixels).ok_or_else(|| {
        RembgError::model("mask application", "pixel buffer does not match image size")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_mask_becomes_alpha() -> Result<()> {
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));

        let rgba = apply(&image, &mask)?;
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([10, 20, 30, 0]));
        Ok(())
    }

    #[test]
    fn test_float_mask_is_rescaled() -> Result<()> {
        let image = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let mask = ImageBuffer::from_pixel(1, 1, Luma([0.5f32]));

        let rgba = apply(&image, &mask)?;
        assert_eq!(rgba.get_pixel(0, 0).0[3], 128);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let image = RgbImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(matches!(
            apply(&image, &mask),
            Err(RembgError::Model { .. })
        ));
    }
}
