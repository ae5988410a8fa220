use image::{DynamicImage, GenericImageView, Pixel, Primitive};

/// Smallest rectangle `[x, y, width, height]` enclosing every pixel whose
/// alpha is non-zero, or `None` when the image is fully transparent.
///
/// Images without an alpha channel report full alpha everywhere, so their box
/// is the whole image.
pub fn alpha_bounding_box<I, P, S>(image: &I) -> Option<[u32; 4]>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (width, height) = image.dimensions();
    let mut bounds = [width, height, 0, 0]; // [x1, y1, x2, y2], inclusive
    let mut found = false;

    for (x, y, pixel) in image.pixels() {
        let alpha = pixel.to_luma_alpha().0[1];
        if alpha > S::zero() {
            update_bounds(&mut bounds, x, y);
            found = true;
        }
    }

    found.then(|| {
        [
            bounds[0],
            bounds[1],
            bounds[2] - bounds[0] + 1,
            bounds[3] - bounds[1] + 1,
        ]
    })
}

/// Crop `image` to its alpha bounding box.
///
/// Returns `None` when there is nothing to keep; the caller leaves the image
/// as it is in that case.
pub fn trim_transparent(image: &DynamicImage) -> Option<DynamicImage> {
    let [x, y, w, h] = alpha_bounding_box(image)?;
    Some(image.crop_imm(x, y, w, h))
}

fn update_bounds(bounds: &mut [u32; 4], x: u32, y: u32) {
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].min(y);
    bounds[2] = bounds[2].max(x);
    bounds[3] = bounds[3].max(y);
}
