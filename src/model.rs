use std::{fmt, path::Path};

use crate::{
    errors::{RembgError, Result},
    imageops_ai::mask,
    traits::BackgroundRemovalModel,
};
use clap::ValueEnum;
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, GrayImage, Luma, RgbImage};
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Background-removal networks with a known ONNX export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModelKind {
    /// General purpose U²-Net
    #[default]
    #[value(name = "u2net")]
    U2net,
    /// Lightweight U²-Net, faster and less accurate
    #[value(name = "u2netp")]
    U2netp,
    /// U²-Net trained for human segmentation
    #[value(name = "u2net_human_seg")]
    U2netHumanSeg,
    /// Pruned U²-Net
    #[value(name = "silueta")]
    Silueta,
    /// IS-Net general use
    #[value(name = "isnet-general-use")]
    IsnetGeneralUse,
}

impl ModelKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::U2net => "u2net",
            Self::U2netp => "u2netp",
            Self::U2netHumanSeg => "u2net_human_seg",
            Self::Silueta => "silueta",
            Self::IsnetGeneralUse => "isnet-general-use",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.onnx", self.name())
    }

    /// Input side length used when the model file declares a dynamic shape.
    pub const fn default_image_size(self) -> u32 {
        match self {
            Self::IsnetGeneralUse => 1024,
            _ => 320,
        }
    }

    /// Per-channel `(mean, std)` applied after scaling pixels to `[0, 1]`.
    pub const fn normalization(self) -> ([f32; 3], [f32; 3]) {
        match self {
            Self::IsnetGeneralUse => ([0.5, 0.5, 0.5], [1.0, 1.0, 1.0]),
            _ => ([0.485, 0.456, 0.406], [0.229, 0.224, 0.225]),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Model {
    pub image_size: u32,
    kind: ModelKind,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, kind: ModelKind, device_id: i32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(RembgError::Configuration {
                message: format!(
                    "model file {} does not exist; download {} or pass --model-path",
                    model_path.display(),
                    kind.file_name()
                ),
            });
        }
        info!("Loading {} model from {}", kind, model_path.display());

        let session = SessionBuilder::new()
            .map_err(|e| RembgError::model("session builder init", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| RembgError::model("execution provider setup", e))?
            .with_memory_pattern(true)
            .map_err(|e| RembgError::model("memory pattern setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                RembgError::model(
                    format!("model load: {}", model_path.display()),
                    e,
                )
            })?;

        let input = session.inputs.first().ok_or_else(|| {
            RembgError::model("model input lookup", "model declares no inputs")
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            RembgError::model("model output lookup", "model declares no outputs")
        })?;

        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&side| side > 0)
            .map_or(kind.default_image_size(), |side| side as u32);
        let input_name = input.name.clone();
        let output_name = output.name.clone();
        debug!(
            "Model input `{}` ({}x{}), output `{}`",
            input_name, image_size, image_size, output_name
        );

        let model = Self {
            image_size,
            kind,
            input_name,
            output_name,
            session: Mutex::new(session),
        };

        // initialize model
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        model.run(data.view())?;

        Ok(model)
    }

    fn run(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl BackgroundRemovalModel for Model {
    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let rgb_img = img.to_rgb8();
        let tensor = preprocess(&rgb_img, self.image_size, self.kind);
        let prediction = self.run(tensor.view())?;
        let (width, height) = img.dimensions();

        let alpha = postprocess_mask(prediction.view(), width, height)?;
        let result = mask::apply(&rgb_img, &alpha)?;
        Ok(DynamicImage::ImageRgba8(result))
    }
}

/// Resize to the model's square input and normalise into an NCHW tensor.
///
/// Pixels are divided by the brightest channel value of the resized image
/// before the per-channel mean/std normalisation.
pub fn preprocess(image: &RgbImage, image_size: u32, kind: ModelKind) -> Array4<f32> {
    let resized = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let max = f32::from(resized.as_raw().iter().copied().max().unwrap_or(0).max(1));
    let (mean, std) = kind.normalization();
    let side = image_size as usize;

    Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        let value = f32::from(resized.get_pixel(x as u32, y as u32).0[c]) / max;
        (value - mean[c]) / std[c]
    })
}

/// Turn the first prediction channel into an 8-bit mask of the source size.
///
/// The prediction is min-max normalised first; a flat prediction yields an
/// all-zero mask.
pub fn postprocess_mask(prediction: ArrayView4<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let (batch, channels, mask_height, mask_width) = prediction.dim();
    if batch == 0 || channels == 0 {
        return Err(RembgError::model(
            "mask postprocessing",
            format!("unexpected prediction shape {:?}", prediction.shape()),
        ));
    }

    let pred = prediction.slice(s![0, 0, .., ..]);
    let (min, max) = pred
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let mask = GrayImage::from_fn(mask_width as u32, mask_height as u32, |x, y| {
        let v = pred[[y as usize, x as usize]];
        let normalized = if range > 0.0 { (v - min) / range } else { 0.0 };
        Luma([(normalized * 255.0) as u8])
    });

    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}
