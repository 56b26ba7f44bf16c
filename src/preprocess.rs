use rayon::prelude::*;
use image::DynamicImage;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use tracing::debug;

use crate::config::DEFAULT_INPUT_SIZE;
use crate::error::{ClassifierError, Result};

/// Model input, laid out as `[1, S, S, 3]` (batch, height, width, channel).
pub type Tensor = ndarray::Array4<f32>;

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl PreprocessConfig {
    /// Square `size x size` RGB input.
    pub fn square(size: u32) -> Self {
        Self {
            height: size as usize,
            width: size as usize,
            channels: 3,
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::square(DEFAULT_INPUT_SIZE)
    }
}

#[derive(Debug, Clone)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Shape every tensor produced by [`Processor::preprocess`] has.
    pub fn output_shape(&self) -> [usize; 4] {
        [1, self.config.height, self.config.width, self.config.channels]
    }

    /// Stretch the image to the configured size with bilinear filtering and
    /// scale each channel to `[0, 1]`.
    ///
    /// The aspect ratio is not preserved; there is no padding or cropping.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Tensor> {
        let (orig_width, orig_height) = (image.width(), image.height());
        if orig_width == 0 || orig_height == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "image has zero dimension ({orig_width}x{orig_height})"
            )));
        }

        let t = std::time::Instant::now();
        let src = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut dst_image = Image::new(
            self.config.width as u32,
            self.config.height as u32,
            PixelType::U8x3,
        );
        let resize_options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        Resizer::new()
            .resize(&src, &mut dst_image, &resize_options)
            .map_err(|e| ClassifierError::InvalidInput(format!("resize failed: {e}")))?;
        debug!(
            from = ?(orig_width, orig_height),
            to = ?(self.config.width, self.config.height),
            elapsed = ?t.elapsed(),
            "resized image"
        );

        let t = std::time::Instant::now();
        let values: Vec<f32> = dst_image
            .buffer()
            .iter()
            .map(|&channel| channel as f32 / 255.0)
            .collect();
        let tensor = Tensor::from_shape_vec(
            (1, self.config.height, self.config.width, self.config.channels),
            values,
        )
        .map_err(|e| ClassifierError::InvalidInput(format!("tensor shape mismatch: {e}")))?;
        debug!(elapsed = ?t.elapsed(), "normalized pixels");

        Ok(tensor)
    }

    /// Preprocess several images in parallel. Each entry fails or succeeds on
    /// its own.
    pub fn preprocess_batch(&self, images: &[DynamicImage]) -> Vec<Result<Tensor>> {
        images.par_iter().map(|x| self.preprocess(x)).collect()
    }
}

/// Wrap a raw, tightly packed RGB buffer as an image.
pub fn rgb_image_from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<DynamicImage> {
    let expected = width as usize * height as usize * 3;
    if pixels.len() != expected {
        return Err(ClassifierError::InvalidInput(format!(
            "pixel buffer holds {} bytes, {width}x{height}x3 needs {expected}",
            pixels.len()
        )));
    }
    image::RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| ClassifierError::InvalidInput("pixel buffer rejected".to_string()))
}
