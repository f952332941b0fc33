//! Recompression: the operation that turns an asset into a smaller re-encoded copy.
//!
//! The optimizer only depends on the [`Recompressor`] trait, so a different
//! encoder can be swapped in without touching the engine.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Re-encodes a single image file.
#[async_trait]
pub trait Recompressor: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Write a recompressed copy of `input` into `output_dir` and return its path.
    ///
    /// `quality` is in 1..=100; how it maps onto the encoder is up to the
    /// implementation. The input file must be left untouched.
    async fn recompress(
        &self,
        input: &Path,
        output_dir: &Path,
        quality: u8,
    ) -> Result<PathBuf, AssetError>;
}

/// Default recompressor built on the `image` crate.
///
/// JPEGs are re-encoded at the requested quality. PNGs are losslessly
/// re-encoded with maximum compression and adaptive filtering.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRecompressor;

impl ImageRecompressor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous decode + encode (runs in spawn_blocking).
    fn recompress_sync(input: &Path, output: &Path, quality: u8) -> Result<(), AssetError> {
        let fail = |message: String| AssetError::Recompress {
            path: input.to_path_buf(),
            message,
        };

        let format = ImageFormat::from_path(input)
            .map_err(|e| fail(format!("Cannot determine format: {e}")))?;
        let image = image::open(input).map_err(|e| fail(e.to_string()))?;

        let file = File::create(output).map_err(|e| fail(format!("Cannot create output: {e}")))?;
        let mut writer = BufWriter::new(file);

        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
                rgb.write_with_encoder(encoder)
                    .map_err(|e| fail(e.to_string()))?;
            }
            ImageFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut writer,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| fail(e.to_string()))?;
            }
            other => {
                return Err(fail(format!("Unsupported format: {other:?}")));
            }
        }

        std::io::Write::flush(&mut writer).map_err(|e| fail(format!("Cannot flush output: {e}")))
    }
}

#[async_trait]
impl Recompressor for ImageRecompressor {
    fn name(&self) -> &str {
        "image"
    }

    async fn recompress(
        &self,
        input: &Path,
        output_dir: &Path,
        quality: u8,
    ) -> Result<PathBuf, AssetError> {
        let file_name = input.file_name().ok_or_else(|| AssetError::Recompress {
            path: input.to_path_buf(),
            message: "Path has no file name".to_string(),
        })?;
        let output = output_dir.join(file_name);

        let input_owned = input.to_path_buf();
        let output_owned = output.clone();
        tokio::task::spawn_blocking(move || {
            Self::recompress_sync(&input_owned, &output_owned, quality)
        })
        .await
        .map_err(|e| AssetError::Recompress {
            path: input.to_path_buf(),
            message: format!("Task join error: {e}"),
        })??;

        Ok(output)
    }
}
