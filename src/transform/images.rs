use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use crate::config::Config;
use crate::task::{Artifact, ArtifactData, Selector, Task, rebase};

/// Errors that can occur when processing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// An error occurred during image decoding or encoding.
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

const JPEG_QUALITY: u8 = 80;

/// Mirror the image tree into `img/`, re-encoding the raster formats the
/// encoder covers and passing everything else through byte for byte.
pub fn task(config: &Config) -> Task {
    let base = config.src_dir("img");
    let watch = format!("{base}/**/*");
    let patterns = [
        "**/*.jpg", "**/*.jpeg", "**/*.png", "**/*.gif", "**/*.svg", "**/*.ico",
    ];

    Task::new(
        "images",
        Selector::new(base.clone(), patterns),
        config.build_dir("img"),
    )
    .step("optimize", move |_, artifacts| {
        artifacts
            .into_iter()
            .map(|artifact| {
                let rel = rebase(&artifact.path, &base);

                let data = match artifact.path.extension() {
                    Some("jpg" | "jpeg") => encode_jpeg(artifact.data.as_bytes())?,
                    Some("png") => encode_png(artifact.data.as_bytes())?,
                    _ => match artifact.data {
                        ArtifactData::Binary(data) => data,
                        ArtifactData::Utf8(text) => text.into_bytes(),
                    },
                };

                Ok(Artifact::binary(rel, data))
            })
            .collect()
    })
    .watch(watch)
}

fn encode_jpeg(buffer: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(buffer)?;
    let mut out = Vec::new();

    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
        img.to_rgb8().as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;

    Ok(out)
}

fn encode_png(buffer: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(buffer)?;
    let mut out = Vec::new();

    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            img.to_rgba8().as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )?;

    Ok(out)
}
