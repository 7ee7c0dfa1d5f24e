//! Image decode/encode helpers shared by the API boundary and the worker.

use std::io::Cursor;

use image::{ImageFormat, ImageReader, RgbImage};

use crate::error::CoreError;

/// Decode raw uploaded bytes into an RGB8 image.
///
/// The format is sniffed from the bytes (PNG, JPEG, WebP). Alpha is
/// dropped; the inference models expect three channels.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, CoreError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoreError::InvalidImage(e.to_string()))?;

    let decoded = reader
        .decode()
        .map_err(|e| CoreError::InvalidImage(e.to_string()))?;

    Ok(decoded.to_rgb8())
}

/// Encode an RGB8 image as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, CoreError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CoreError::Internal(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}
