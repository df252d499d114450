//! Texture decoding

use crate::backend::types::TextureFormat;
use crate::error::ImageLoadError;
use image::{DynamicImage, GenericImageView, ImageError};
use std::path::Path;

/// Decoded RGBA8 texture data ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P, format: TextureFormat) -> Result<Self, ImageLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ImageLoadError::NotFound);
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(classify)?;
        Ok(Self::from_image(img, &name, format))
    }

    /// Load texture from encoded bytes
    pub fn from_bytes(bytes: &[u8], name: &str, format: TextureFormat) -> Result<Self, ImageLoadError> {
        let img = image::load_from_memory(bytes).map_err(classify)?;
        Ok(Self::from_image(img, name, format))
    }

    fn from_image(img: DynamicImage, name: &str, format: TextureFormat) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            format,
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a checkerboard texture
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: "checkerboard".to_string(),
        }
    }

    /// Size of the pixel data in bytes
    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }
}

fn classify(err: ImageError) -> ImageLoadError {
    match err {
        ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ImageLoadError::NotFound
        }
        ImageError::Unsupported(e) => ImageLoadError::UnsupportedFormat(e.to_string()),
        other => ImageLoadError::Decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let err = TextureData::from_file("does/not/exist.png", TextureFormat::Rgba8UnormSrgb)
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::NotFound));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = TextureData::from_bytes(b"definitely not an image", "junk", TextureFormat::Rgba8Unorm)
            .unwrap_err();
        assert!(matches!(
            err,
            ImageLoadError::UnsupportedFormat(_) | ImageLoadError::Decode(_)
        ));
    }

    #[test]
    fn test_checkerboard_layout() {
        let tex = TextureData::checkerboard(16, [255, 255, 255, 255], [0, 0, 0, 255]);
        assert_eq!(tex.byte_len(), 16 * 16 * 4);
        assert_eq!(&tex.data[0..4], &[255, 255, 255, 255]);
        // Pixel (8, 0) falls in the second tile.
        assert_eq!(&tex.data[8 * 4..8 * 4 + 4], &[0, 0, 0, 255]);
    }
}
