//! Image decoding for textures

use std::path::Path;

use super::{AssetError, AssetResult};

/// Decoded image, always expanded to tightly packed RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Pixel bytes, row-major, 4 bytes per pixel
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channel count of the source file before RGBA expansion
    pub channels: u8,
}

impl ImageData {
    /// A 1x1 image of a single color
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            pixels: color.to_vec(),
            width: 1,
            height: 1,
            channels: 4,
        }
    }

    /// Size of the pixel payload in bytes
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Load an image file and convert it to RGBA8
pub fn load_image<P: AsRef<Path>>(path: P) -> AssetResult<ImageData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::FileNotFound { path: path.to_path_buf() });
    }

    let decoded = image::open(path).map_err(|e| AssetError::load_failure(path, e))?;
    let channels = decoded.color().channel_count();
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    if width == 0 || height == 0 {
        return Err(AssetError::load_failure(path, "image has zero extent"));
    }

    log::debug!("Loaded image {} ({width}x{height}, {channels} channels)", path.display());

    Ok(ImageData {
        pixels: rgba.into_raw(),
        width,
        height,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let img = image::RgbImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        img.save(&path).unwrap();

        let data = load_image(&path).unwrap();
        assert_eq!((data.width, data.height, data.channels), (4, 2, 3));
        assert_eq!(data.byte_len(), 4 * 2 * 4);
        assert_eq!(&data.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_missing_image() {
        let result = load_image("definitely/not/here.png");
        assert!(matches!(result, Err(AssetError::FileNotFound { .. })));
    }

    #[test]
    fn test_garbage_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        assert!(matches!(load_image(&path), Err(AssetError::AssetLoadFailure { .. })));
    }
}
