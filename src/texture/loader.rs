use crate::error::DemoError;
use std::path::Path;

/// Side length of one slice of the colour-grading LUT strip.
pub const LUT_SIZE: u32 = 16;

#[derive(Debug)]
pub enum TextureLoadResult {
    Success {
        texture_id: usize,
        rgba_data: Vec<u8>,
        width: u32,
        height: u32,
    },
    Error {
        texture_id: usize,
        error: String,
    },
}

/// Load texture from local file
pub async fn load_from_file(path: &Path) -> Result<Vec<u8>, DemoError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| DemoError::new("texture-read").with_arg("path", path.display()).push_std(e))
}

/// Decodes any format the `image` crate understands to RGBA8.
pub fn decode_image(data: &[u8]) -> Result<(Vec<u8>, u32, u32), DemoError> {
    let img = image::load_from_memory(data)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

/// Reads and decodes a texture, decoding on the blocking pool.
pub async fn load_texture(path: &Path) -> Result<(Vec<u8>, u32, u32), DemoError> {
    let data = load_from_file(path).await?;
    tokio::task::spawn_blocking(move || decode_image(&data))
        .await
        .map_err(|e| DemoError::new("texture-decode-task").push_std(e))?
}

/// A 256x16 strip LUT that maps every colour to itself: sixteen 16x16 slices
/// along blue, red across each slice, green down.
pub fn identity_lut() -> (Vec<u8>, u32, u32) {
    let width = LUT_SIZE * LUT_SIZE;
    let height = LUT_SIZE;
    let step = 255 / (LUT_SIZE - 1);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x % LUT_SIZE) * step;
            let g = y * step;
            let b = (x / LUT_SIZE) * step;
            data.extend_from_slice(&[r as u8, g as u8, b as u8, 255]);
        }
    }
    (data, width, height)
}

/// Loads a LUT strip, falling back to the identity when the file is missing
/// or has the wrong shape.
pub fn load_lut(path: &Path) -> (Vec<u8>, u32, u32) {
    let loaded = std::fs::read(path)
        .map_err(DemoError::from)
        .and_then(|data| decode_image(&data));
    match loaded {
        Ok((data, w, h)) if w == LUT_SIZE * LUT_SIZE && h == LUT_SIZE => {
            log::info!("LUT loaded: {}", path.display());
            (data, w, h)
        }
        Ok((_, w, h)) => {
            log::warn!("LUT {} is {}x{}, expected 256x16; using identity", path.display(), w, h);
            identity_lut()
        }
        Err(e) => {
            log::warn!("LUT {} not loaded: {}; using identity", path.display(), e);
            identity_lut()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_lut_corners() {
        let (data, w, h) = identity_lut();
        assert_eq!((w, h), (256, 16));
        assert_eq!(data.len(), 256 * 16 * 4);
        let px = |x: u32, y: u32| {
            let i = ((y * w + x) * 4) as usize;
            [data[i], data[i + 1], data[i + 2]]
        };
        assert_eq!(px(0, 0), [0, 0, 0]);
        assert_eq!(px(15, 0), [255, 0, 0]);
        assert_eq!(px(0, 15), [0, 255, 0]);
        assert_eq!(px(255, 15), [255, 255, 255]);
    }

    #[test]
    fn decode_png_roundtrip() {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let (data, w, h) = decode_image(bytes.get_ref()).unwrap();
        assert_eq!((w, h), (2, 3));
        assert_eq!(&data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_lut_falls_back_to_identity() {
        let (_, w, h) = load_lut(Path::new("does/not/exist.png"));
        assert_eq!((w, h), (256, 16));
    }
}
