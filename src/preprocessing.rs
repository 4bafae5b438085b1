use image::{imageops::FilterType, ImageReader};
use ndarray::{Array, Ix4};
use std::path::Path;
use thiserror::Error;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 254;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Error reading image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decodes the image at `path` and turns it into a `(1, 254, 254, 3)` tensor
/// with channel values scaled to `[0, 1]`.
///
/// The format is sniffed from the file content, so the extension of the
/// transient file does not have to match the upload. Resizing ignores the
/// aspect ratio and uses nearest-neighbour sampling.
pub fn load_image_tensor(path: &Path) -> Result<Array<f32, Ix4>, PreprocessError> {
    let original_img = ImageReader::open(path)?.with_guessed_format()?.decode()?;

    let img = original_img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
        .to_rgb8();

    let side = INPUT_SIZE as usize;
    let mut input = Array::zeros((1, side, side, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input[[0, y, x, 0]] = (r as f32) / 255.;
        input[[0, y, x, 1]] = (g as f32) / 255.;
        input[[0, y, x, 2]] = (b as f32) / 255.;
    }

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};
    use std::io::Write;
    use std::path::PathBuf;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: Rgb<u8>) -> PathBuf {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, color);
        let path = dir.join(name);
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_load_image_tensor_shape_and_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "plant.png", 100, 60, Rgb([255, 0, 51]));

        let input = load_image_tensor(&path).unwrap();

        assert_eq!(input.shape(), &[1, 254, 254, 3]);
        assert_eq!(input[[0, 0, 0, 0]], 1.0);
        assert_eq!(input[[0, 253, 253, 1]], 0.0);
        assert!((input[[0, 120, 30, 2]] - 0.2).abs() < 1e-6);
        assert!(input.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_format_is_guessed_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "plant.png", 10, 10, Rgb([0, 255, 0]));
        let disguised = dir.path().join("upload.jpg");
        std::fs::copy(&png, &disguised).unwrap();

        let input = load_image_tensor(&disguised).unwrap();

        assert_eq!(input[[0, 10, 10, 1]], 1.0);
    }

    #[test]
    fn test_alpha_channel_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_pixel(8, 8, Rgba([0, 0, 255, 10]));
        let path = dir.path().join("transparent.png");
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();

        let input = load_image_tensor(&path).unwrap();

        assert_eq!(input.shape(), &[1, 254, 254, 3]);
        assert_eq!(input[[0, 5, 5, 2]], 1.0);
    }

    #[test]
    fn test_undecodable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"definitely not an image").unwrap();

        let result = load_image_tensor(&path);

        assert!(matches!(result, Err(PreprocessError::Decode(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = load_image_tensor(&dir.path().join("gone.jpg"));

        assert!(matches!(result, Err(PreprocessError::Read(_))));
    }
}
