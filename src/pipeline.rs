//! # Image Pipeline
//!
//! Deterministic, pure image preparation for both printer families
//! (§4.3). Canon Ivy 2 needs a geometric transform before transfer;
//! Kodak Step only needs format/size validation.

use image::{imageops, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::DriverError;

/// Canon Ivy 2's fixed print dimensions (§4.3).
pub const CANON_PRINT_WIDTH: u32 = 640;
pub const CANON_PRINT_HEIGHT: u32 = 1616;

/// The canvas Canon source images are fit into before the final resample
/// (§4.3 step 2).
const CANON_CANVAS_WIDTH: u32 = 1280;
const CANON_CANVAS_HEIGHT: u32 = 1920;

/// Kodak's maximum accepted JPEG size (§3, §4.3).
pub const KODAK_MAX_JPEG_BYTES: usize = 2 * 1024 * 1024;

/// How to fit a source image into the Canon canvas when its aspect ratio
/// does not match (§4.3 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Preserve the whole image, centered, with letterbox padding.
    Letterbox,
    /// Fill the canvas completely, center-cropping the overflow.
    AutoCrop,
}

/// Prepare a source image for printing on a Canon Ivy 2 (§4.3).
///
/// 1. Decode `source`.
/// 2. Fit it into a 1280×1920 canvas, centered, per `fit`.
/// 3. Resample to 640×1616 with Lanczos3.
/// 4. Rotate 180°.
/// 5. Re-encode as JPEG at maximum quality.
///
/// Returns the encoded JPEG bytes; their length is what feeds the 32-bit
/// `PrintReady` size field.
pub fn prepare_canon_image(source: &[u8], fit: FitMode) -> Result<Vec<u8>, DriverError> {
    let img = image::load_from_memory(source)
        .map_err(|e| DriverError::InvalidImage(format!("failed to decode source image: {e}")))?;

    let canvas = fit_to_canvas(&img, CANON_CANVAS_WIDTH, CANON_CANVAS_HEIGHT, fit);

    let resized = imageops::resize(
        &canvas,
        CANON_PRINT_WIDTH,
        CANON_PRINT_HEIGHT,
        imageops::FilterType::Lanczos3,
    );

    let rotated = imageops::rotate180(&resized);

    // JPEG has no alpha channel; the encoder rejects Rgba8 outright, so
    // drop the alpha before re-encoding.
    let rgb = DynamicImage::ImageRgba8(rotated).to_rgb8();

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .map_err(|e| DriverError::InvalidImage(format!("failed to re-encode JPEG: {e}")))?;

    Ok(out)
}

/// Fit `img` into a `canvas_width`×`canvas_height` canvas, centered.
fn fit_to_canvas(
    img: &DynamicImage,
    canvas_width: u32,
    canvas_height: u32,
    fit: FitMode,
) -> image::RgbaImage {
    let (src_w, src_h) = img.dimensions();
    let mut canvas = image::RgbaImage::new(canvas_width, canvas_height);

    match fit {
        FitMode::Letterbox => {
            let scale = (canvas_width as f64 / src_w as f64).min(canvas_height as f64 / src_h as f64);
            let new_w = (src_w as f64 * scale).round().max(1.0) as u32;
            let new_h = (src_h as f64 * scale).round().max(1.0) as u32;
            let scaled = img.resize_exact(new_w, new_h, imageops::FilterType::Lanczos3);
            let x = (canvas_width.saturating_sub(new_w)) / 2;
            let y = (canvas_height.saturating_sub(new_h)) / 2;
            imageops::overlay(&mut canvas, &scaled.to_rgba8(), x as i64, y as i64);
        }
        FitMode::AutoCrop => {
            let scale = (canvas_width as f64 / src_w as f64).max(canvas_height as f64 / src_h as f64);
            let new_w = (src_w as f64 * scale).round().max(1.0) as u32;
            let new_h = (src_h as f64 * scale).round().max(1.0) as u32;
            let scaled = img.resize_exact(new_w, new_h, imageops::FilterType::Lanczos3);
            let crop_x = (new_w.saturating_sub(canvas_width)) / 2;
            let crop_y = (new_h.saturating_sub(canvas_height)) / 2;
            let cropped = imageops::crop_imm(&scaled, crop_x, crop_y, canvas_width, canvas_height);
            imageops::overlay(&mut canvas, &cropped.to_image(), 0, 0);
        }
    }

    canvas
}

/// Validate a Kodak JPEG input: must start `FF D8`, end `FF D9`, and be
/// no larger than 2 MiB (§4.3). No geometric transform is applied — the
/// bytes are used verbatim.
pub fn validate_kodak_image(jpeg: &[u8]) -> Result<(), DriverError> {
    if jpeg.len() > KODAK_MAX_JPEG_BYTES {
        return Err(DriverError::InvalidImage(format!(
            "image is {} bytes, exceeds the {}-byte Kodak limit",
            jpeg.len(),
            KODAK_MAX_JPEG_BYTES
        )));
    }
    if jpeg.len() < 4 || &jpeg[0..2] != [0xFF, 0xD8] || &jpeg[jpeg.len() - 2..] != [0xFF, 0xD9] {
        return Err(DriverError::InvalidImage(
            "not a valid JPEG (missing FF D8/FF D9 markers)".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jpeg(len: usize) -> Vec<u8> {
        let mut v = vec![0u8; len];
        v[0] = 0xFF;
        v[1] = 0xD8;
        v[len - 2] = 0xFF;
        v[len - 1] = 0xD9;
        v
    }

    #[test]
    fn test_validate_kodak_accepts_well_formed_jpeg() {
        assert!(validate_kodak_image(&fake_jpeg(100)).is_ok());
    }

    #[test]
    fn test_validate_kodak_rejects_oversized() {
        let jpeg = fake_jpeg(KODAK_MAX_JPEG_BYTES + 2);
        assert!(validate_kodak_image(&jpeg).is_err());
    }

    #[test]
    fn test_validate_kodak_exact_limit_is_ok() {
        let jpeg = fake_jpeg(KODAK_MAX_JPEG_BYTES);
        assert!(validate_kodak_image(&jpeg).is_ok());
    }

    #[test]
    fn test_validate_kodak_rejects_bad_markers() {
        let mut jpeg = fake_jpeg(16);
        jpeg[0] = 0x00;
        assert!(validate_kodak_image(&jpeg).is_err());
    }

    #[test]
    fn test_validate_kodak_rejects_too_short() {
        assert!(validate_kodak_image(&[0xFF]).is_err());
    }

    #[test]
    fn test_canon_dimensions_are_spec_fixed() {
        assert_eq!(CANON_PRINT_WIDTH, 640);
        assert_eq!(CANON_PRINT_HEIGHT, 1616);
    }

    #[test]
    fn test_prepare_canon_image_produces_correct_dimensions() {
        let mut src = image::RgbaImage::new(800, 600);
        for p in src.pixels_mut() {
            *p = image::Rgba([10, 20, 30, 255]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(src)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let out = prepare_canon_image(&bytes, FitMode::Letterbox).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (CANON_PRINT_WIDTH, CANON_PRINT_HEIGHT));
    }

    #[test]
    fn test_prepare_canon_image_rejects_garbage() {
        assert!(prepare_canon_image(b"not an image", FitMode::Letterbox).is_err());
    }

    #[test]
    fn test_prepare_canon_image_auto_crop_also_hits_fixed_dimensions() {
        let mut src = image::RgbaImage::new(300, 1200);
        for p in src.pixels_mut() {
            *p = image::Rgba([200, 100, 50, 255]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(src)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let out = prepare_canon_image(&bytes, FitMode::AutoCrop).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (CANON_PRINT_WIDTH, CANON_PRINT_HEIGHT));
    }
}
