//! Face thumbnail derivation from a fully composited surface
//!
//! Crops (explicitly or by auto-trim), downscales without ever
//! upscaling, and pads to an exact target box anchored bottom-center.

use crate::compositor::trim_to_opaque_bounds;
use crate::error::ErrorKind;
use image::{imageops, imageops::FilterType, Rgba, RgbaImage};

/// An explicit face-crop rectangle. All four values travel together;
/// partial or negative input is rejected where the rectangle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    /// Build a rectangle from four optional signed values as they come
    /// out of a description table. All absent yields `None`; anything
    /// partial or negative is an invalid-input error, never clamped or
    /// defaulted.
    pub fn from_parts(
        left: Option<i64>,
        top: Option<i64>,
        width: Option<i64>,
        height: Option<i64>,
    ) -> Result<Option<FaceRect>, ErrorKind> {
        match (left, top, width, height) {
            (None, None, None, None) => Ok(None),
            (Some(left), Some(top), Some(width), Some(height)) => {
                if left < 0 || top < 0 || width < 0 || height < 0 {
                    return Err(ErrorKind::InvalidInput(format!(
                        "face crop values must be non-negative, got ({}, {}, {}, {})",
                        left, top, width, height
                    )));
                }
                Ok(Some(FaceRect {
                    left: left as u32,
                    top: top as u32,
                    width: width as u32,
                    height: height as u32,
                }))
            }
            _ => Err(ErrorKind::InvalidInput(
                "face crop requires all of left, top, width and height".to_string(),
            )),
        }
    }
}

/// Derive a fixed-size face thumbnail from an untrimmed render.
///
/// With an explicit rectangle the crop must lie fully inside the render;
/// without one the render is auto-trimmed to its opaque bounding box.
/// The result is scaled by `min(1, target_w / w)` (never upscaled),
/// hard-cropped to the target box from the top-left, then padded with
/// transparent background to exactly `target_w x target_h`, content
/// flush with the bottom edge and centered horizontally.
pub fn face_thumbnail(
    rendered: RgbaImage,
    rect: Option<FaceRect>,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, ErrorKind> {
    let cropped = match rect {
        Some(rect) => {
            if rect.width == 0 || rect.height == 0 {
                return Err(ErrorKind::InvalidInput(
                    "face crop rectangle must have a positive size".to_string(),
                ));
            }
            if rect.left + rect.width > rendered.width()
                || rect.top + rect.height > rendered.height()
            {
                return Err(ErrorKind::InvalidInput(format!(
                    "face crop ({}, {}, {}, {}) exceeds rendered bounds {}x{}",
                    rect.left,
                    rect.top,
                    rect.width,
                    rect.height,
                    rendered.width(),
                    rendered.height()
                )));
            }
            imageops::crop_imm(&rendered, rect.left, rect.top, rect.width, rect.height)
                .to_image()
        }
        None => trim_to_opaque_bounds(rendered),
    };

    // Never upscale: the scale factor caps at 1.0.
    let scale = (target_w as f64 / cropped.width() as f64).min(1.0);
    let scaled = if scale < 1.0 {
        let w = ((cropped.width() as f64 * scale).round() as u32).max(1);
        let h = ((cropped.height() as f64 * scale).round() as u32).max(1);
        imageops::resize(&cropped, w, h, FilterType::Lanczos3)
    } else {
        cropped
    };

    // Hard-crop to the target box from the top-left.
    let crop_w = scaled.width().min(target_w);
    let crop_h = scaled.height().min(target_h);
    let boxed = imageops::crop_imm(&scaled, 0, 0, crop_w, crop_h).to_image();

    // Pad to the exact box, bottom-center anchored.
    let mut out = RgbaImage::from_pixel(target_w, target_h, Rgba([0, 0, 0, 0]));
    let x = (target_w - boxed.width()) / 2;
    let y = target_h - boxed.height();
    imageops::replace(&mut out, &boxed, x as i64, y as i64);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        })
    }

    #[test]
    fn test_rect_requires_all_four_parts() {
        assert!(FaceRect::from_parts(None, None, None, None).unwrap().is_none());
        assert!(FaceRect::from_parts(Some(1), Some(2), Some(3), Some(4)).unwrap().is_some());
        assert!(matches!(
            FaceRect::from_parts(Some(1), None, Some(3), Some(4)),
            Err(ErrorKind::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rect_rejects_negative_values() {
        assert!(matches!(
            FaceRect::from_parts(Some(-1), Some(0), Some(10), Some(10)),
            Err(ErrorKind::InvalidInput(_))
        ));
    }

    #[test]
    fn test_explicit_crop_scaled_and_bottom_aligned() {
        // 200x200 source, crop (10, 5, 50, 60), target 40x60. Scale is
        // 40/50 = 0.8 giving 40x48; padding leaves a 12px transparent
        // band at the top, content flush at bottom.
        let rect = FaceRect { left: 10, top: 5, width: 50, height: 60 };
        let out = face_thumbnail(gradient(200, 200), Some(rect), 40, 60).unwrap();
        assert_eq!(out.dimensions(), (40, 60));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(20, 11)[3], 0);
        assert_eq!(out.get_pixel(20, 12)[3], 255);
        assert_eq!(out.get_pixel(0, 59)[3], 255);
    }

    #[test]
    fn test_crop_outside_bounds_rejected() {
        let rect = FaceRect { left: 180, top: 0, width: 30, height: 10 };
        let err = face_thumbnail(gradient(200, 200), Some(rect), 40, 60).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_zero_size_rect_rejected() {
        let rect = FaceRect { left: 0, top: 0, width: 0, height: 10 };
        let err = face_thumbnail(gradient(20, 20), Some(rect), 40, 60).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_never_upscales_and_centers_horizontally() {
        // 20x10 opaque content into a 40x60 box: no upscale, so the
        // content sits centered at x 10..30, flush with the bottom.
        let out = face_thumbnail(gradient(20, 10), None, 40, 60).unwrap();
        assert_eq!(out.dimensions(), (40, 60));
        assert_eq!(out.get_pixel(9, 59)[3], 0);
        assert_eq!(out.get_pixel(10, 59)[3], 255);
        assert_eq!(out.get_pixel(29, 59)[3], 255);
        assert_eq!(out.get_pixel(30, 59)[3], 0);
        assert_eq!(out.get_pixel(20, 49)[3], 0);
        assert_eq!(out.get_pixel(20, 50)[3], 255);
    }

    #[test]
    fn test_auto_trim_without_rect() {
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 0]));
        for y in 40..60 {
            for x in 30..50 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        // Opaque box is 20x20; target 40x40 means no scaling, padding
        // centers it at the bottom.
        let out = face_thumbnail(img, None, 40, 40).unwrap();
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(out.get_pixel(10, 39)[3], 255);
        assert_eq!(out.get_pixel(10, 19)[3], 0);
    }

    #[test]
    fn test_tall_content_hard_cropped_to_box() {
        // 40x200 content, target 40x60: scale caps at 1.0, the crop
        // keeps the top 60 rows, and no padding is needed.
        let out = face_thumbnail(gradient(40, 200), None, 40, 60).unwrap();
        assert_eq!(out.dimensions(), (40, 60));
        assert_eq!(out.get_pixel(0, 0)[3], 255);
        assert_eq!(out.get_pixel(39, 59)[3], 255);
    }
}
