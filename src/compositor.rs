//! Layer compositing into a single raster
//!
//! Renders an ordered bottom-to-top layer list. The first layer seeds the
//! canvas; later layers may grow it to the right/bottom (transparent
//! padding) before blending under their declared composing method.

use crate::error::ErrorKind;
use crate::models::{ComposeMethod, Layer};
use image::{imageops, Rgba, RgbaImage};
use std::path::Path;

/// Rendering knobs owned by the shell being rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeOptions {
    /// Honor an image's own alpha channel instead of deriving one.
    pub use_self_alpha: bool,
    /// Crop the finished raster to its non-transparent bounding box.
    pub trim: bool,
}

/// Composite an ordered layer list into one RGBA raster.
pub fn composite(layers: &[Layer], opts: &CompositeOptions) -> Result<RgbaImage, ErrorKind> {
    let first = layers
        .first()
        .ok_or_else(|| ErrorKind::MissingAsset("no layers to composite".to_string()))?;

    // Layer 0 is the seed canvas; its method is not blended.
    let mut canvas = load_with_alpha(&first.path, opts.use_self_alpha)?;

    for layer in &layers[1..] {
        let img = load_with_alpha(&layer.path, opts.use_self_alpha)?;
        grow_canvas(&mut canvas, layer.x, layer.y, img.width(), img.height());

        match layer.method {
            ComposeMethod::Reduce => reduce(&mut canvas, &img, layer.x, layer.y),
            ComposeMethod::Interpolate => interpolate(&mut canvas, &img, layer.x, layer.y),
            // Every other method composites as source-over.
            _ => imageops::overlay(&mut canvas, &img, layer.x as i64, layer.y as i64),
        }
    }

    if opts.trim {
        canvas = trim_to_opaque_bounds(canvas);
    }
    Ok(canvas)
}

/// Load one layer image and derive its transparency.
///
/// Priority: the image's own alpha channel (only when the shell opts in
/// and the format carries one), then a same-basename `.pna` mask whose
/// per-pixel brightness becomes the alpha channel, then the color at
/// pixel (0,0) as a transparent key color.
pub fn load_with_alpha(path: &Path, use_self_alpha: bool) -> Result<RgbaImage, ErrorKind> {
    if !path.exists() {
        return Err(ErrorKind::MissingAsset(path.display().to_string()));
    }
    let decoded = image::open(path)?;
    let has_alpha = decoded.color().has_alpha();
    let mut img = decoded.to_rgba8();

    if use_self_alpha && has_alpha {
        return Ok(img);
    }

    let mask_path = path.with_extension("pna");
    if mask_path.exists() {
        // `.pna` is not an extension the decoder recognizes; sniff the
        // format from the file content instead.
        let mask = image::load_from_memory(&std::fs::read(&mask_path)?)?.to_luma8();
        if mask.dimensions() != img.dimensions() {
            return Err(ErrorKind::IllegalFormat(format!(
                "mask {} is {}x{} but {} is {}x{}",
                mask_path.display(),
                mask.width(),
                mask.height(),
                path.display(),
                img.width(),
                img.height()
            )));
        }
        for (pixel, mask_pixel) in img.pixels_mut().zip(mask.pixels()) {
            pixel[3] = mask_pixel[0];
        }
        return Ok(img);
    }

    // Key-color transparency: every pixel matching (0,0) goes fully
    // transparent, colors untouched.
    let key = *img.get_pixel(0, 0);
    for pixel in img.pixels_mut() {
        if pixel[0] == key[0] && pixel[1] == key[1] && pixel[2] == key[2] {
            pixel[3] = 0;
        }
    }
    Ok(img)
}

/// Grow the canvas to fit a layer extending past the right/bottom edge,
/// padding new area with fully transparent background. Content keeps its
/// position; negative offsets clip instead of growing.
fn grow_canvas(canvas: &mut RgbaImage, x: i32, y: i32, w: u32, h: u32) {
    let need_w = (x as i64 + w as i64).max(canvas.width() as i64) as u32;
    let need_h = (y as i64 + h as i64).max(canvas.height() as i64) as u32;
    if need_w > canvas.width() || need_h > canvas.height() {
        let mut grown = RgbaImage::from_pixel(need_w, need_h, Rgba([0, 0, 0, 0]));
        imageops::replace(&mut grown, canvas, 0, 0);
        *canvas = grown;
    }
}

/// Destination-in: multiply canvas alpha by the layer's alpha, using the
/// layer as a mask. The offset-aware size correction guarantees the mask
/// matches the canvas dimensions.
fn reduce(canvas: &mut RgbaImage, layer: &RgbaImage, x: i32, y: i32) {
    let mask = correct_size(layer, canvas.width(), canvas.height(), x, y);
    for (pixel, mask_pixel) in canvas.pixels_mut().zip(mask.pixels()) {
        pixel[3] = (pixel[3] as u32 * mask_pixel[3] as u32 / 255) as u8;
    }
}

/// Destination-over: the layer shows only where the canvas is currently
/// transparent. Same size-correction rule as `reduce`.
fn interpolate(canvas: &mut RgbaImage, layer: &RgbaImage, x: i32, y: i32) {
    let under = correct_size(layer, canvas.width(), canvas.height(), x, y);
    for (pixel, under_pixel) in canvas.pixels_mut().zip(under.pixels()) {
        *pixel = blend_over(*pixel, *under_pixel);
    }
}

/// Extend-then-crop a layer to the canvas dimensions, anchored at the
/// given offset (top-left when the offset is zero). New area is fully
/// transparent.
fn correct_size(layer: &RgbaImage, w: u32, h: u32, x: i32, y: i32) -> RgbaImage {
    if layer.dimensions() == (w, h) && x == 0 && y == 0 {
        return layer.clone();
    }
    let mut corrected = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]));
    imageops::replace(&mut corrected, layer, x as i64, y as i64);
    corrected
}

/// Standard non-premultiplied source-over of `top` onto `bottom`.
fn blend_over(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let ta = top[3] as u32;
    let ba = bottom[3] as u32;
    let out_a = ta + ba * (255 - ta) / 255;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let tc = top[c] as u32;
        let bc = bottom[c] as u32;
        out[c] = ((tc * ta + bc * ba * (255 - ta) / 255) / out_a) as u8;
    }
    out[3] = out_a as u8;
    Rgba(out)
}

/// Crop to the bounding box of non-fully-transparent pixels. A raster
/// with no opaque pixel at all is returned unchanged.
pub fn trim_to_opaque_bounds(img: RgbaImage) -> RgbaImage {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[3] > 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !any {
        return img;
    }
    imageops::crop_imm(&img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    fn save(dir: &TempDir, name: &str, img: &RgbaImage) -> std::path::PathBuf {
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    // Mask files carry PNG content behind the `.pna` extension, so the
    // format has to be stated when writing them.
    fn save_pna(dir: &TempDir, name: &str, mask: &image::GrayImage) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        mask.write_to(&mut file, image::ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_reduce_alpha_multiplication() {
        // Base alpha 255, mask alpha 128 => ~128.
        let mut canvas = solid(4, 4, [10, 20, 30, 255]);
        let mask = solid(4, 4, [0, 0, 0, 128]);
        reduce(&mut canvas, &mask, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0)[3], 128);
        // Colors unchanged.
        assert_eq!(canvas.get_pixel(0, 0)[0], 10);

        // Base alpha 128, mask alpha 128 => ~64.
        let mut canvas = solid(4, 4, [10, 20, 30, 128]);
        reduce(&mut canvas, &mask, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0)[3], 64);
    }

    #[test]
    fn test_reduce_size_corrected_with_offset_anchor() {
        let mut canvas = solid(4, 4, [0, 0, 0, 255]);
        // 2x2 opaque mask anchored at (1,1); outside it the correction
        // pads with transparent, erasing the canvas there.
        let mask = solid(2, 2, [0, 0, 0, 255]);
        reduce(&mut canvas, &mask, 1, 1);
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        assert_eq!(canvas.get_pixel(1, 1)[3], 255);
        assert_eq!(canvas.get_pixel(2, 2)[3], 255);
        assert_eq!(canvas.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn test_interpolate_draws_only_into_transparency() {
        let mut canvas = solid(2, 1, [200, 0, 0, 255]);
        canvas.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let under = solid(2, 1, [0, 200, 0, 255]);
        interpolate(&mut canvas, &under, 0, 0);
        // Opaque pixel keeps the canvas color.
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([200, 0, 0, 255]));
        // Transparent pixel takes the new layer.
        assert_eq!(*canvas.get_pixel(1, 0), Rgba([0, 200, 0, 255]));
    }

    #[test]
    fn test_blend_over_partial_alpha() {
        let out = blend_over(Rgba([255, 0, 0, 128]), Rgba([0, 0, 255, 255]));
        assert_eq!(out[3], 255);
        // Roughly half red, half blue.
        assert!(out[0] > 100 && out[0] < 156, "r = {}", out[0]);
        assert!(out[2] > 100 && out[2] < 156, "b = {}", out[2]);
    }

    #[test]
    fn test_canvas_growth_pads_transparent() {
        let mut canvas = solid(2, 2, [1, 2, 3, 255]);
        grow_canvas(&mut canvas, 1, 1, 3, 3);
        assert_eq!(canvas.dimensions(), (4, 4));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([1, 2, 3, 255]));
        assert_eq!(*canvas.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_canvas_never_shrinks_and_negative_offsets_clip() {
        let mut canvas = solid(4, 4, [1, 2, 3, 255]);
        grow_canvas(&mut canvas, -2, -2, 3, 3);
        assert_eq!(canvas.dimensions(), (4, 4));
    }

    #[test]
    fn test_trim_to_opaque_bounds() {
        let mut img = solid(6, 6, [0, 0, 0, 0]);
        img.put_pixel(2, 1, Rgba([5, 5, 5, 255]));
        img.put_pixel(4, 3, Rgba([5, 5, 5, 40]));
        let trimmed = trim_to_opaque_bounds(img);
        assert_eq!(trimmed.dimensions(), (3, 3));
    }

    #[test]
    fn test_trim_fully_transparent_unchanged() {
        let img = solid(3, 2, [0, 0, 0, 0]);
        let trimmed = trim_to_opaque_bounds(img);
        assert_eq!(trimmed.dimensions(), (3, 2));
    }

    #[test]
    fn test_key_color_transparency() {
        let dir = TempDir::new().unwrap();
        let mut img = solid(2, 2, [9, 9, 9, 255]);
        img.put_pixel(1, 1, Rgba([50, 60, 70, 255]));
        // Save as RGB-like content; pixel (0,0) color is the key.
        let path = save(&dir, "base.png", &img);
        let loaded = load_with_alpha(&path, false).unwrap();
        assert_eq!(loaded.get_pixel(0, 0)[3], 0);
        assert_eq!(loaded.get_pixel(1, 0)[3], 0);
        assert_eq!(loaded.get_pixel(1, 1)[3], 255);
        // Colors stay in place even where alpha was cleared.
        assert_eq!(loaded.get_pixel(0, 0)[0], 9);
    }

    #[test]
    fn test_pna_mask_brightness_becomes_alpha() {
        let dir = TempDir::new().unwrap();
        let base = solid(2, 1, [100, 100, 100, 255]);
        let path = save(&dir, "body.png", &base);
        let mut mask = image::GrayImage::new(2, 1);
        mask.put_pixel(0, 0, image::Luma([0]));
        mask.put_pixel(1, 0, image::Luma([128]));
        save_pna(&dir, "body.pna", &mask);

        let loaded = load_with_alpha(&path, false).unwrap();
        assert_eq!(loaded.get_pixel(0, 0)[3], 0);
        assert_eq!(loaded.get_pixel(1, 0)[3], 128);
        assert_eq!(loaded.get_pixel(1, 0)[0], 100);
    }

    #[test]
    fn test_pna_mask_dimension_mismatch_is_illegal_format() {
        let dir = TempDir::new().unwrap();
        let path = save(&dir, "body.png", &solid(2, 2, [0, 0, 0, 255]));
        save_pna(&dir, "body.pna", &image::GrayImage::new(3, 3));
        let err = load_with_alpha(&path, false).unwrap_err();
        assert!(matches!(err, ErrorKind::IllegalFormat(_)));
    }

    #[test]
    fn test_use_self_alpha_keeps_channel() {
        let dir = TempDir::new().unwrap();
        let mut img = solid(2, 1, [10, 10, 10, 200]);
        img.put_pixel(1, 0, Rgba([10, 10, 10, 0]));
        let path = save(&dir, "alpha.png", &img);
        let loaded = load_with_alpha(&path, true).unwrap();
        assert_eq!(loaded.get_pixel(0, 0)[3], 200);
        assert_eq!(loaded.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn test_missing_layer_file_is_missing_asset() {
        let err = load_with_alpha(Path::new("/nonexistent/x.png"), false).unwrap_err();
        assert!(matches!(err, ErrorKind::MissingAsset(_)));
    }

    #[test]
    fn test_composite_overlay_and_growth() {
        let dir = TempDir::new().unwrap();
        // Seed: 4x4 red on a green key background? Keep it simple: the
        // seed's (0,0) pixel becomes the key color, so give it a distinct
        // border color and interior content.
        let mut base = solid(4, 4, [0, 255, 0, 255]);
        for y in 1..3 {
            for x in 1..3 {
                base.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let base_path = save(&dir, "base.png", &base);
        let over = solid(3, 3, [0, 0, 255, 255]);
        let over_path = save(&dir, "over.png", &over);

        let layers = vec![
            Layer { path: base_path, method: ComposeMethod::Base, x: 0, y: 0 },
            Layer { path: over_path, method: ComposeMethod::Overlay, x: 3, y: 3 },
        ];
        let out = composite(&layers, &CompositeOptions::default()).unwrap();
        // Canvas grew from 4x4 to 6x6.
        assert_eq!(out.dimensions(), (6, 6));
        // Overlay pixel is blue where its own key color did not match.
        // The overlay is uniform, so its key makes it fully transparent;
        // interior base pixels must survive.
        assert_eq!(*out.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_composite_empty_layer_list_fails() {
        let err = composite(&[], &CompositeOptions::default()).unwrap_err();
        assert!(matches!(err, ErrorKind::MissingAsset(_)));
    }
}
