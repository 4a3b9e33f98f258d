//! Fit-mode geometry and resampling.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::error::RasterError;
use crate::limits::MAX_IMAGE_DIMENSION;
use crate::pipeline::FitMode;

const FILTER: FilterType = FilterType::Lanczos3;

/// Letterbox fill for `contain`.
const CONTAIN_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Largest side `outside` may produce before the resize is refused.
const MAX_SCALED_DIMENSION: u32 = MAX_IMAGE_DIMENSION * 2;

fn scaled(src: (u32, u32), ratio: f64) -> (u32, u32) {
    let w = (src.0 as f64 * ratio).round().clamp(1.0, u32::MAX as f64) as u32;
    let h = (src.1 as f64 * ratio).round().clamp(1.0, u32::MAX as f64) as u32;
    (w, h)
}

/// Size of the scaled image before any crop or padding.
pub(crate) fn scaled_size(src: (u32, u32), target: (u32, u32), fit: FitMode) -> (u32, u32) {
    let rx = target.0 as f64 / src.0 as f64;
    let ry = target.1 as f64 / src.1 as f64;
    match fit {
        FitMode::Fill => target,
        FitMode::Contain | FitMode::Inside => scaled(src, rx.min(ry)),
        FitMode::Cover | FitMode::Outside => scaled(src, rx.max(ry)),
    }
}

/// Centred region of the source with the target's aspect ratio.
///
/// Returned as `(x, y, width, height)` in source pixels.
pub(crate) fn cover_region(src: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (sw, sh) = (src.0 as f64, src.1 as f64);
    let aspect = target.0 as f64 / target.1 as f64;
    let (cw, ch) = if sw / sh > aspect {
        ((sh * aspect).round().clamp(1.0, sw) as u32, src.1)
    } else {
        (src.0, (sw / aspect).round().clamp(1.0, sh) as u32)
    };
    ((src.0 - cw) / 2, (src.1 - ch) / 2, cw, ch)
}

/// Resize `img` into the `width`×`height` box.
///
/// `fill`, `cover` and `contain` always produce exactly the box; `inside`
/// and `outside` keep the aspect ratio and may differ on one axis.
pub(crate) fn apply(
    img: &DynamicImage,
    width: u32,
    height: u32,
    fit: FitMode,
) -> Result<DynamicImage, RasterError> {
    let src = img.dimensions();
    let (sw, sh) = scaled_size(src, (width, height), fit);
    if sw > MAX_SCALED_DIMENSION || sh > MAX_SCALED_DIMENSION {
        return Err(RasterError::Unsupported(format!(
            "{} resize of {}x{} to {width}x{height} would produce {sw}x{sh}",
            fit.as_str(),
            src.0,
            src.1
        )));
    }
    let out = match fit {
        FitMode::Fill | FitMode::Inside | FitMode::Outside => img.resize_exact(sw, sh, FILTER),
        FitMode::Cover => {
            let (x, y, cw, ch) = cover_region(src, (width, height));
            img.crop_imm(x, y, cw, ch).resize_exact(width, height, FILTER)
        }
        FitMode::Contain => {
            let scaled = img.resize_exact(sw, sh, FILTER).to_rgba8();
            let mut canvas = RgbaImage::from_pixel(width, height, CONTAIN_BACKGROUND);
            let x = (width.saturating_sub(sw) / 2) as i64;
            let y = (height.saturating_sub(sh) / 2) as i64;
            imageops::overlay(&mut canvas, &scaled, x, y);
            DynamicImage::ImageRgba8(canvas)
        }
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_size_modes() {
        let src = (400, 200);
        let target = (100, 100);
        assert_eq!(scaled_size(src, target, FitMode::Fill), (100, 100));
        assert_eq!(scaled_size(src, target, FitMode::Inside), (100, 50));
        assert_eq!(scaled_size(src, target, FitMode::Contain), (100, 50));
        assert_eq!(scaled_size(src, target, FitMode::Outside), (200, 100));
        assert_eq!(scaled_size(src, target, FitMode::Cover), (200, 100));
    }

    #[test]
    fn test_enlargement_allowed() {
        assert_eq!(scaled_size((20, 10), (200, 200), FitMode::Inside), (200, 100));
    }

    #[test]
    fn test_apply_output_dimensions() {
        let img = DynamicImage::new_rgb8(400, 200);
        for (fit, expected) in [
            (FitMode::Cover, (100, 100)),
            (FitMode::Contain, (100, 100)),
            (FitMode::Fill, (100, 100)),
            (FitMode::Inside, (100, 50)),
            (FitMode::Outside, (200, 100)),
        ] {
            assert_eq!(apply(&img, 100, 100, fit).unwrap().dimensions(), expected, "{fit:?}");
        }
    }

    #[test]
    fn test_contain_letterboxes_black() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255])));
        let out = apply(&img, 40, 40, FitMode::Contain).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(20, 0), &Rgba([0, 0, 0, 255]));
        assert!(out.get_pixel(20, 20)[0] > 250);
    }

    #[test]
    fn test_cover_region_centres_on_source() {
        assert_eq!(cover_region((400, 200), (100, 100)), (100, 0, 200, 200));
        assert_eq!(cover_region((200, 400), (100, 100)), (0, 100, 200, 200));
        assert_eq!(cover_region((2, 4096), (4096, 10)), (0, 2047, 2, 1));
    }

    #[test]
    fn test_cover_extreme_aspect_stays_within_target() {
        let img = DynamicImage::new_rgb8(2, 4096);
        let out = apply(&img, 4096, 10, FitMode::Cover).unwrap();
        assert_eq!(out.dimensions(), (4096, 10));
    }

    #[test]
    fn test_cover_keeps_centre_content() {
        let mut src = RgbaImage::from_pixel(300, 100, Rgba([255, 0, 0, 255]));
        for x in 100..200 {
            for y in 0..100 {
                src.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let out = apply(&DynamicImage::ImageRgba8(src), 50, 50, FitMode::Cover)
            .unwrap()
            .to_rgba8();
        let corner = out.get_pixel(0, 0);
        assert!(corner[2] > 200 && corner[0] < 50, "{corner:?}");
    }

    #[test]
    fn test_outside_refuses_oversized_result() {
        let img = DynamicImage::new_rgb8(2, 4096);
        let err = apply(&img, 4096, 10, FitMode::Outside).unwrap_err();
        assert!(matches!(err, RasterError::Unsupported(_)));

        let inside = apply(&img, 4096, 10, FitMode::Inside).unwrap();
        assert!(inside.width() >= 1 && inside.height() <= 10);
    }
}
