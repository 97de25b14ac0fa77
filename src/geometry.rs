//! Margin geometry
//!
//! Two policies, kept apart on purpose:
//! - [`compute_inset_transform`] keeps the outer page size and shrinks content into the
//!   inset area;
//! - [`compute_fixed_target_transform`] forces the page to a fixed physical size and fits
//!   content into that size's inset area.
//!
//! All values are PDF points (1/72 inch), origin at the bottom-left of the page.

use thiserror::Error;

/// Degenerate margin/page combination
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("page size {width}x{height}pt is not a positive finite size")]
    InvalidPage { width: f64, height: f64 },

    #[error("margin {margin}pt must be a finite non-negative length")]
    InvalidMargin { margin: f64 },

    #[error("margin {margin}pt leaves no content area on a {width}x{height}pt page")]
    MarginTooLarge { width: f64, height: f64, margin: f64 },
}

/// Uniform scale followed by a translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    /// Size of a `width` x `height` area after scaling
    pub fn scaled_size(&self, width: f64, height: f64) -> (f64, f64) {
        (width * self.scale, height * self.scale)
    }

    /// Where a `width` x `height` page lands after this transform
    pub fn content_rect(&self, width: f64, height: f64) -> Rect {
        let (w, h) = self.scaled_size(width, height);
        Rect {
            x: self.translate_x,
            y: self.translate_y,
            width: w,
            height: h,
        }
    }
}

/// Axis-aligned rectangle in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Output of the fixed-target policy: the transform and the page it applies to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPlacement {
    pub transform: Transform,
    pub page_width: f64,
    pub page_height: f64,
}

fn check_page(width: f64, height: f64) -> Result<(), GeometryError> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(GeometryError::InvalidPage { width, height });
    }
    Ok(())
}

fn check_margin(width: f64, height: f64, margin: f64) -> Result<(), GeometryError> {
    if !(margin.is_finite() && margin >= 0.0) {
        return Err(GeometryError::InvalidMargin { margin });
    }
    if margin * 2.0 >= width || margin * 2.0 >= height {
        return Err(GeometryError::MarginTooLarge { width, height, margin });
    }
    Ok(())
}

/// Shrink a page's content so a `margin` band stays blank on every side,
/// keeping the page's own outer size.
///
/// Scaling is uniform; the scaled content is centered in the original frame.
pub fn compute_inset_transform(
    width: f64,
    height: f64,
    margin: f64,
) -> Result<Transform, GeometryError> {
    check_page(width, height)?;
    check_margin(width, height, margin)?;

    let available_width = width - 2.0 * margin;
    let available_height = height - 2.0 * margin;
    let scale = (available_width / width).min(available_height / height);

    if scale <= 0.0 {
        return Err(GeometryError::MarginTooLarge { width, height, margin });
    }

    Ok(Transform {
        scale,
        translate_x: (width - width * scale) / 2.0,
        translate_y: (height - height * scale) / 2.0,
    })
}

/// Fit a `src_width` x `src_height` page into a `target_width` x `target_height`
/// page with a blank `margin` band on every side.
///
/// Content is anchored at the margin inset. On the axis with slack it is centered
/// inside the content rectangle. The resulting page size is always the target size.
pub fn compute_fixed_target_transform(
    src_width: f64,
    src_height: f64,
    target_width: f64,
    target_height: f64,
    margin: f64,
) -> Result<TargetPlacement, GeometryError> {
    check_page(src_width, src_height)?;
    check_page(target_width, target_height)?;
    check_margin(target_width, target_height, margin)?;

    let content_width = target_width - 2.0 * margin;
    let content_height = target_height - 2.0 * margin;
    let scale = (content_width / src_width).min(content_height / src_height);

    let (scaled_width, scaled_height) = (src_width * scale, src_height * scale);

    Ok(TargetPlacement {
        transform: Transform {
            scale,
            translate_x: margin + (content_width - scaled_width) / 2.0,
            translate_y: margin + (content_height - scaled_height) / 2.0,
        },
        page_width: target_width,
        page_height: target_height,
    })
}

/// The whole content area of a page, used when content is stretched to fill it
pub fn stretch_rect(page_width: f64, page_height: f64, margin: f64) -> Result<Rect, GeometryError> {
    check_page(page_width, page_height)?;
    check_margin(page_width, page_height, margin)?;

    Ok(Rect {
        x: margin,
        y: margin,
        width: page_width - 2.0 * margin,
        height: page_height - 2.0 * margin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{default_margin, Length, PageDimensions};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_inset_fits_and_centers() {
        let cases = [
            (612.0, 792.0, 14.17),
            (595.0, 842.0, 0.0),
            (100.0, 1000.0, 49.0),
            (1000.0, 100.0, 49.9),
            (300.0, 300.0, 10.0),
        ];

        for (w, h, m) in cases {
            let t = compute_inset_transform(w, h, m).unwrap();
            let (sw, sh) = t.scaled_size(w, h);

            assert!(t.scale > 0.0 && t.scale <= 1.0, "scale {} for {:?}", t.scale, (w, h, m));
            assert!(sw <= w - 2.0 * m + EPS, "width overflow for {:?}", (w, h, m));
            assert!(sh <= h - 2.0 * m + EPS, "height overflow for {:?}", (w, h, m));
            assert!((t.translate_x - (w - w * t.scale) / 2.0).abs() < EPS);
            assert!((t.translate_y - (h - h * t.scale) / 2.0).abs() < EPS);
        }
    }

    #[test]
    fn test_inset_binding_axis_is_the_short_side() {
        // Letter: height ratio (792-2m)/792 > width ratio (612-2m)/612
        let m = default_margin().pt();
        let t = compute_inset_transform(612.0, 792.0, m).unwrap();
        assert!((t.scale - (612.0 - 2.0 * m) / 612.0).abs() < EPS);
        assert!((t.translate_x - m).abs() < 1e-6);
        assert!(t.translate_y > m);
    }

    #[test]
    fn test_inset_rejects_oversized_margin() {
        assert!(matches!(
            compute_inset_transform(100.0, 200.0, 50.0),
            Err(GeometryError::MarginTooLarge { .. })
        ));
        assert!(matches!(
            compute_inset_transform(200.0, 100.0, 60.0),
            Err(GeometryError::MarginTooLarge { .. })
        ));
        assert!(compute_inset_transform(100.0, 200.0, 49.999).is_ok());
    }

    #[test]
    fn test_inset_rejects_bad_inputs() {
        assert!(matches!(
            compute_inset_transform(0.0, 100.0, 1.0),
            Err(GeometryError::InvalidPage { .. })
        ));
        assert!(matches!(
            compute_inset_transform(f64::NAN, 100.0, 1.0),
            Err(GeometryError::InvalidPage { .. })
        ));
        assert!(matches!(
            compute_inset_transform(100.0, 100.0, -1.0),
            Err(GeometryError::InvalidMargin { .. })
        ));
    }

    #[test]
    fn test_fixed_target_page_is_exactly_a4() {
        let a4 = PageDimensions::a4();
        let m = default_margin().pt();

        for (src_w, src_h) in [
            (Length::from_mm(200.0).pt(), Length::from_mm(280.0).pt()),
            (612.0, 792.0),
            (2000.0, 300.0),
            (50.0, 50.0),
        ] {
            let p = compute_fixed_target_transform(src_w, src_h, a4.width.pt(), a4.height.pt(), m)
                .unwrap();
            assert!((Length::from_pt(p.page_width).mm() - 210.0).abs() < EPS);
            assert!((Length::from_pt(p.page_height).mm() - 297.0).abs() < EPS);
        }
    }

    #[test]
    fn test_fixed_target_content_stays_inside_margins() {
        let a4 = PageDimensions::a4();
        let m = default_margin().pt();
        let (tw, th) = (a4.width.pt(), a4.height.pt());

        for (src_w, src_h) in [(612.0, 792.0), (2000.0, 300.0), (50.0, 50.0)] {
            let p = compute_fixed_target_transform(src_w, src_h, tw, th, m).unwrap();
            let r = p.transform.content_rect(src_w, src_h);

            assert!(r.x >= m - 1e-6 && r.y >= m - 1e-6);
            assert!(r.x + r.width <= tw - m + 1e-6);
            assert!(r.y + r.height <= th - m + 1e-6);
            // One axis fills the content area exactly
            let fills_w = (r.width - (tw - 2.0 * m)).abs() < 1e-6;
            let fills_h = (r.height - (th - 2.0 * m)).abs() < 1e-6;
            assert!(fills_w || fills_h);
        }
    }

    #[test]
    fn test_fixed_target_anchors_at_margin_on_binding_axis() {
        let m = 10.0;
        // Wide source: width binds, so x sits at the margin and y is centered
        let p = compute_fixed_target_transform(400.0, 100.0, 220.0, 320.0, m).unwrap();
        assert!((p.transform.translate_x - m).abs() < EPS);
        assert!((p.transform.scale - 0.5).abs() < EPS);
        assert!((p.transform.translate_y - (m + (300.0 - 50.0) / 2.0)).abs() < EPS);
    }

    #[test]
    fn test_fixed_target_upscales_small_sources() {
        let p = compute_fixed_target_transform(100.0, 100.0, 220.0, 220.0, 10.0).unwrap();
        assert!((p.transform.scale - 2.0).abs() < EPS);
    }

    #[test]
    fn test_fixed_target_rejects_margin_too_large_for_target() {
        assert!(matches!(
            compute_fixed_target_transform(612.0, 792.0, 100.0, 100.0, 50.0),
            Err(GeometryError::MarginTooLarge { .. })
        ));
    }

    #[test]
    fn test_stretch_rect_covers_whole_content_area() {
        let r = stretch_rect(200.0, 300.0, 10.0).unwrap();
        assert_eq!(r, Rect { x: 10.0, y: 10.0, width: 180.0, height: 280.0 });
        assert!(stretch_rect(200.0, 300.0, 100.0).is_err());
    }
}
