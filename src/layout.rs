//! Physical lengths and page sizes

/// Points per millimeter (72 points per inch, 25.4 mm per inch)
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt / POINTS_PER_MM)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * POINTS_PER_MM
    }

    /// Whole pixels covered by this length at the given resolution
    ///
    /// `None` when the result is not a finite value that fits in a `u32`.
    pub fn px(&self, dpi: f64) -> Option<u32> {
        let px = (self.0 * dpi / 25.4).round();
        if px.is_finite() && px >= 0.0 && px <= f64::from(u32::MAX) {
            Some(px as u32)
        } else {
            None
        }
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// DIN A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }

    /// Page size from a width and height in points
    pub fn from_pt(width: f64, height: f64) -> Self {
        Self {
            width: Length::from_pt(width),
            height: Length::from_pt(height),
        }
    }

    /// Canvas size in pixels at the given resolution
    pub fn px(&self, dpi: f64) -> Option<(u32, u32)> {
        Some((self.width.px(dpi)?, self.height.px(dpi)?))
    }
}

/// Default margin applied on every side of a page
pub fn default_margin() -> Length {
    Length::from_mm(5.0)
}
