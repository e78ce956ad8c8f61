use super::SurfaceSize;

/// Rasterizer viewport rectangle in physical pixels with a `[min_depth, max_depth]` range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport with the default `0..1` depth range.
    #[inline]
    pub fn covering(size: SurfaceSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width as f32,
            height: size.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::covering(SurfaceSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_matches_surface_extent() {
        let vp = Viewport::covering(SurfaceSize::new(800, 600));
        assert_eq!((vp.x, vp.y), (0.0, 0.0));
        assert_eq!((vp.width, vp.height), (800.0, 600.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
        assert!(vp.is_valid());
    }

    #[test]
    fn empty_surface_gives_invalid_viewport() {
        assert!(!Viewport::covering(SurfaceSize::new(0, 600)).is_valid());
    }
}
