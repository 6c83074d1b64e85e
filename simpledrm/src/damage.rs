//! Damage Rectangles
//!
//! Clip rectangles reported with a dirty-framebuffer request. Coordinates
//! are half-open: a rect covers `[x1, x2) x [y1, y2)`. Upstream damage
//! tracking may hand us stale or oversized regions, so clamping never
//! fails; it just yields nothing.

/// A half-open clip rectangle in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    /// Create a rect from its corners
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a rect covering a whole `width` x `height` surface
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Create from origin and size, saturating at the coordinate limit
    pub fn from_origin_size(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// No pixel is covered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Check if this rectangle intersects with another
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x1 < other.x2
            && other.x1 < self.x2
            && self.y1 < other.y2
            && other.y1 < self.y2
    }

    /// Get intersection with another rectangle
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }

        Some(Rect {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        })
    }

    /// Clip to the surface `[0, width) x [0, height)`
    ///
    /// `None` iff the rect does not cover any pixel of the surface.
    pub fn clamp(&self, width: u32, height: u32) -> Option<Rect> {
        self.intersection(&Rect::full(width, height))
    }

    /// Check if this rectangle contains another
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let r1 = Rect::new(0, 0, 100, 100);
        let r2 = Rect::new(50, 50, 150, 150);

        assert!(r1.intersects(&r2));

        let intersection = r1.intersection(&r2).unwrap();
        assert_eq!(intersection, Rect::new(50, 50, 100, 100));
        assert_eq!(intersection.area(), 2500);
    }

    #[test]
    fn test_touching_rects_do_not_intersect() {
        let r1 = Rect::new(0, 0, 10, 10);
        let r2 = Rect::new(10, 0, 20, 10);
        assert!(!r1.intersects(&r2));
        assert!(r1.intersection(&r2).is_none());
    }

    #[test]
    fn test_empty_rects() {
        assert!(Rect::new(5, 5, 5, 9).is_empty());
        assert!(Rect::new(5, 9, 8, 2).is_empty());
        assert!(Rect::default().is_empty());
        assert_eq!(Rect::new(9, 0, 2, 1).width(), 0);
        assert!(Rect::new(5, 5, 5, 9).clamp(100, 100).is_none());
    }

    #[test]
    fn test_clamp_oversized() {
        let r = Rect::new(10, 20, u32::MAX, u32::MAX);
        assert_eq!(r.clamp(64, 48), Some(Rect::new(10, 20, 64, 48)));
    }

    #[test]
    fn test_clamp_outside() {
        assert!(Rect::new(64, 0, 80, 10).clamp(64, 48).is_none());
        assert!(Rect::new(0, 48, 10, 60).clamp(64, 48).is_none());
        assert!(Rect::full(10, 10).clamp(0, 0).is_none());
    }

    #[test]
    fn test_from_origin_size_saturates() {
        let r = Rect::from_origin_size(u32::MAX - 1, 3, 10, 4);
        assert_eq!(r, Rect::new(u32::MAX - 1, 3, u32::MAX, 7));
        assert!(Rect::full(8, 8).contains_rect(&Rect::new(2, 2, 8, 8)));
    }
}
