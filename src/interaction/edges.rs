//! Border-zone classification for a frameless window

bitflags::bitflags! {
    /// Window borders a pointer position is "on".
    /// Corners are unions of two adjacent edges.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EdgeMask: u8 {
        const LEFT   = 0b0001;
        const TOP    = 0b0010;
        const RIGHT  = 0b0100;
        const BOTTOM = 0b1000;

        const TOP_LEFT = Self::TOP.bits() | Self::LEFT.bits();
        const TOP_RIGHT = Self::TOP.bits() | Self::RIGHT.bits();
        const BOTTOM_LEFT = Self::BOTTOM.bits() | Self::LEFT.bits();
        const BOTTOM_RIGHT = Self::BOTTOM.bits() | Self::RIGHT.bits();
    }
}

/// Cursor shape hint for a border zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    Default,
    Horizontal,
    Vertical,
    /// Top-left / bottom-right corner
    DiagonalNwSe,
    /// Top-right / bottom-left corner
    DiagonalNeSw,
}

/// Classify a window-local pointer position against a `width` x `height`
/// window with a border `margin`.
///
/// Zones are tested per side independently, so the result is the union of
/// every side within `margin`. Windows no larger than `2 * margin` may yield
/// opposite edges together; callers treat that as unspecified.
pub fn classify(x: i32, y: i32, width: i32, height: i32, margin: i32) -> EdgeMask {
    let mut mask = EdgeMask::empty();
    if x <= margin {
        mask |= EdgeMask::LEFT;
    }
    if x >= width.saturating_sub(margin) {
        mask |= EdgeMask::RIGHT;
    }
    if y <= margin {
        mask |= EdgeMask::TOP;
    }
    if y >= height.saturating_sub(margin) {
        mask |= EdgeMask::BOTTOM;
    }
    mask
}

impl EdgeMask {
    pub fn cursor_shape(self) -> CursorShape {
        if self == EdgeMask::TOP_LEFT || self == EdgeMask::BOTTOM_RIGHT {
            CursorShape::DiagonalNwSe
        } else if self == EdgeMask::TOP_RIGHT || self == EdgeMask::BOTTOM_LEFT {
            CursorShape::DiagonalNeSw
        } else if self == EdgeMask::LEFT || self == EdgeMask::RIGHT {
            CursorShape::Horizontal
        } else if self == EdgeMask::TOP || self == EdgeMask::BOTTOM {
            CursorShape::Vertical
        } else {
            CursorShape::Default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_and_center() {
        for (w, h, m) in [(400, 300, 6), (100, 100, 8), (1920, 40, 3), (40, 30, 6)] {
            assert_eq!(classify(m, m, w, h, m), EdgeMask::TOP_LEFT, "{w}x{h} m={m}");
            assert_eq!(classify(w - m, h - m, w, h, m), EdgeMask::BOTTOM_RIGHT, "{w}x{h} m={m}");
            assert_eq!(classify(w / 2, h / 2, w, h, m), EdgeMask::empty(), "{w}x{h} m={m}");
        }
    }

    #[test]
    fn test_single_edges() {
        assert_eq!(classify(0, 150, 400, 300, 6), EdgeMask::LEFT);
        assert_eq!(classify(399, 150, 400, 300, 6), EdgeMask::RIGHT);
        assert_eq!(classify(200, 3, 400, 300, 6), EdgeMask::TOP);
        assert_eq!(classify(200, 294, 400, 300, 6), EdgeMask::BOTTOM);
        assert_eq!(classify(7, 150, 400, 300, 6), EdgeMask::empty());
    }

    #[test]
    fn test_remaining_corners() {
        assert_eq!(classify(398, 2, 400, 300, 6), EdgeMask::TOP_RIGHT);
        assert_eq!(classify(1, 299, 400, 300, 6), EdgeMask::BOTTOM_LEFT);
    }

    #[test]
    fn test_total_over_extreme_inputs() {
        // Must not panic on overflow
        let _ = classify(i32::MIN, i32::MAX, i32::MIN, i32::MIN, i32::MAX);
        let _ = classify(i32::MAX, i32::MIN, i32::MAX, i32::MAX, i32::MIN);
    }

    #[test]
    fn test_cursor_shapes() {
        assert_eq!(EdgeMask::TOP_LEFT.cursor_shape(), CursorShape::DiagonalNwSe);
        assert_eq!(EdgeMask::BOTTOM_RIGHT.cursor_shape(), CursorShape::DiagonalNwSe);
        assert_eq!(EdgeMask::TOP_RIGHT.cursor_shape(), CursorShape::DiagonalNeSw);
        assert_eq!(EdgeMask::BOTTOM_LEFT.cursor_shape(), CursorShape::DiagonalNeSw);
        assert_eq!(EdgeMask::LEFT.cursor_shape(), CursorShape::Horizontal);
        assert_eq!(EdgeMask::RIGHT.cursor_shape(), CursorShape::Horizontal);
        assert_eq!(EdgeMask::TOP.cursor_shape(), CursorShape::Vertical);
        assert_eq!(EdgeMask::BOTTOM.cursor_shape(), CursorShape::Vertical);
        assert_eq!(EdgeMask::empty().cursor_shape(), CursorShape::Default);
    }
}
