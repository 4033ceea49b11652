//! Plain geometry types shared by the interaction engine and the X11 host

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Window rectangle in root (global) coordinates.
/// `right()`/`bottom()` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rect from its four edges
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Same size, moved to `origin`
    pub fn moved_to(&self, origin: Point) -> Self {
        Self { x: origin.x, y: origin.y, ..*self }
    }

    /// Rect of `size` centered in `self`
    pub fn centered(&self, size: Size) -> Self {
        Self {
            x: self.x + (self.width - size.width) / 2,
            y: self.y + (self.height - size.height) / 2,
            width: size.width,
            height: size.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let r = Rect::new(10, 20, 300, 200);
        assert_eq!(r.left(), 10);
        assert_eq!(r.right(), 310);
        assert_eq!(r.top(), 20);
        assert_eq!(r.bottom(), 220);
        assert_eq!(Rect::from_edges(10, 20, 310, 220), r);
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(0, 0, 100, 50);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(99, 49)));
        assert!(!r.contains(Point::new(100, 10)));
        assert!(!r.contains(Point::new(10, -1)));
    }

    #[test]
    fn test_centered() {
        let screen = Rect::new(0, 0, 1920, 1080);
        assert_eq!(screen.centered(Size::new(400, 300)), Rect::new(760, 390, 400, 300));
    }
}
