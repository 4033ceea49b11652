//! Pointer-driven move/resize engine for the frameless window
//!
//! Turns press/motion/release events into window geometry changes. The engine
//! owns only its mode; everything it affects (geometry, cursor, opacity,
//! persistence) goes through the [`WindowHost`] collaborator.

mod edges;

pub use edges::{classify, CursorShape, EdgeMask};

use tracing::debug;

use crate::types::{Point, Rect, Size};

/// Opacity levels the engine can request from the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpacityLevel {
    Normal,
    Hover,
    /// Elevated opacity while dragging or resizing
    Active,
}

/// Window-side collaborator driven by the engine and the singleton listener.
///
/// Implementations are expected to log their own failures; none of these
/// calls may fail from the engine's point of view.
pub trait WindowHost {
    /// Current window rectangle in root coordinates
    fn window_rect(&self) -> Rect;

    /// Available area of the screen (work area, excluding panels)
    fn screen_available_bounds(&self) -> Rect;

    fn set_window_geometry(&mut self, rect: Rect);

    fn set_cursor_shape(&mut self, shape: CursorShape);

    fn request_opacity(&mut self, level: OpacityLevel);

    /// Make visible, raise, focus and return to normal opacity
    fn bring_to_front_and_focus(&mut self);

    /// Best-effort save of the rectangle
    fn persist_geometry(&mut self, rect: Rect);
}

/// Engine settings that collaborators may change at runtime via
/// [`InteractionMachine::set_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionConfig {
    pub edge_margin: i32,
    pub min_size: Size,
}

/// Pointer position in window-local and root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub local: Point,
    pub global: Point,
}

impl PointerEvent {
    pub fn new(local: Point, global: Point) -> Self {
        Self { local, global }
    }
}

/// Current interaction mode. Session data lives inside the variant that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    Dragging {
        /// Pointer position relative to the window origin at press time
        offset: Point,
    },
    Resizing {
        edges: EdgeMask,
        /// Window rectangle at press time
        anchor: Rect,
    },
}

#[derive(Debug)]
pub struct InteractionMachine {
    mode: InteractionMode,
    config: InteractionConfig,
    cursor: CursorShape,
}

impl InteractionMachine {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            mode: InteractionMode::Idle,
            config,
            cursor: CursorShape::Default,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn config(&self) -> InteractionConfig {
        self.config
    }

    /// Replace margin/minimum size. An in-flight resize keeps its anchor but
    /// uses the new minimum from the next motion on.
    pub fn set_config(&mut self, config: InteractionConfig) {
        debug!(?config, "Interaction config updated");
        self.config = config;
    }

    /// Primary button pressed inside the window
    pub fn press(&mut self, host: &mut impl WindowHost, event: PointerEvent) {
        if self.mode != InteractionMode::Idle {
            debug!(mode = ?self.mode, "Press ignored, session already active");
            return;
        }

        let rect = host.window_rect();
        let edges = classify(
            event.local.x,
            event.local.y,
            rect.width,
            rect.height,
            self.config.edge_margin,
        );

        self.mode = if edges.is_empty() {
            InteractionMode::Dragging {
                offset: event.global - rect.origin(),
            }
        } else {
            InteractionMode::Resizing { edges, anchor: rect }
        };
        debug!(mode = ?self.mode, "Interaction started");
        host.request_opacity(OpacityLevel::Active);
    }

    pub fn motion(&mut self, host: &mut impl WindowHost, event: PointerEvent) {
        match self.mode {
            InteractionMode::Idle => self.update_cursor(host, event.local),
            InteractionMode::Dragging { offset } => {
                let rect = host.window_rect().moved_to(event.global - offset);
                host.set_window_geometry(rect);
            }
            InteractionMode::Resizing { edges, anchor } => {
                let rect = resize_rect(anchor, edges, event.global, self.config.min_size);
                host.set_window_geometry(rect);
            }
        }
    }

    /// Primary button released. Ends any session and persists the result.
    pub fn release(&mut self, host: &mut impl WindowHost, event: PointerEvent) {
        if self.mode == InteractionMode::Idle {
            return;
        }
        self.mode = InteractionMode::Idle;

        let rect = host.window_rect();
        debug!(?rect, "Interaction finished");
        host.persist_geometry(rect);

        let local_bounds = Rect::new(0, 0, rect.width, rect.height);
        host.request_opacity(if local_bounds.contains(event.local) {
            OpacityLevel::Hover
        } else {
            OpacityLevel::Normal
        });
        self.update_cursor(host, event.local);
    }

    pub fn pointer_entered(&mut self, host: &mut impl WindowHost) {
        if self.mode == InteractionMode::Idle {
            host.request_opacity(OpacityLevel::Hover);
        }
    }

    pub fn pointer_left(&mut self, host: &mut impl WindowHost) {
        if self.mode == InteractionMode::Idle {
            host.request_opacity(OpacityLevel::Normal);
        }
    }

    fn update_cursor(&mut self, host: &mut impl WindowHost, local: Point) {
        let rect = host.window_rect();
        let shape = classify(local.x, local.y, rect.width, rect.height, self.config.edge_margin)
            .cursor_shape();
        if shape != self.cursor {
            self.cursor = shape;
            host.set_cursor_shape(shape);
        }
    }
}

/// Resize `anchor` by moving the edges in `edges` to follow `pointer`
/// (root coordinates). Opposite edges stay fixed and the result never
/// shrinks below `min`.
pub fn resize_rect(anchor: Rect, edges: EdgeMask, pointer: Point, min: Size) -> Rect {
    let delta = pointer - anchor.origin();
    let mut left = anchor.left();
    let mut top = anchor.top();
    let mut right = anchor.right();
    let mut bottom = anchor.bottom();

    if edges.contains(EdgeMask::LEFT) {
        left = anchor
            .left()
            .saturating_add(delta.x)
            .min(anchor.right().saturating_sub(min.width));
    } else if edges.contains(EdgeMask::RIGHT) {
        right = pointer.x.max(anchor.left().saturating_add(min.width));
    }

    if edges.contains(EdgeMask::TOP) {
        top = anchor
            .top()
            .saturating_add(delta.y)
            .min(anchor.bottom().saturating_sub(min.height));
    } else if edges.contains(EdgeMask::BOTTOM) {
        bottom = pointer.y.max(anchor.top().saturating_add(min.height));
    }

    Rect::from_edges(left, top, right, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum HostCall {
        Geometry(Rect),
        Cursor(CursorShape),
        Opacity(OpacityLevel),
        Raise,
        Persist(Rect),
    }

    struct RecordingHost {
        rect: Rect,
        calls: Vec<HostCall>,
    }

    impl RecordingHost {
        fn new(rect: Rect) -> Self {
            Self { rect, calls: Vec::new() }
        }

        fn persisted(&self) -> Vec<Rect> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    HostCall::Persist(r) => Some(*r),
                    _ => None,
                })
                .collect()
        }

        fn last_opacity(&self) -> Option<OpacityLevel> {
            self.calls.iter().rev().find_map(|c| match c {
                HostCall::Opacity(level) => Some(*level),
                _ => None,
            })
        }
    }

    impl WindowHost for RecordingHost {
        fn window_rect(&self) -> Rect {
            self.rect
        }

        fn screen_available_bounds(&self) -> Rect {
            Rect::new(0, 0, 1920, 1080)
        }

        fn set_window_geometry(&mut self, rect: Rect) {
            self.rect = rect;
            self.calls.push(HostCall::Geometry(rect));
        }

        fn set_cursor_shape(&mut self, shape: CursorShape) {
            self.calls.push(HostCall::Cursor(shape));
        }

        fn request_opacity(&mut self, level: OpacityLevel) {
            self.calls.push(HostCall::Opacity(level));
        }

        fn bring_to_front_and_focus(&mut self) {
            self.calls.push(HostCall::Raise);
        }

        fn persist_geometry(&mut self, rect: Rect) {
            self.calls.push(HostCall::Persist(rect));
        }
    }

    const MIN: Size = Size { width: 220, height: 120 };

    fn machine() -> InteractionMachine {
        InteractionMachine::new(InteractionConfig {
            edge_margin: 6,
            min_size: MIN,
        })
    }

    /// Pointer event for a window at `rect` with a local position
    fn at(rect: Rect, lx: i32, ly: i32) -> PointerEvent {
        PointerEvent::new(Point::new(lx, ly), Point::new(rect.x + lx, rect.y + ly))
    }

    fn global(rect: Rect, gx: i32, gy: i32) -> PointerEvent {
        PointerEvent::new(Point::new(gx - rect.x, gy - rect.y), Point::new(gx, gy))
    }

    #[test]
    fn test_press_in_center_starts_drag() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 200, 150));

        assert_eq!(m.mode(), InteractionMode::Dragging { offset: Point::new(200, 150) });
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Active));
    }

    #[test]
    fn test_press_on_border_starts_resize() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 399, 299));

        assert_eq!(
            m.mode(),
            InteractionMode::Resizing { edges: EdgeMask::BOTTOM_RIGHT, anchor: rect }
        );
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Active));
    }

    #[test]
    fn test_drag_then_release_has_no_drift() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 50, 40));
        m.motion(&mut host, PointerEvent::new(Point::new(50, 40), Point::new(300, 200)));
        m.motion(&mut host, PointerEvent::new(Point::new(50, 40), Point::new(612, 455)));
        let during_last_move = host.rect;
        m.release(&mut host, PointerEvent::new(Point::new(50, 40), Point::new(612, 455)));

        assert_eq!(host.rect.origin(), Point::new(612 - 50, 455 - 40));
        assert_eq!(host.rect, during_last_move);
        assert_eq!(host.rect.size(), rect.size());
        assert_eq!(host.persisted(), vec![Rect::new(562, 415, 400, 300)]);
        assert_eq!(m.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_resize_right_only() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 398, 150));
        m.motion(&mut host, global(rect, 700, 123));
        assert_eq!(host.rect, Rect::new(100, 100, 600, 300));

        // Shrinking past the minimum pins right at left + min width
        m.motion(&mut host, global(rect, 150, 400));
        assert_eq!(host.rect.left(), 100);
        assert_eq!(host.rect.right(), 100 + MIN.width);
        assert_eq!(host.rect.top(), 100);
        assert_eq!(host.rect.height, 300);
    }

    #[test]
    fn test_resize_left_only_keeps_right_edge() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 2, 150));
        m.motion(&mut host, global(rect, 40, 150));
        assert_eq!(host.rect, Rect::new(40, 100, 460, 300));

        m.motion(&mut host, global(rect, 480, 150));
        assert_eq!(host.rect.right(), 500);
        assert_eq!(host.rect.left(), 500 - MIN.width);
        assert!(host.rect.left() <= host.rect.right() - MIN.width);
    }

    #[test]
    fn test_resize_top_only_changes_y_and_height() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 200, 1));
        m.motion(&mut host, global(rect, 260, 60));

        assert_eq!(host.rect, Rect::new(100, 60, 400, 340));
    }

    #[test]
    fn test_resize_top_left_corner_clamps_both_axes() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 0, 0));
        m.motion(&mut host, global(rect, 1000, 1000));

        assert_eq!(host.rect, Rect::new(500 - MIN.width, 400 - MIN.height, MIN.width, MIN.height));
    }

    #[test]
    fn test_resize_bottom_left_corner() {
        let rect = Rect::new(100, 100, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 3, 297));
        m.motion(&mut host, global(rect, 80, 450));

        assert_eq!(host.rect, Rect::from_edges(80, 100, 500, 450));
    }

    #[test]
    fn test_release_inside_requests_hover() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 200, 150));
        m.release(&mut host, at(rect, 200, 150));

        assert_eq!(host.last_opacity(), Some(OpacityLevel::Hover));
    }

    #[test]
    fn test_release_outside_requests_normal() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 399, 150));
        m.motion(&mut host, global(rect, 380, 150));
        m.release(&mut host, PointerEvent::new(Point::new(500, 150), Point::new(500, 150)));

        assert_eq!(host.last_opacity(), Some(OpacityLevel::Normal));
        assert_eq!(host.persisted().len(), 1);
    }

    #[test]
    fn test_idle_motion_only_updates_cursor() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.motion(&mut host, at(rect, 0, 0));
        m.motion(&mut host, at(rect, 1, 1));
        m.motion(&mut host, at(rect, 200, 0));
        m.motion(&mut host, at(rect, 200, 150));

        assert_eq!(m.mode(), InteractionMode::Idle);
        assert_eq!(
            host.calls,
            vec![
                HostCall::Cursor(CursorShape::DiagonalNwSe),
                HostCall::Cursor(CursorShape::Vertical),
                HostCall::Cursor(CursorShape::Default),
            ]
        );
    }

    #[test]
    fn test_release_while_idle_is_ignored() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.release(&mut host, at(rect, 10, 10));

        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_second_press_does_not_restart_session() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 200, 150));
        let mode = m.mode();
        m.press(&mut host, at(rect, 0, 0));

        assert_eq!(m.mode(), mode);
    }

    #[test]
    fn test_hover_ignored_during_session() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.pointer_entered(&mut host);
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Hover));

        m.press(&mut host, at(rect, 200, 150));
        m.pointer_left(&mut host);
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Active));

        m.release(&mut host, PointerEvent::new(Point::new(-20, 5), Point::new(-20, 5)));
        m.pointer_entered(&mut host);
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Hover));
        m.pointer_left(&mut host);
        assert_eq!(host.last_opacity(), Some(OpacityLevel::Normal));
    }

    #[test]
    fn test_set_config_applies_new_minimum() {
        let rect = Rect::new(0, 0, 400, 300);
        let mut host = RecordingHost::new(rect);
        let mut m = machine();

        m.press(&mut host, at(rect, 399, 150));
        m.set_config(InteractionConfig {
            edge_margin: 6,
            min_size: Size::new(300, 200),
        });
        m.motion(&mut host, global(rect, 10, 150));

        assert_eq!(host.rect.width, 300);
        assert_eq!(m.config().min_size, Size::new(300, 200));
    }
}
