//! Geometry helpers used by the desktop reducer for drag, resize, snapping, and placement.
//!
//! Everything here is pure: callers pass the start geometry captured at pointer-down plus the
//! current pointer, and commit the returned geometry themselves.

use crate::model::{
    PointerPosition, Position, ResizeEdge, Size, Viewport, WindowFlags, WindowGeometry,
    WindowRecord,
};

/// Size and snapping limits applied to pointer-driven geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLimits {
    pub min_size: Size,
    pub viewport: Viewport,
    pub snap_threshold: i32,
}

/// Whether a drag may start or continue on `window`.
pub fn can_drag(window: &WindowRecord) -> bool {
    window.flags.draggable
        && !window.pinned
        && !window.minimized
        && !window.maximized
        && !window.fullscreen
}

/// Whether a resize may start or continue on `window`.
pub fn can_resize(window: &WindowRecord) -> bool {
    window.flags.resizable
        && !window.pinned
        && !window.minimized
        && !window.maximized
        && !window.fullscreen
}

/// Whether maximize/fullscreen toggles are allowed for `flags`.
///
/// With `requires_resizable`, a non-resizable window cannot be maximized either.
pub fn can_maximize(flags: WindowFlags, requires_resizable: bool) -> bool {
    flags.maximizable && (flags.resizable || !requires_resizable)
}

/// Computes the dragged top-left corner, snapping edges that land near the viewport edges.
pub fn drag_position(
    start: Position,
    pointer_start: PointerPosition,
    pointer: PointerPosition,
    size: Size,
    limits: GeometryLimits,
) -> Position {
    let candidate = start.offset(
        pointer.x.saturating_sub(pointer_start.x),
        pointer.y.saturating_sub(pointer_start.y),
    );
    snap_to_viewport_edges(candidate, size, limits.viewport, limits.snap_threshold)
}

/// Snaps each axis to the near (0) or far (`viewport - size`) edge when within `threshold`.
///
/// The near edge wins when a window is close to both.
pub fn snap_to_viewport_edges(
    candidate: Position,
    size: Size,
    viewport: Viewport,
    threshold: i32,
) -> Position {
    Position {
        x: snap_axis(candidate.x, viewport.width.saturating_sub(size.width), threshold),
        y: snap_axis(candidate.y, viewport.height.saturating_sub(size.height), threshold),
    }
}

fn snap_axis(value: i32, far_edge: i32, threshold: i32) -> i32 {
    let threshold = i64::from(threshold);
    if i64::from(value).abs() <= threshold {
        0
    } else if (i64::from(value) - i64::from(far_edge)).abs() <= threshold {
        far_edge
    } else {
        value
    }
}

/// Applies raw resize deltas for a given edge/corner drag.
pub fn resize_geometry(start: WindowGeometry, edge: ResizeEdge, dx: i32, dy: i32) -> WindowGeometry {
    let mut next = start;
    if edge.touches_east() {
        next.size.width = start.size.width.saturating_add(dx);
    }
    if edge.touches_west() {
        next.position.x = start.position.x.saturating_add(dx);
        next.size.width = start.size.width.saturating_sub(dx);
    }
    if edge.touches_south() {
        next.size.height = start.size.height.saturating_add(dy);
    }
    if edge.touches_north() {
        next.position.y = start.position.y.saturating_add(dy);
        next.size.height = start.size.height.saturating_sub(dy);
    }
    next
}

/// Clamps a size to `[min, viewport]` per axis. The minimum wins on viewports smaller than it.
pub fn clamp_size(size: Size, min: Size, viewport: Viewport) -> Size {
    Size {
        width: size.width.clamp(min.width, viewport.width.max(min.width)),
        height: size.height.clamp(min.height, viewport.height.max(min.height)),
    }
}

/// Resizes from `start` by the pointer delta, clamping size while keeping the edge opposite the
/// dragged handle anchored.
pub fn resize_from_pointer(
    start: WindowGeometry,
    edge: ResizeEdge,
    pointer_start: PointerPosition,
    pointer: PointerPosition,
    limits: GeometryLimits,
) -> WindowGeometry {
    let dx = pointer.x.saturating_sub(pointer_start.x);
    let dy = pointer.y.saturating_sub(pointer_start.y);
    let raw = resize_geometry(start, edge, dx, dy);
    let size = clamp_size(raw.size, limits.min_size, limits.viewport);

    let mut next = WindowGeometry {
        position: raw.position,
        size,
    };
    if edge.touches_west() {
        next.position.x = anchored_near_edge(start.position.x, start.size.width, size.width);
    }
    if edge.touches_north() {
        next.position.y = anchored_near_edge(start.position.y, start.size.height, size.height);
    }
    next
}

/// Near-edge coordinate that keeps `start + start_len` fixed for the new length.
fn anchored_near_edge(start: i32, start_len: i32, len: i32) -> i32 {
    let near = i64::from(start) + i64::from(start_len) - i64::from(len);
    near.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Default top-left for the `index`-th window opened on a desktop.
pub fn cascade_position(origin: Position, step: i32, cascade_len: u32, index: usize) -> Position {
    let slot = (index % cascade_len.max(1) as usize) as i32;
    let shift = slot.saturating_mul(step);
    origin.offset(shift, shift)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const LIMITS: GeometryLimits = GeometryLimits {
        min_size: Size::new(200, 150),
        viewport: Viewport::new(1280, 800),
        snap_threshold: 15,
    };

    #[test]
    fn drag_near_top_left_snaps_to_origin() {
        let position = drag_position(
            Position::new(20, 18),
            PointerPosition::new(100, 100),
            PointerPosition::new(82, 85),
            Size::new(400, 300),
            LIMITS,
        );
        assert_eq!(position, Position::new(0, 0));
    }

    #[test]
    fn drag_near_right_and_bottom_snaps_to_far_edges() {
        let position = snap_to_viewport_edges(
            Position::new(870, 492),
            Size::new(400, 300),
            LIMITS.viewport,
            15,
        );
        assert_eq!(position, Position::new(880, 500));
    }

    #[test]
    fn drag_outside_threshold_keeps_candidate() {
        let position = drag_position(
            Position::new(100, 100),
            PointerPosition::new(0, 0),
            PointerPosition::new(-60, 40),
            Size::new(400, 300),
            LIMITS,
        );
        assert_eq!(position, Position::new(40, 140));
    }

    #[test]
    fn far_edge_resize_grows_size_only() {
        let start = WindowGeometry::new(100, 100, 400, 300);
        assert_eq!(
            resize_from_pointer(
                start,
                ResizeEdge::SouthEast,
                PointerPosition::new(500, 400),
                PointerPosition::new(550, 420),
                LIMITS,
            ),
            WindowGeometry::new(100, 100, 450, 320)
        );
    }

    #[test]
    fn near_edge_resize_shifts_position_and_anchors_far_edge() {
        let start = WindowGeometry::new(100, 100, 400, 300);
        let next = resize_from_pointer(
            start,
            ResizeEdge::NorthWest,
            PointerPosition::new(100, 100),
            PointerPosition::new(80, 130),
            LIMITS,
        );
        assert_eq!(next, WindowGeometry::new(80, 130, 420, 270));
        assert_eq!(next.right(), start.right());
        assert_eq!(next.bottom(), start.bottom());
    }

    #[test]
    fn shrinking_below_minimum_clamps_and_keeps_anchor() {
        let start = WindowGeometry::new(100, 100, 400, 300);
        let next = resize_from_pointer(
            start,
            ResizeEdge::West,
            PointerPosition::new(100, 0),
            PointerPosition::new(450, 0),
            LIMITS,
        );
        assert_eq!(next.size, Size::new(200, 300));
        assert_eq!(next.position.x, 300);
        assert_eq!(next.right(), start.right());

        let shrunk = resize_from_pointer(
            start,
            ResizeEdge::SouthEast,
            PointerPosition::new(0, 0),
            PointerPosition::new(-1000, -1000),
            LIMITS,
        );
        assert_eq!(shrunk, WindowGeometry::new(100, 100, 200, 150));
    }

    #[test]
    fn growing_past_viewport_clamps_to_viewport() {
        let start = WindowGeometry::new(0, 0, 400, 300);
        let next = resize_from_pointer(
            start,
            ResizeEdge::East,
            PointerPosition::new(0, 0),
            PointerPosition::new(5000, 0),
            LIMITS,
        );
        assert_eq!(next.size.width, 1280);
    }

    #[test]
    fn every_edge_moves_only_its_axes() {
        let start = WindowGeometry::new(100, 100, 400, 300);
        assert_eq!(
            resize_geometry(start, ResizeEdge::North, 10, 10),
            WindowGeometry::new(100, 110, 400, 290)
        );
        assert_eq!(
            resize_geometry(start, ResizeEdge::South, 10, 10),
            WindowGeometry::new(100, 100, 400, 310)
        );
        assert_eq!(
            resize_geometry(start, ResizeEdge::East, 10, 10),
            WindowGeometry::new(100, 100, 410, 300)
        );
        assert_eq!(
            resize_geometry(start, ResizeEdge::West, 10, 10),
            WindowGeometry::new(110, 100, 390, 300)
        );
        assert_eq!(
            resize_geometry(start, ResizeEdge::NorthEast, 10, 10),
            WindowGeometry::new(100, 110, 410, 290)
        );
        assert_eq!(
            resize_geometry(start, ResizeEdge::SouthWest, 10, 10),
            WindowGeometry::new(110, 100, 390, 310)
        );
    }

    #[test]
    fn drag_far_off_screen_saturates_instead_of_overflowing() {
        let left = drag_position(
            Position::new(i32::MIN + 10, 0),
            PointerPosition::new(0, 0),
            PointerPosition::new(-50, 0),
            Size::new(400, 300),
            LIMITS,
        );
        assert_eq!(left, Position::new(i32::MIN, 0));

        let right = drag_position(
            Position::new(i32::MAX - 100, 400),
            PointerPosition::new(i32::MIN, 0),
            PointerPosition::new(i32::MAX, 0),
            Size::new(400, 300),
            LIMITS,
        );
        assert_eq!(right, Position::new(i32::MAX, 400));
    }

    #[test]
    fn near_edge_resize_far_off_screen_keeps_far_edge() {
        let start = WindowGeometry::new(i32::MAX - 100, 100, 400, 300);
        let next = resize_from_pointer(
            start,
            ResizeEdge::West,
            PointerPosition::new(0, 0),
            PointerPosition::new(1, 0),
            LIMITS,
        );
        assert_eq!(next, WindowGeometry::new(i32::MAX - 99, 100, 399, 300));

        let start = WindowGeometry::new(100, i32::MIN + 10, 400, 300);
        let next = resize_from_pointer(
            start,
            ResizeEdge::North,
            PointerPosition::new(0, 0),
            PointerPosition::new(0, -20),
            LIMITS,
        );
        assert_eq!(next, WindowGeometry::new(100, i32::MIN, 400, 320));
    }

    #[test]
    fn cascade_wraps_after_configured_length() {
        let origin = Position::new(50, 50);
        assert_eq!(cascade_position(origin, 30, 8, 0), Position::new(50, 50));
        assert_eq!(cascade_position(origin, 30, 8, 2), Position::new(110, 110));
        assert_eq!(cascade_position(origin, 30, 8, 8), Position::new(50, 50));
    }

    #[test]
    fn maximize_gate_follows_resizable_when_required() {
        let fixed = WindowFlags {
            resizable: false,
            ..WindowFlags::default()
        };
        assert!(!can_maximize(fixed, true));
        assert!(can_maximize(fixed, false));
        assert!(can_maximize(WindowFlags::default(), true));
    }
}
