//! Serpentine "map" view: one node per activity, zig-zagging down the
//! canvas, joined by a smooth path.

use crate::model::{Segment, SegmentStatus};

pub const MAP_WIDTH: f64 = 800.0;
const SIDE_MARGIN: f64 = 150.0;
const TOP_MARGIN: f64 = 80.0;
const ROW_HEIGHT: f64 = 120.0;
const BOTTOM_PADDING: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Node positions: even rows on the left, odd rows on the right.
pub fn map_points(count: usize) -> Vec<Point> {
    (0..count)
        .map(|i| Point {
            x: if i % 2 == 0 {
                SIDE_MARGIN
            } else {
                MAP_WIDTH - SIDE_MARGIN
            },
            y: TOP_MARGIN + i as f64 * ROW_HEIGHT,
        })
        .collect()
}

pub fn map_height(count: usize) -> f64 {
    count as f64 * ROW_HEIGHT + BOTTOM_PADDING
}

/// SVG path joining the points with vertical-tangent cubic curves.
pub fn curve_path(points: &[Point]) -> String {
    if points.len() < 2 {
        return String::new();
    }
    let mut d = format!("M {} {}", points[0].x, points[0].y);
    for pair in points.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let mid_y = (prev.y + cur.y) / 2.0;
        d.push_str(&format!(
            " C {} {}, {} {}, {} {}",
            prev.x, mid_y, cur.x, mid_y, cur.x, cur.y
        ));
    }
    d
}

/// Where an activity stands as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Active,
    Paused,
    Completed,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::Paused => "paused",
            NodeStatus::Completed => "completed",
        }
    }
}

/// Derived from the last segment: an open active/paused tail wins,
/// anything else counts as completed.
pub fn event_status(segments: &[Segment]) -> NodeStatus {
    match segments.last() {
        Some(last) if last.is_ongoing() && last.status == SegmentStatus::Active => NodeStatus::Active,
        Some(last) if last.is_ongoing() && last.status == SegmentStatus::Paused => NodeStatus::Paused,
        _ => NodeStatus::Completed,
    }
}
