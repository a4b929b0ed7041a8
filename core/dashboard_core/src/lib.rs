//! Timeline layout engine and static page renderer for the status dashboard.
//!
//! Everything here is a pure transform from the two JSON documents
//! (status + journey) to positions and markup. The only clock read happens
//! in the binary, once per render pass; the resulting `now` is passed
//! explicitly to every layout call.

pub mod data;
pub mod error;
pub mod layout;
pub mod map;
pub mod model;
pub mod render;
pub mod validate;

pub use error::{LayoutError, LoadError};
pub use layout::{
    compute_time_bounds, generate_day_ticks, layout_timeline, segment_status_color,
    sort_by_first_start, to_percent, width_from_segment, LayoutOptions, StatusColor, TimeBounds,
    TimelineLayout,
};
pub use model::{Activity, JourneyDocument, Segment, SegmentStatus, StatusDocument};
