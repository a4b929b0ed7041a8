use std::iter::FusedIterator;

use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::LayoutError;
use crate::model::{Activity, Segment, SegmentStatus};
use crate::validate::validate_activities;

/// Narrowest bar the Gantt view will draw, in percent of the axis.
pub const GANTT_MIN_WIDTH_PERCENT: f64 = 0.5;
/// Narrowest bar the multi-track view will draw, in percent of the axis.
pub const TRACK_MIN_WIDTH_PERCENT: f64 = 0.8;

/// Shared time axis for one timeline view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min: OffsetDateTime,
    pub max: OffsetDateTime,
}

impl TimeBounds {
    pub fn to_percent(&self, time: OffsetDateTime) -> f64 {
        to_percent(time, self.min, self.max)
    }

    pub fn day_ticks(&self, offset: UtcOffset) -> DayTicks {
        generate_day_ticks(self.min, self.max, offset)
    }
}

/// Earliest segment start and latest effective end over all activities.
///
/// Returns `None` when there is no segment at all.
pub fn compute_time_bounds(activities: &[Activity], now: OffsetDateTime) -> Option<TimeBounds> {
    activities
        .iter()
        .flat_map(|a| a.segments.iter())
        .fold(None, |acc: Option<TimeBounds>, seg| {
            let start = seg.start;
            let end = seg.effective_end(now);
            Some(match acc {
                None => TimeBounds { min: start, max: end },
                Some(b) => TimeBounds {
                    min: b.min.min(start),
                    max: b.max.max(end),
                },
            })
        })
}

/// Linear position of `time` on the `[min, max]` axis, in percent.
///
/// Not clamped: times outside the range land below 0 or above 100.
/// A zero-width (or inverted) range maps everything to 0.
pub fn to_percent(time: OffsetDateTime, min: OffsetDateTime, max: OffsetDateTime) -> f64 {
    let span = (max - min).as_seconds_f64();
    if span <= 0.0 {
        return 0.0;
    }
    (time - min).as_seconds_f64() / span * 100.0
}

/// A local-midnight boundary on the axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTick {
    pub date: Date,
    pub at: OffsetDateTime,
    /// `month/day`, e.g. `1/3`.
    pub label: String,
}

impl DayTick {
    fn new(date: Date, offset: UtcOffset) -> Self {
        Self {
            date,
            at: date.midnight().assume_offset(offset),
            label: format!("{}/{}", u8::from(date.month()), date.day()),
        }
    }
}

/// Lazy day-by-day walk over the axis. Clone it to restart.
#[derive(Debug, Clone)]
pub struct DayTicks {
    next: Option<Date>,
    last: Date,
    offset: UtcOffset,
}

impl Iterator for DayTicks {
    type Item = DayTick;

    fn next(&mut self) -> Option<DayTick> {
        let date = self.next?;
        if date > self.last {
            self.next = None;
            return None;
        }
        self.next = date.next_day();
        Some(DayTick::new(date, self.offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self.next {
            Some(d) if d <= self.last => (self.last - d).whole_days() as usize + 1,
            _ => 0,
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for DayTicks {}
impl FusedIterator for DayTicks {}

/// Every calendar day (in `offset`) from the day holding `min` through the
/// day holding `max`, inclusive.
pub fn generate_day_ticks(min: OffsetDateTime, max: OffsetDateTime, offset: UtcOffset) -> DayTicks {
    DayTicks {
        next: Some(min.to_offset(offset).date()),
        last: max.to_offset(offset).date(),
        offset,
    }
}

/// Stable ascending sort by first segment start. Activities without
/// segments go last.
pub fn sort_by_first_start(activities: &[Activity]) -> Vec<&Activity> {
    let mut sorted: Vec<&Activity> = activities.iter().collect();
    sorted.sort_by_key(|a| {
        let first = a.first_start();
        (first.is_none(), first)
    });
    sorted
}

/// Visual token for a segment bar. Each view maps these to its own palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColor {
    Primary,
    Muted,
    Success,
    Neutral,
}

impl StatusColor {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusColor::Primary => "primary",
            StatusColor::Muted => "muted",
            StatusColor::Success => "success",
            StatusColor::Neutral => "neutral",
        }
    }
}

pub fn segment_status_color(status: SegmentStatus) -> StatusColor {
    match status {
        SegmentStatus::Active => StatusColor::Primary,
        SegmentStatus::Paused => StatusColor::Muted,
        SegmentStatus::Completed => StatusColor::Success,
        SegmentStatus::Unknown => StatusColor::Neutral,
    }
}

/// Bar width in percent, never narrower than `min_width`.
pub fn width_from_segment(
    segment: &Segment,
    bounds: &TimeBounds,
    now: OffsetDateTime,
    min_width: f64,
) -> f64 {
    let left = bounds.to_percent(segment.start);
    let right = bounds.to_percent(segment.effective_end(now));
    (right - left).max(min_width)
}

/// Inputs shared by every layout call of one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub now: OffsetDateTime,
    pub offset: UtcOffset,
    pub min_width_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub left: f64,
    pub width: f64,
    pub status: SegmentStatus,
    pub color: StatusColor,
    pub ongoing: bool,
    pub start: OffsetDateTime,
    pub end: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track<'a> {
    pub activity: &'a Activity,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedTick {
    pub tick: DayTick,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout<'a> {
    pub bounds: Option<TimeBounds>,
    pub ticks: Vec<PositionedTick>,
    pub tracks: Vec<Track<'a>>,
}

impl TimelineLayout<'_> {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Validates the activities, then lays out ticks and one track per
/// activity sorted by first start.
pub fn layout_timeline<'a>(
    activities: &'a [Activity],
    opts: &LayoutOptions,
) -> Result<TimelineLayout<'a>, LayoutError> {
    validate_activities(activities)?;

    let Some(bounds) = compute_time_bounds(activities, opts.now) else {
        return Ok(TimelineLayout {
            bounds: None,
            ticks: Vec::new(),
            tracks: Vec::new(),
        });
    };

    let ticks = bounds
        .day_ticks(opts.offset)
        .map(|tick| PositionedTick {
            percent: bounds.to_percent(tick.at),
            tick,
        })
        .collect();

    let tracks = sort_by_first_start(activities)
        .into_iter()
        .map(|activity| Track {
            activity,
            bars: activity
                .segments
                .iter()
                .map(|seg| Bar {
                    left: bounds.to_percent(seg.start),
                    width: width_from_segment(seg, &bounds, opts.now, opts.min_width_percent),
                    status: seg.status,
                    color: segment_status_color(seg.status),
                    ongoing: seg.is_ongoing(),
                    start: seg.start,
                    end: seg.end,
                })
                .collect(),
        })
        .collect();

    Ok(TimelineLayout {
        bounds: Some(bounds),
        ticks,
        tracks,
    })
}
