use crate::error::LayoutError;
use crate::model::Activity;

/// Checks one activity's segments: at least one, none inverted, in order
/// without overlap, and only the last one may still be open.
pub fn validate_activity(activity: &Activity) -> Result<(), LayoutError> {
    if activity.segments.is_empty() {
        return Err(LayoutError::EmptySegments {
            activity: activity.id.clone(),
        });
    }

    let mut prev_end = None;
    for (index, seg) in activity.segments.iter().enumerate() {
        if index > 0 && activity.segments[index - 1].is_ongoing() {
            return Err(LayoutError::OpenBeforeLast {
                activity: activity.id.clone(),
                index: index - 1,
            });
        }
        if let Some(end) = seg.end {
            if end < seg.start {
                return Err(LayoutError::InvertedSegment {
                    activity: activity.id.clone(),
                    index,
                });
            }
        }
        if let Some(prev) = prev_end {
            if seg.start < prev {
                return Err(LayoutError::OutOfOrder {
                    activity: activity.id.clone(),
                    index,
                });
            }
        }
        prev_end = seg.end;
    }
    Ok(())
}

pub fn validate_activities(activities: &[Activity]) -> Result<(), LayoutError> {
    activities.iter().try_for_each(validate_activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, SegmentStatus};
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    fn seg(start: &str, end: Option<&str>) -> Segment {
        let ts = |s: &str| OffsetDateTime::parse(s, &Rfc3339).unwrap();
        Segment {
            start: ts(start),
            end: end.map(ts),
            status: SegmentStatus::Completed,
        }
    }

    fn activity(segments: Vec<Segment>) -> Activity {
        Activity {
            id: "proj".to_string(),
            title: "Project".to_string(),
            icon: String::new(),
            category: String::new(),
            segments,
        }
    }

    #[test]
    fn accepts_ordered_segments_with_open_tail() {
        let a = activity(vec![
            seg("2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z")),
            // touching the previous end is fine
            seg("2024-01-02T00:00:00Z", Some("2024-01-03T00:00:00Z")),
            seg("2024-01-05T00:00:00Z", None),
        ]);
        assert_eq!(validate_activity(&a), Ok(()));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            validate_activity(&activity(Vec::new())),
            Err(LayoutError::EmptySegments { .. })
        ));
    }

    #[test]
    fn rejects_inverted_segment() {
        let a = activity(vec![seg("2024-01-03T00:00:00Z", Some("2024-01-02T00:00:00Z"))]);
        assert_eq!(
            validate_activity(&a),
            Err(LayoutError::InvertedSegment {
                activity: "proj".to_string(),
                index: 0
            })
        );
    }

    #[test]
    fn rejects_overlap_and_out_of_order() {
        let overlap = activity(vec![
            seg("2024-01-01T00:00:00Z", Some("2024-01-03T00:00:00Z")),
            seg("2024-01-02T00:00:00Z", Some("2024-01-04T00:00:00Z")),
        ]);
        assert_eq!(
            validate_activity(&overlap),
            Err(LayoutError::OutOfOrder {
                activity: "proj".to_string(),
                index: 1
            })
        );

        let reversed = activity(vec![
            seg("2024-01-05T00:00:00Z", Some("2024-01-06T00:00:00Z")),
            seg("2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z")),
        ]);
        assert!(matches!(
            validate_activity(&reversed),
            Err(LayoutError::OutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_open_segment_before_last() {
        let a = activity(vec![
            seg("2024-01-01T00:00:00Z", None),
            seg("2024-01-05T00:00:00Z", Some("2024-01-06T00:00:00Z")),
        ]);
        assert_eq!(
            validate_activity(&a),
            Err(LayoutError::OpenBeforeLast {
                activity: "proj".to_string(),
                index: 0
            })
        );
    }

    #[test]
    fn first_failure_wins_across_activities() {
        let good = activity(vec![seg("2024-01-01T00:00:00Z", None)]);
        let mut bad = activity(Vec::new());
        bad.id = "broken".to_string();
        let err = validate_activities(&[good, bad]).unwrap_err();
        assert_eq!(err.to_string(), "activity 'broken' has no segments");
    }
}
