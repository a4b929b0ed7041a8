use serde::{Deserialize, Deserializer};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

/// Parses the timestamp forms found in hand-authored data files.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` without an offset (taken as UTC)
/// and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let s = raw.trim();
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t);
    }
    if let Ok(t) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(t.assume_utc());
    }
    if let Ok(t) = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]")) {
        return Some(t.assume_utc());
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Some(d.midnight().assume_utc());
    }
    None
}

fn de_timestamp<'de, D>(d: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

// Missing, null and "" all mean "still running".
fn de_opt_timestamp<'de, D>(d: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(d)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'"))),
    }
}

// Any JSON number is accepted and pinned to 0..=100.
fn de_progress<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(d)?
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, 100.0)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Active,
    Paused,
    Completed,
    #[serde(other)]
    Unknown,
}

impl SegmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Active => "active",
            SegmentStatus::Paused => "paused",
            SegmentStatus::Completed => "completed",
            SegmentStatus::Unknown => "unknown",
        }
    }
}

/// A contiguous interval of work on an activity. `end == None` means ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Segment {
    #[serde(deserialize_with = "de_timestamp")]
    pub start: OffsetDateTime,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub end: Option<OffsetDateTime>,
    pub status: SegmentStatus,
}

impl Segment {
    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    /// The segment's end, or `now` while it is still open.
    pub fn effective_end(&self, now: OffsetDateTime) -> OffsetDateTime {
        self.end.unwrap_or(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[serde(rename = "emoji", default)]
    pub icon: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Activity {
    pub fn first_start(&self) -> Option<OffsetDateTime> {
        self.segments.first().map(|s| s.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub current_activity: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub active_projects: u32,
    #[serde(default)]
    pub today_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Planned,
    Paused,
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Planned => "planned",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectCategory {
    Project,
    Task,
    Thought,
    Learning,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// A project card from the status document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(deserialize_with = "de_timestamp")]
    pub start_time: OffsetDateTime,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub end_time: Option<OffsetDateTime>,
    pub category: ProjectCategory,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub status: StatusSnapshot,
    #[serde(default)]
    pub events: Vec<ProjectEvent>,
    #[serde(default)]
    pub completed_today: Vec<String>,
}

impl StatusDocument {
    pub fn count_with_status(&self, status: ProjectStatus) -> usize {
        self.events.iter().filter(|e| e.status == status).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStats {
    #[serde(default)]
    pub days_alive: u32,
    #[serde(default)]
    pub projects_started: u32,
    #[serde(default)]
    pub projects_completed: u32,
    #[serde(default)]
    pub commits_total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Learning {
    pub id: String,
    pub skill: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    Milestone,
    Learning,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MilestoneKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JourneyDocument {
    #[serde(default)]
    pub stats: JourneyStats,
    #[serde(default)]
    pub events: Vec<Activity>,
    #[serde(default)]
    pub learnings: Vec<Learning>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl JourneyDocument {
    /// Milestones newest first; undated entries go last in authored order.
    pub fn milestones_newest_first(&self) -> Vec<&Milestone> {
        let mut out: Vec<&Milestone> = self.milestones.iter().collect();
        out.sort_by_key(|m| std::cmp::Reverse(parse_timestamp(&m.date)));
        out
    }
}
