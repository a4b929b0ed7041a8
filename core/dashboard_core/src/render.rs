use time::{OffsetDateTime, UtcOffset};

use crate::data::Dashboard;
use crate::error::LayoutError;
use crate::layout::{
    layout_timeline, LayoutOptions, TimelineLayout, GANTT_MIN_WIDTH_PERCENT,
    TRACK_MIN_WIDTH_PERCENT,
};
use crate::map::{curve_path, event_status, map_height, map_points, NodeStatus, MAP_WIDTH};
use crate::model::{
    parse_timestamp, JourneyStats, Learning, MilestoneKind, ProjectEvent, ProjectStatus,
    StatusDocument,
};

pub const STYLE_CSS: &str = include_str!("style.css");

/// Everything one render pass shares. `now` is read once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub now: OffsetDateTime,
    pub offset: UtcOffset,
    pub base_path: String,
    pub title: String,
}

/// `"/momo-dashboard/"` -> `"/momo-dashboard"`, `"/"` or `""` -> `""`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fmt_pct(v: f64) -> String {
    format!("{v:.3}%")
}

fn fmt_date(t: OffsetDateTime, offset: UtcOffset) -> String {
    let l = t.to_offset(offset);
    format!("{}-{:02}-{:02}", l.year(), u8::from(l.month()), l.day())
}

/// `YYYY-MM-DD HH:MM` in the given offset.
pub fn fmt_datetime(t: OffsetDateTime, offset: UtcOffset) -> String {
    let l = t.to_offset(offset);
    format!("{} {:02}:{:02}", fmt_date(t, offset), l.hour(), l.minute())
}

/// Renders the whole page. Deterministic for a fixed context.
pub fn render_page(dash: &Dashboard, ctx: &RenderContext) -> Result<String, LayoutError> {
    let activities = &dash.journey.events;
    let gantt = layout_timeline(
        activities,
        &LayoutOptions {
            now: ctx.now,
            offset: ctx.offset,
            min_width_percent: GANTT_MIN_WIDTH_PERCENT,
        },
    )?;
    let tracks = layout_timeline(
        activities,
        &LayoutOptions {
            now: ctx.now,
            offset: ctx.offset,
            min_width_percent: TRACK_MIN_WIDTH_PERCENT,
        },
    )?;

    let title = html_escape(&ctx.title);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>{title}</title>\n"));
    out.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"{}/style.css\">\n",
        html_escape(&ctx.base_path)
    ));
    out.push_str("</head>\n<body>\n");

    out.push_str(&format!(
        "<header class=\"top\"><span class=\"avatar\"></span><span class=\"name\">{title}</span>\
         <span class=\"online\">Online</span></header>\n<main>\n"
    ));

    render_stats(&mut out, &dash.journey.stats);
    render_current(&mut out, &dash.status, ctx);
    render_completed_today(&mut out, &dash.status.completed_today);
    render_projects(&mut out, &dash.status.events, ctx.offset);

    out.push_str("<section class=\"journey\">\n<h2>Journey</h2>\n");
    render_gantt(&mut out, &gantt, ctx.offset);
    render_tracks(&mut out, &tracks);
    render_map(&mut out, &gantt);
    render_milestones(&mut out, dash);
    render_skills(&mut out, &dash.journey.learnings);
    out.push_str("</section>\n");

    render_footer(&mut out, &dash.status);
    out.push_str("</main>\n</body>\n</html>\n");
    Ok(out)
}

fn render_stats(out: &mut String, stats: &JourneyStats) {
    let items = [
        ("📅", stats.days_alive, "Days"),
        ("🚀", stats.projects_started, "Projects"),
        ("✅", stats.projects_completed, "Completed"),
        ("💾", stats.commits_total, "Commits"),
    ];
    out.push_str("<section class=\"stats\">\n");
    for (icon, value, label) in items {
        out.push_str(&format!(
            "<div class=\"stat\"><div class=\"icon\">{icon}</div><div class=\"value\">{value}</div>\
             <div class=\"label\">{label}</div></div>\n"
        ));
    }
    out.push_str("</section>\n");
}

fn render_current(out: &mut String, doc: &StatusDocument, ctx: &RenderContext) {
    let s = &doc.status;
    let updated = parse_timestamp(&s.last_updated)
        .map(|t| fmt_datetime(t, ctx.offset))
        .unwrap_or_else(|| s.last_updated.clone());

    out.push_str("<section class=\"status card\">\n<h2>Status</h2>\n");
    out.push_str(&format!(
        "<p class=\"current\">{}</p>\n",
        html_escape(&s.current_activity)
    ));
    if !s.mood.is_empty() {
        out.push_str(&format!("<p class=\"mood\">Mood: {}</p>\n", html_escape(&s.mood)));
    }
    out.push_str(&format!(
        "<p class=\"counts\">{} active projects · {} tasks today</p>\n",
        s.active_projects, s.today_tasks
    ));
    if !updated.is_empty() {
        out.push_str(&format!(
            "<p class=\"updated\">Updated {}</p>\n",
            html_escape(&updated)
        ));
    }

    let active: Vec<&ProjectEvent> = doc
        .events
        .iter()
        .filter(|e| e.status == ProjectStatus::Active)
        .collect();
    if !active.is_empty() {
        out.push_str("<ul class=\"working-on\">\n");
        for e in active {
            out.push_str(&format!("<li>{}</li>\n", html_escape(&e.title)));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
}

fn render_completed_today(out: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str("<section class=\"today card\">\n<h2>Today</h2>\n<ul>\n");
    for item in items {
        out.push_str(&format!(
            "<li><span class=\"check\">✓</span>{}</li>\n",
            html_escape(item)
        ));
    }
    out.push_str("</ul>\n</section>\n");
}

fn render_projects(out: &mut String, events: &[ProjectEvent], offset: UtcOffset) {
    out.push_str("<section class=\"projects\">\n<h2>Projects</h2>\n");
    for e in events {
        out.push_str(&format!(
            "<article class=\"project {}\">\n<h3>{}</h3><span class=\"badge\">{}</span>\n",
            e.status.as_str(),
            html_escape(&e.title),
            e.status.as_str()
        ));
        let span = match e.end_time {
            Some(end) => format!("{} → {}", fmt_date(e.start_time, offset), fmt_date(end, offset)),
            None => format!("since {}", fmt_date(e.start_time, offset)),
        };
        out.push_str(&format!("<p class=\"when\">{span}</p>\n"));
        if !e.description.is_empty() {
            out.push_str(&format!("<p>{}</p>\n", html_escape(&e.description)));
        }
        if let Some(p) = e.progress {
            let p = p.clamp(0.0, 100.0);
            out.push_str(&format!(
                "<div class=\"progress\"><div style=\"width: {p:.1}%\"></div></div><span class=\"pct\">{p:.1}%</span>\n"
            ));
        }
        if !e.tags.is_empty() {
            out.push_str("<p class=\"tags\">");
            for tag in &e.tags {
                out.push_str(&format!("<span class=\"tag\">#{}</span>", html_escape(tag)));
            }
            out.push_str("</p>\n");
        }
        if !e.links.is_empty() {
            out.push_str("<p class=\"links\">");
            for link in &e.links {
                out.push_str(&format!(
                    "<a href=\"{}\">{}</a>",
                    html_escape(&link.url),
                    html_escape(&link.label)
                ));
            }
            out.push_str("</p>\n");
        }
        out.push_str("</article>\n");
    }
    out.push_str("</section>\n");
}

fn render_legend(out: &mut String, class: &str) {
    out.push_str(&format!(
        "<div class=\"legend {class}\">\
         <span><i class=\"bar-primary\"></i>Ongoing</span>\
         <span><i class=\"bar-muted\"></i>Paused</span>\
         <span><i class=\"bar-success\"></i>Done</span></div>\n"
    ));
}

fn render_gantt(out: &mut String, layout: &TimelineLayout<'_>, offset: UtcOffset) {
    out.push_str("<div class=\"gantt card\">\n<h3>Timeline</h3>\n");
    if layout.is_empty() {
        out.push_str("<p class=\"empty\">No activity yet.</p>\n</div>\n");
        return;
    }
    out.push_str("<div class=\"axis\">");
    for t in &layout.ticks {
        out.push_str(&format!(
            "<span class=\"tick\" style=\"left: {}\">{}</span>",
            fmt_pct(t.percent),
            t.tick.label
        ));
    }
    out.push_str("</div>\n");

    for track in &layout.tracks {
        let a = track.activity;
        out.push_str(&format!(
            "<div class=\"row\"><div class=\"who\"><span>{}</span><span class=\"title\">{}</span></div><div class=\"lane\">",
            html_escape(&a.icon),
            html_escape(&a.title)
        ));
        for bar in &track.bars {
            let end = bar
                .end
                .map(|e| fmt_datetime(e, offset))
                .unwrap_or_else(|| "ongoing".to_string());
            out.push_str(&format!(
                "<div class=\"bar bar-{}{}\" style=\"left: {}; width: {}\" title=\"{}: {} → {}\"></div>",
                bar.color.as_str(),
                if bar.ongoing { " pulse" } else { "" },
                fmt_pct(bar.left),
                fmt_pct(bar.width),
                bar.status.as_str(),
                fmt_datetime(bar.start, offset),
                end
            ));
        }
        out.push_str("</div></div>\n");
    }
    render_legend(out, "gantt-legend");
    out.push_str("</div>\n");
}

fn render_tracks(out: &mut String, layout: &TimelineLayout<'_>) {
    out.push_str("<div class=\"tracks card\">\n<h3>Tracks</h3>\n");
    if layout.is_empty() {
        out.push_str("<p class=\"empty\">No activity yet.</p>\n</div>\n");
        return;
    }
    out.push_str("<div class=\"axis\">");
    for t in &layout.ticks {
        out.push_str(&format!(
            "<span class=\"tick\" style=\"left: {}\">{}</span>",
            fmt_pct(t.percent),
            t.tick.label
        ));
    }
    out.push_str("</div>\n<div class=\"body\">\n<div class=\"grid\">");
    for t in &layout.ticks {
        out.push_str(&format!(
            "<span class=\"gridline\" style=\"left: {}\"></span>",
            fmt_pct(t.percent)
        ));
    }
    out.push_str("</div>\n");
    for track in &layout.tracks {
        let a = track.activity;
        out.push_str(&format!(
            "<div class=\"row\"><div class=\"who\"><span>{}</span><span class=\"title\">{}</span></div><div class=\"lane\">",
            html_escape(&a.icon),
            html_escape(&a.title)
        ));
        for bar in &track.bars {
            out.push_str(&format!(
                "<div class=\"bar bar-{}{}\" style=\"left: {}; width: {}\"></div>",
                bar.color.as_str(),
                if bar.ongoing { " pulse" } else { "" },
                fmt_pct(bar.left),
                fmt_pct(bar.width)
            ));
        }
        out.push_str("</div></div>\n");
    }
    out.push_str("</div>\n");
    render_legend(out, "tracks-legend");
    out.push_str("</div>\n");
}

// Node order follows the Gantt layout, which is already sorted by first start.
fn render_map(out: &mut String, layout: &TimelineLayout<'_>) {
    let count = layout.tracks.len();
    if count == 0 {
        return;
    }
    let points = map_points(count);
    let width = MAP_WIDTH;
    let height = map_height(count);
    out.push_str("<div class=\"map card\">\n<h3>Map</h3>\n");
    out.push_str(&format!(
        "<svg width=\"100%\" viewBox=\"0 0 {width} {height}\" height=\"{height}\">\n"
    ));
    out.push_str(
        "<defs><linearGradient id=\"pathGradient\" x1=\"0%\" y1=\"0%\" x2=\"0%\" y2=\"100%\">\
         <stop offset=\"0%\" stop-color=\"#8b5cf6\"/><stop offset=\"100%\" stop-color=\"#06b6d4\"/>\
         </linearGradient></defs>\n",
    );
    let d = curve_path(&points);
    if !d.is_empty() {
        out.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"rgba(255,255,255,0.1)\" stroke-width=\"4\" stroke-linecap=\"round\"/>\n\
             <path d=\"{d}\" fill=\"none\" stroke=\"url(#pathGradient)\" stroke-width=\"3\" stroke-linecap=\"round\"/>\n"
        ));
    }

    for (i, (track, p)) in layout.tracks.iter().zip(&points).enumerate() {
        let status = event_status(&track.activity.segments);
        let fill = match status {
            NodeStatus::Completed => "#10b981",
            NodeStatus::Active => "#8b5cf6",
            NodeStatus::Paused => "#f59e0b",
        };
        let caption = match status {
            NodeStatus::Active => "🔥 ongoing",
            NodeStatus::Paused => "⏸️ paused",
            NodeStatus::Completed => "✅ done",
        };
        let (label_x, anchor) = if i % 2 == 0 {
            (p.x + 35.0, "start")
        } else {
            (p.x - 35.0, "end")
        };
        out.push_str(&format!("<g class=\"node {}\">", status.as_str()));
        if status == NodeStatus::Active {
            out.push_str(&format!(
                "<circle class=\"glow\" cx=\"{}\" cy=\"{}\" r=\"25\" fill=\"rgba(139, 92, 246, 0.3)\"/>",
                p.x, p.y
            ));
        }
        out.push_str(&format!(
            "<circle cx=\"{}\" cy=\"{}\" r=\"18\" fill=\"{fill}\" stroke=\"white\" stroke-width=\"2\"/>\
             <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"14\">{}</text>\
             <text x=\"{label_x}\" y=\"{}\" text-anchor=\"{anchor}\" fill=\"white\" font-size=\"13\" font-weight=\"500\">{}</text>\
             <text x=\"{label_x}\" y=\"{}\" text-anchor=\"{anchor}\" fill=\"rgba(255,255,255,0.4)\" font-size=\"10\">{caption}</text>",
            p.x,
            p.y,
            p.x,
            p.y + 5.0,
            html_escape(&track.activity.icon),
            p.y - 8.0,
            html_escape(&track.activity.title),
            p.y + 10.0
        ));
        out.push_str("</g>\n");
    }
    out.push_str("</svg>\n");
    render_legend(out, "map-legend");
    out.push_str("</div>\n");
}

fn render_milestones(out: &mut String, dash: &Dashboard) {
    let milestones = dash.journey.milestones_newest_first();
    if milestones.is_empty() {
        return;
    }
    out.push_str("<div class=\"milestones\">\n<h3>Milestones</h3>\n");
    for m in milestones {
        let kind = match m.kind {
            MilestoneKind::Milestone => "milestone",
            MilestoneKind::Learning | MilestoneKind::Other => "learning",
        };
        out.push_str(&format!(
            "<div class=\"milestone {kind}\"><span class=\"dot\"></span><div class=\"card\">\
             <span class=\"date\">{}</span><h4>{}</h4><p>{}</p></div></div>\n",
            html_escape(&m.date),
            html_escape(&m.title),
            html_escape(&m.description)
        ));
    }
    out.push_str("</div>\n");
}

fn level_class(level: &str) -> &'static str {
    match level {
        "熟练" => "level-success",
        "入门" => "level-warning",
        _ => "level-neutral",
    }
}

fn render_skills(out: &mut String, learnings: &[Learning]) {
    if learnings.is_empty() {
        return;
    }
    out.push_str("<div class=\"skills\">\n<h3>Learned</h3>\n");
    for l in learnings {
        out.push_str(&format!(
            "<div class=\"skill card\"><span class=\"name\">{}</span>\
             <span class=\"level {}\">{}</span><p>{}</p></div>\n",
            html_escape(&l.skill),
            level_class(&l.level),
            html_escape(&l.level),
            html_escape(&l.note)
        ));
    }
    out.push_str("</div>\n");
}

fn render_footer(out: &mut String, doc: &StatusDocument) {
    out.push_str(&format!(
        "<footer><span><b>{}</b> Active</span><span><b>{}</b> Completed</span></footer>\n",
        doc.count_with_status(ProjectStatus::Active),
        doc.count_with_status(ProjectStatus::Completed)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_journey, parse_status};
    use time::format_description::well_known::Rfc3339;

    fn dashboard() -> Dashboard {
        let status = parse_status(
            r#"{
                "status": {"currentActivity": "Fixing <bugs> & such", "mood": "ok",
                           "lastUpdated": "2024-01-10T01:30:00Z", "activeProjects": 1, "todayTasks": 3},
                "events": [
                    {"id": "a", "title": "Alpha", "description": "first", "status": "active",
                     "startTime": "2024-01-01", "category": "project", "progress": 40},
                    {"id": "b", "title": "Beta", "description": "", "status": "completed",
                     "startTime": "2024-01-03", "endTime": "2024-01-05", "category": "task"}
                ]
            }"#,
        )
        .unwrap();
        let journey = parse_journey(
            r#"{
                "stats": {"daysAlive": 9, "projectsStarted": 2, "projectsCompleted": 1, "commitsTotal": 17},
                "events": [
                    {"id": "b", "title": "Beta", "emoji": "🧪", "category": "task",
                     "segments": [{"start": "2024-01-03", "end": "2024-01-05", "status": "completed"}]},
                    {"id": "a", "title": "Alpha", "emoji": "🚀", "category": "project",
                     "segments": [{"start": "2024-01-01", "end": null, "status": "active"}]}
                ],
                "learnings": [
                    {"id": "l1", "skill": "Rust", "level": "熟练", "note": "traits"},
                    {"id": "l2", "skill": "CSS", "level": "新手", "note": ""}
                ],
                "milestones": [
                    {"id": "m1", "date": "2024-01-01", "title": "Hello", "description": "", "type": "milestone"},
                    {"id": "m2", "date": "2024-01-04", "title": "Learned CSS", "description": "", "type": "learning"}
                ]
            }"#,
        )
        .unwrap();
        Dashboard { status, journey }
    }

    fn ctx() -> RenderContext {
        RenderContext {
            now: OffsetDateTime::parse("2024-01-10T00:00:00Z", &Rfc3339).unwrap(),
            offset: UtcOffset::UTC,
            base_path: normalize_base_path("/momo-dashboard/"),
            title: "Momo".to_string(),
        }
    }

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(normalize_base_path("/momo-dashboard/"), "/momo-dashboard");
        assert_eq!(normalize_base_path("momo"), "/momo");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn page_contains_positions_and_sections() {
        let html = render_page(&dashboard(), &ctx()).unwrap();
        assert!(html.contains("href=\"/momo-dashboard/style.css\""));
        assert!(html.contains("Fixing &lt;bugs&gt; &amp; such"));
        assert!(html.contains("Updated 2024-01-10 01:30"));
        // Beta starts 2 days into a 9 day axis.
        assert!(html.contains("left: 22.222%; width: 22.222%"));
        // Alpha runs the whole axis and is still open.
        assert!(html.contains("bar bar-primary pulse\" style=\"left: 0.000%; width: 100.000%\""));
        assert!(html.contains(">1/10</span>"));
        assert!(html.contains("M 150 80 C 150 140, 650 140, 650 200"));
        assert!(html.contains("level-success"));
        assert!(html.contains("level-neutral"));
        assert!(html.contains("<b>1</b> Active"));
        // completedToday is absent, so no Today section
        assert!(!html.contains("<h2>Today</h2>"));

        // Alpha is sorted before Beta in the Gantt rows.
        let alpha = html.find("<span class=\"title\">Alpha</span>").unwrap();
        let beta = html.find("<span class=\"title\">Beta</span>").unwrap();
        assert!(alpha < beta);

        // newest milestone first
        let m2 = html.find("Learned CSS").unwrap();
        let m1 = html.find("<h4>Hello</h4>").unwrap();
        assert!(m2 < m1);
    }

    #[test]
    fn fractional_progress_and_unknown_milestone_render() {
        let mut dash = dashboard();
        dash.status.events[0].progress = Some(62.5);
        dash.journey.milestones[0].kind = MilestoneKind::Other;
        let html = render_page(&dash, &ctx()).unwrap();
        assert!(html.contains("style=\"width: 62.5%\"></div></div><span class=\"pct\">62.5%</span>"));
        assert!(html.contains("<div class=\"milestone learning\"><span class=\"dot\"></span><div class=\"card\"><span class=\"date\">2024-01-01</span><h4>Hello</h4>"));
    }

    #[test]
    fn same_input_same_now_same_page() {
        let dash = dashboard();
        let a = render_page(&dash, &ctx()).unwrap();
        let b = render_page(&dash, &ctx()).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains("NaN"));
        assert!(!a.contains("inf%"));
    }

    #[test]
    fn empty_journey_renders_placeholder() {
        let mut dash = dashboard();
        dash.journey.events.clear();
        let html = render_page(&dash, &ctx()).unwrap();
        assert!(html.contains("No activity yet."));
        assert!(!html.contains("<svg"));
    }
}
