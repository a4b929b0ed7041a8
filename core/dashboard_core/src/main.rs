use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dashboard_core::{
    data::Dashboard,
    layout::{layout_timeline, LayoutOptions, GANTT_MIN_WIDTH_PERCENT},
    model::parse_timestamp,
    render::{fmt_datetime, normalize_base_path, render_page, RenderContext, STYLE_CSS},
};
use serde::Serialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};
use time::{OffsetDateTime, UtcOffset};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 17700;
const TZ_OFFSET_MINUTES_MIN: i32 = -14 * 60;
const TZ_OFFSET_MINUTES_MAX: i32 = 14 * 60;

#[derive(Parser, Debug)]
#[command(name = "dashboard_core", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the static dashboard (index.html + style.css) into a directory.
    Render {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pass: PassArgs,

        /// Output directory.
        #[arg(long, default_value = "./dist")]
        out: PathBuf,

        /// Path prefix the site is hosted under, e.g. /momo-dashboard.
        #[arg(long, default_value = "/")]
        base_path: String,

        /// Page title and header name.
        #[arg(long, default_value = "Momo")]
        title: String,
    },

    /// Print the status snapshot and timeline rows to stdout.
    Show {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pass: PassArgs,
    },

    /// Serve an already rendered directory for local preview.
    Serve {
        /// Directory produced by `render`.
        #[arg(long, default_value = "./dist")]
        dir: PathBuf,

        /// Listen address.
        ///
        /// Accepts:
        /// - ip:port (recommended), e.g. 127.0.0.1:17700
        /// - ip (implies port 17700), e.g. 127.0.0.1
        #[arg(long, default_value = "127.0.0.1:17700")]
        listen: String,

        /// Path prefix to mount the site under; must match the one used to render.
        #[arg(long, default_value = "/")]
        base_path: String,
    },
}

#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// Status document (snapshot, project cards, completed today).
    #[arg(long, default_value = "./data/timeline.json")]
    status: PathBuf,

    /// Journey document (stats, activities with segments, learnings).
    #[arg(long, default_value = "./data/journey.json")]
    journey: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct PassArgs {
    /// Reference time for ongoing segments (RFC 3339). Defaults to the current time.
    #[arg(long)]
    now: Option<String>,

    /// Local UTC offset in minutes, used for day ticks and displayed dates.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    tz_offset_minutes: i32,
}

impl PassArgs {
    fn resolve(&self) -> anyhow::Result<(OffsetDateTime, UtcOffset)> {
        let now = reference_now(self.now.as_deref())?;
        let offset = tz_offset_from_minutes(normalize_tz_offset_minutes(self.tz_offset_minutes));
        Ok((now, offset))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_core=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            input,
            pass,
            out,
            base_path,
            title,
        } => {
            let dash = load(&input)?;
            let (now, offset) = pass.resolve()?;
            let ctx = RenderContext {
                now,
                offset,
                base_path: normalize_base_path(&base_path),
                title,
            };
            let html = render_page(&dash, &ctx)?;
            write_site(&out, &html)?;
            info!("rendered {} at now={}", out.display(), now);
            Ok(())
        }
        Command::Show { input, pass } => {
            let dash = load(&input)?;
            let (now, offset) = pass.resolve()?;
            print!("{}", show(&dash, now, offset)?);
            Ok(())
        }
        Command::Serve {
            dir,
            listen,
            base_path,
        } => serve(dir, &listen, &normalize_base_path(&base_path)).await,
    }
}

fn load(input: &InputArgs) -> anyhow::Result<Dashboard> {
    Dashboard::load(&input.status, &input.journey).with_context(|| {
        format!(
            "failed to load {} / {}",
            input.status.display(),
            input.journey.display()
        )
    })
}

fn reference_now(raw: Option<&str>) -> anyhow::Result<OffsetDateTime> {
    match raw {
        Some(s) => parse_timestamp(s).ok_or_else(|| {
            anyhow::anyhow!("invalid --now '{s}'. Use RFC 3339, e.g. 2024-01-10T00:00:00Z")
        }),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn normalize_tz_offset_minutes(v: i32) -> i32 {
    v.clamp(TZ_OFFSET_MINUTES_MIN, TZ_OFFSET_MINUTES_MAX)
}

fn tz_offset_from_minutes(minutes: i32) -> UtcOffset {
    UtcOffset::from_whole_seconds(minutes.saturating_mul(60)).unwrap_or(UtcOffset::UTC)
}

fn write_site(out: &Path, html: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("create {}", out.display()))?;
    let index = out.join("index.html");
    std::fs::write(&index, html).with_context(|| format!("write {}", index.display()))?;
    let css = out.join("style.css");
    std::fs::write(&css, STYLE_CSS).with_context(|| format!("write {}", css.display()))?;
    Ok(())
}

fn show(dash: &Dashboard, now: OffsetDateTime, offset: UtcOffset) -> anyhow::Result<String> {
    let s = &dash.status.status;
    let mut out = String::new();
    out.push_str("Status\n");
    out.push_str(&format!("  activity: {}\n", s.current_activity));
    out.push_str(&format!("  mood: {}\n", s.mood));
    out.push_str(&format!("  updated: {}\n", s.last_updated));

    out.push_str("\nProjects\n");
    for e in &dash.status.events {
        let progress = e.progress.map(|p| format!(" ({p}%)")).unwrap_or_default();
        out.push_str(&format!(
            "  [{:<9}] {}: {}{}\n",
            e.status.as_str(),
            e.id,
            e.title,
            progress
        ));
    }

    let layout = layout_timeline(
        &dash.journey.events,
        &LayoutOptions {
            now,
            offset,
            min_width_percent: GANTT_MIN_WIDTH_PERCENT,
        },
    )?;
    out.push_str("\nTimeline\n");
    if let Some(b) = layout.bounds {
        out.push_str(&format!(
            "  {} .. {}\n",
            fmt_datetime(b.min, offset),
            fmt_datetime(b.max, offset)
        ));
    }
    for track in &layout.tracks {
        let bars = track
            .bars
            .iter()
            .map(|bar| {
                format!(
                    "{}@{:.1}+{:.1}{}",
                    bar.status.as_str(),
                    bar.left,
                    bar.width,
                    if bar.ongoing { "…" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "  {} {:<24} {}\n",
            track.activity.icon, track.activity.title, bars
        ));
    }
    Ok(out)
}

fn parse_listen(input: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Some((host, port_str)) = input.rsplit_once(':') {
        if host == "localhost" {
            let port: u16 = port_str.parse().map_err(|_| {
                anyhow::anyhow!(
                    "invalid --listen '{}': bad port. Example: 127.0.0.1:{}",
                    input,
                    DEFAULT_PORT
                )
            })?;
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), port));
        }
    }

    if input == "localhost" {
        return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), DEFAULT_PORT));
    }

    Err(anyhow::anyhow!(
        "invalid --listen '{}'. Use ip:port (e.g. 127.0.0.1:{}) or ip (e.g. 127.0.0.1).",
        input,
        DEFAULT_PORT
    ))
}

#[derive(Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[derive(Serialize)]
struct HealthInfo {
    service: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(OkResponse {
        ok: true,
        data: Some(HealthInfo {
            service: "dashboard_core",
            version: env!("CARGO_PKG_VERSION"),
        }),
    })
}

fn preview_router(dir: &Path, base_path: &str) -> Router {
    let files = ServeDir::new(dir).append_index_html_on_directories(true);
    let router = Router::new().route("/health", get(health));
    let router = if base_path.is_empty() {
        router.fallback_service(files)
    } else {
        router.nest_service(base_path, files)
    };

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS]);
    router.layer(cors)
}

async fn serve(dir: PathBuf, listen: &str, base_path: &str) -> anyhow::Result<()> {
    if !dir.join("index.html").is_file() {
        warn!("{} has no index.html; run `render` first", dir.display());
    }
    let app = preview_router(&dir, base_path);

    let addr = parse_listen(listen)?;
    info!("Preview on http://{addr}{base_path}/");
    info!("Serving {}", dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use dashboard_core::data::{parse_journey, parse_status};

    fn dashboard() -> Dashboard {
        let status = parse_status(
            r#"{"status": {"currentActivity": "testing", "mood": "calm", "lastUpdated": "",
                "activeProjects": 1, "todayTasks": 0},
                "events": [{"id": "p", "title": "Proj", "status": "active",
                            "startTime": "2024-01-01", "category": "project", "progress": 50}]}"#,
        )
        .unwrap();
        let journey = parse_journey(
            r#"{"events": [{"id": "p", "title": "Proj", "emoji": "🚀",
                "segments": [{"start": "2024-01-01", "end": "2024-01-05", "status": "completed"},
                             {"start": "2024-01-06", "end": null, "status": "active"}]}]}"#,
        )
        .unwrap();
        Dashboard { status, journey }
    }

    #[test]
    fn parse_listen_accepts_common_forms() {
        assert_eq!(
            parse_listen("127.0.0.1:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(parse_listen("0.0.0.0").unwrap().port(), DEFAULT_PORT);
        assert_eq!(parse_listen("localhost:8080").unwrap().port(), 8080);
        assert_eq!(parse_listen("localhost").unwrap().port(), DEFAULT_PORT);
        assert!(parse_listen("localhost:http").is_err());
        assert!(parse_listen("example.com:80").is_err());
    }

    #[test]
    fn tz_offset_is_clamped() {
        assert_eq!(normalize_tz_offset_minutes(8 * 60), 480);
        assert_eq!(normalize_tz_offset_minutes(-20 * 60), TZ_OFFSET_MINUTES_MIN);
        assert_eq!(normalize_tz_offset_minutes(99 * 60), TZ_OFFSET_MINUTES_MAX);
        assert_eq!(tz_offset_from_minutes(-300).whole_minutes(), -300);
    }

    #[test]
    fn reference_now_parses_or_rejects() {
        let t = reference_now(Some("2024-01-10T00:00:00Z")).unwrap();
        assert_eq!(t.date().to_string(), "2024-01-10");
        assert!(reference_now(Some("tomorrow")).is_err());
        assert!(reference_now(None).is_ok());
    }

    #[test]
    fn show_lists_projects_and_rows() {
        let now = reference_now(Some("2024-01-11T00:00:00Z")).unwrap();
        let text = show(&dashboard(), now, UtcOffset::UTC).unwrap();
        assert!(text.contains("activity: testing"));
        assert!(text.contains("p: Proj (50%)"));
        assert!(text.contains("completed@0.0+40.0 active@50.0+50.0…"));
        assert!(text.contains("  2024-01-01 00:00 .. 2024-01-11 00:00\n"));

        let east = UtcOffset::from_hms(8, 0, 0).unwrap();
        let text = show(&dashboard(), now, east).unwrap();
        assert!(text.contains("  2024-01-01 08:00 .. 2024-01-11 08:00\n"));
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        use tower::ServiceExt;
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn preview_router_serves_under_base_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("style.css"), STYLE_CSS).unwrap();

        let router = preview_router(dir.path(), "/momo");
        assert_eq!(status_of(router.clone(), "/momo/index.html").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/momo/style.css").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/health").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/index.html").await, StatusCode::NOT_FOUND);
        assert_eq!(status_of(router, "/momo/missing.css").await, StatusCode::NOT_FOUND);

        let router = preview_router(dir.path(), "");
        assert_eq!(status_of(router.clone(), "/index.html").await, StatusCode::OK);
        assert_eq!(status_of(router, "/health").await, StatusCode::OK);
    }

    #[test]
    fn write_site_emits_index_and_css() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        let ctx = RenderContext {
            now: reference_now(Some("2024-01-11T00:00:00Z")).unwrap(),
            offset: UtcOffset::UTC,
            base_path: String::new(),
            title: "Test".to_string(),
        };
        let html = render_page(&dashboard(), &ctx).unwrap();
        write_site(&out, &html).unwrap();
        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert_eq!(index, html);
        assert!(index.contains("href=\"/style.css\""));
        assert_eq!(std::fs::read_to_string(out.join("style.css")).unwrap(), STYLE_CSS);
    }
}
