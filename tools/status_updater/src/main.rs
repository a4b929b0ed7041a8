use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    process::Command as Process,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "status_updater", version)]
struct Args {
    /// Status document to edit.
    #[arg(long, default_value = "./data/timeline.json")]
    file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current status and project list (the default).
    Show,

    /// Update the status snapshot.
    Status {
        /// What is being worked on right now.
        activity: Option<String>,

        #[arg(long)]
        mood: Option<String>,

        /// Number of active projects.
        #[arg(long)]
        projects: Option<u32>,

        /// Number of tasks for today.
        #[arg(long)]
        tasks: Option<u32>,
    },

    /// Update one project card by id.
    Project {
        id: String,

        /// Progress in percent.
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: Option<u8>,

        /// New status: active, completed, planned or paused.
        #[arg(long, value_parser = ["active", "completed", "planned", "paused"])]
        status: Option<String>,
    },

    /// Commit the data directory and push it.
    Push {
        /// Repository holding the data files.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StatusUpdate {
    activity: Option<String>,
    mood: Option<String>,
    projects: Option<u32>,
    tasks: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "status_updater=info".into()),
        )
        .init();

    let args = Args::parse();
    match args.command.unwrap_or(Command::Show) {
        Command::Show => {
            let doc = load_document(&args.file)?;
            print!("{}", summarize(&doc));
        }
        Command::Status {
            activity,
            mood,
            projects,
            tasks,
        } => {
            let mut doc = load_document(&args.file)?;
            update_status(
                &mut doc,
                &StatusUpdate {
                    activity,
                    mood,
                    projects,
                    tasks,
                },
            )?;
            save_document(&args.file, &mut doc, &local_now())?;
            info!("status updated");
        }
        Command::Project {
            id,
            progress,
            status,
        } => {
            let mut doc = load_document(&args.file)?;
            let title = update_project(&mut doc, &id, progress, status.as_deref())?;
            save_document(&args.file, &mut doc, &local_now())?;
            info!("project '{title}' updated");
        }
        Command::Push { repo } => push(&repo)?,
    }
    Ok(())
}

fn local_now() -> String {
    chrono::Local::now().to_rfc3339()
}

fn load_document(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Stamps `status.lastUpdated` and writes pretty JSON, keeping unknown
/// fields and non-ASCII text as they are.
fn save_document(path: &Path, doc: &mut Value, updated_at: &str) -> anyhow::Result<()> {
    status_object(doc)?.insert(
        "lastUpdated".to_string(),
        Value::String(updated_at.to_string()),
    );
    let text = serde_json::to_string_pretty(&*doc)?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn status_object(doc: &mut Value) -> anyhow::Result<&mut serde_json::Map<String, Value>> {
    doc.get_mut("status")
        .and_then(Value::as_object_mut)
        .context("document has no 'status' object")
}

fn update_status(doc: &mut Value, update: &StatusUpdate) -> anyhow::Result<()> {
    let status = status_object(doc)?;
    if let Some(v) = update.activity.as_deref().filter(|v| !v.is_empty()) {
        status.insert("currentActivity".to_string(), Value::from(v));
    }
    if let Some(v) = update.mood.as_deref().filter(|v| !v.is_empty()) {
        status.insert("mood".to_string(), Value::from(v));
    }
    if let Some(n) = update.projects {
        status.insert("activeProjects".to_string(), Value::from(n));
    }
    if let Some(n) = update.tasks {
        status.insert("todayTasks".to_string(), Value::from(n));
    }
    Ok(())
}

/// Returns the project's title on success.
fn update_project(
    doc: &mut Value,
    id: &str,
    progress: Option<u8>,
    status: Option<&str>,
) -> anyhow::Result<String> {
    let events = doc
        .get_mut("events")
        .and_then(Value::as_array_mut)
        .context("document has no 'events' list")?;
    let Some(event) = events
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|e| e.get("id").and_then(Value::as_str) == Some(id))
    else {
        bail!("project not found: {id}");
    };

    if let Some(p) = progress {
        event.insert("progress".to_string(), Value::from(p));
    }
    if let Some(s) = status.filter(|s| !s.is_empty()) {
        event.insert("status".to_string(), Value::from(s));
    }
    Ok(event
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(id)
        .to_string())
}

fn summarize(doc: &Value) -> String {
    let field = |v: &Value, k: &str| v.get(k).and_then(Value::as_str).unwrap_or("").to_string();
    let status = doc.get("status").cloned().unwrap_or(Value::Null);

    let mut out = String::new();
    out.push_str("\nStatus\n");
    out.push_str(&format!("  activity: {}\n", field(&status, "currentActivity")));
    out.push_str(&format!("  mood: {}\n", field(&status, "mood")));
    out.push_str("\nProjects:\n");
    for e in doc
        .get("events")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let st: String = field(e, "status").chars().take(4).collect();
        let progress = match e.get("progress").and_then(Value::as_f64) {
            Some(p) if p > 0.0 => format!(" ({}%)", p.min(100.0)),
            _ => String::new(),
        };
        out.push_str(&format!(
            "  [{st}] {}: {}{progress}\n",
            field(e, "id"),
            field(e, "title")
        ));
    }
    out
}

fn push(repo: &Path) -> anyhow::Result<()> {
    let message = format!("update progress {}", chrono::Local::now().format("%H:%M"));
    git(repo, &["add", "-A"])?;
    git(repo, &["commit", "-m", &message])?;
    git(repo, &["push"])?;
    info!("pushed {}", repo.display());
    Ok(())
}

fn git(repo: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Process::new("git")
        .args(args)
        .current_dir(repo)
        .status()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !status.success() {
        bail!("git {} failed ({status})", args.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        serde_json::from_str(
            r#"{
                "status": {
                    "currentActivity": "reading",
                    "mood": "😊",
                    "lastUpdated": "2024-01-01T00:00:00+08:00",
                    "activeProjects": 1,
                    "todayTasks": 2,
                    "extra": "kept"
                },
                "events": [
                    {"id": "site", "title": "网站", "status": "active", "progress": 10, "custom": true},
                    {"id": "idea", "title": "Idea", "status": "planned"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn update_status_sets_only_given_fields() {
        let mut doc = sample();
        update_status(
            &mut doc,
            &StatusUpdate {
                activity: Some("writing".to_string()),
                tasks: Some(7),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(doc["status"]["currentActivity"], "writing");
        assert_eq!(doc["status"]["mood"], "😊");
        assert_eq!(doc["status"]["todayTasks"], 7);
        assert_eq!(doc["status"]["activeProjects"], 1);
        assert_eq!(doc["status"]["extra"], "kept");
    }

    #[test]
    fn update_status_requires_status_object() {
        let mut doc = serde_json::json!({"events": []});
        assert!(update_status(&mut doc, &StatusUpdate::default()).is_err());
    }

    #[test]
    fn update_project_by_id() {
        let mut doc = sample();
        let title = update_project(&mut doc, "site", Some(80), Some("completed")).unwrap();
        assert_eq!(title, "网站");
        assert_eq!(doc["events"][0]["progress"], 80);
        assert_eq!(doc["events"][0]["status"], "completed");
        assert_eq!(doc["events"][0]["custom"], true);

        let err = update_project(&mut doc, "missing", Some(1), None).unwrap_err();
        assert_eq!(err.to_string(), "project not found: missing");
    }

    #[test]
    fn save_stamps_last_updated_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        let mut doc = sample();
        save_document(&path, &mut doc, "2024-02-02T10:00:00+08:00").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("网站"));
        assert!(text.contains("😊"));
        let back = load_document(&path).unwrap();
        assert_eq!(back["status"]["lastUpdated"], "2024-02-02T10:00:00+08:00");
        assert_eq!(back["status"]["extra"], "kept");

        // field order survives the round trip
        let keys: Vec<&String> = back["status"].as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "currentActivity");
    }

    #[test]
    fn summarize_lists_projects() {
        let text = summarize(&sample());
        assert!(text.contains("activity: reading"));
        assert!(text.contains("[acti] site: 网站 (10%)"));
        assert!(text.contains("[plan] idea: Idea\n"));
    }

    #[test]
    fn summarize_shows_fractional_and_caps_large_progress() {
        let doc = serde_json::json!({
            "status": {"currentActivity": "x"},
            "events": [
                {"id": "a", "title": "A", "status": "active", "progress": 62.5},
                {"id": "b", "title": "B", "status": "active", "progress": 250},
                {"id": "c", "title": "C", "status": "active", "progress": 0}
            ]
        });
        let text = summarize(&doc);
        assert!(text.contains("a: A (62.5%)"));
        assert!(text.contains("b: B (100%)"));
        assert!(text.contains("c: C\n"));
    }
}
