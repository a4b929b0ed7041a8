use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::model::{JourneyDocument, StatusDocument};
use crate::validate::validate_activities;

/// Both documents behind one page, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub status: StatusDocument,
    pub journey: JourneyDocument,
}

impl Dashboard {
    pub fn load(status_path: &Path, journey_path: &Path) -> Result<Self, LoadError> {
        let status = load_status(status_path)?;
        let journey = load_journey(journey_path)?;
        info!(
            "loaded {} projects, {} activities, {} learnings",
            status.events.len(),
            journey.events.len(),
            journey.learnings.len()
        );
        Ok(Self { status, journey })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", raw.len(), path.display());
    parse_json(&raw, path)
}

fn parse_json<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T, LoadError> {
    serde_json::from_str(raw).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_status(path: &Path) -> Result<StatusDocument, LoadError> {
    read_json(path)
}

/// Reads the journey document and rejects malformed activity segments.
pub fn load_journey(path: &Path) -> Result<JourneyDocument, LoadError> {
    let doc: JourneyDocument = read_json(path)?;
    check_journey(doc, path)
}

pub fn parse_journey(raw: &str) -> Result<JourneyDocument, LoadError> {
    let path = PathBuf::from("<inline>");
    let doc = parse_json(raw, &path)?;
    check_journey(doc, &path)
}

pub fn parse_status(raw: &str) -> Result<StatusDocument, LoadError> {
    parse_json(raw, Path::new("<inline>"))
}

fn check_journey(doc: JourneyDocument, path: &Path) -> Result<JourneyDocument, LoadError> {
    validate_activities(&doc.events).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(doc)
}
