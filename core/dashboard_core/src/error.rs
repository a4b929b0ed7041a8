use std::path::PathBuf;

/// Rejections from the validation pass that runs before layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("activity '{activity}' has no segments")]
    EmptySegments { activity: String },

    #[error("activity '{activity}' segment {index}: end is before start")]
    InvertedSegment { activity: String, index: usize },

    #[error("activity '{activity}' segment {index}: starts before the previous segment ends")]
    OutOfOrder { activity: String, index: usize },

    #[error("activity '{activity}' segment {index}: ongoing segment is followed by another segment")]
    OpenBeforeLast { activity: String, index: usize },
}

/// Errors while reading one of the dashboard documents.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timeline data in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
}
