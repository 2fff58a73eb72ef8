use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("no planning-artifacts directory found (looked for: {0})")]
    ArtifactsDirNotFound(String),

    #[error("no stories/epics document found in {0}")]
    StoriesFileNotFound(String),

    #[error("no stories extracted from {0}")]
    NoStories(String),

    #[error("snapshot swap failed: {0}")]
    SnapshotSwap(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, HandoffError>;
