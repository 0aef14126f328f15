use std::path::PathBuf;

/// User-facing failure categories. Each one maps to a blocking notice in the UI.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Invalid file format: {name}. Please choose an FBX file.")]
    InvalidFormat { name: String },
    #[error("Failed to load model {name}: {reason}")]
    Parse { name: String, reason: String },
    #[error("Failed to read asset {path}: {source}")]
    AssetFetch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

impl ViewerError {
    pub fn parse(name: impl Into<String>, err: &anyhow::Error) -> Self {
        ViewerError::Parse { name: name.into(), reason: format!("{err:#}") }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ViewerError::Decode { path: path.into(), reason: reason.to_string() }
    }
}
