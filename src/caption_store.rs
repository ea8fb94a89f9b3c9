//! Persistence for edited captions.
//!
//! Loading is best effort: a missing, unreadable or malformed side file reads
//! as an empty mapping. Saving reports failure so the caller can fall back to
//! an [`ExportBlob`] download.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::caption::CaptionOverrides;
use crate::error::Error;

/// File name offered for caption downloads.
pub const EXPORT_FILE_NAME: &str = "captions.json";

pub trait CaptionStore: Send + Sync {
    fn load(&self) -> CaptionOverrides;
    fn save(&self, overrides: &CaptionOverrides) -> Result<(), Error>;
}

/// Captions stored as a pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonCaptionStore {
    path: PathBuf,
}

impl JsonCaptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptionStore for JsonCaptionStore {
    fn load(&self) -> CaptionOverrides {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "caption file absent; starting empty");
                return CaptionOverrides::new();
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "caption file unreadable; starting empty");
                return CaptionOverrides::new();
            }
        };
        match serde_json::from_str::<CaptionOverrides>(&raw) {
            Ok(overrides) => {
                debug!(path = %self.path.display(), count = overrides.len(), "loaded captions");
                overrides
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "caption file malformed; starting empty");
                CaptionOverrides::new()
            }
        }
    }

    fn save(&self, overrides: &CaptionOverrides) -> Result<(), Error> {
        let body = export_json(overrides)?;
        fs::write(&self.path, body)?;
        info!(path = %self.path.display(), count = overrides.len(), "saved captions");
        Ok(())
    }
}

/// Downloadable copy of the overrides, same schema as the side file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportBlob {
    pub fn from_overrides(overrides: &CaptionOverrides) -> Result<Self, Error> {
        Ok(Self {
            file_name: EXPORT_FILE_NAME,
            content_type: "application/json",
            bytes: export_json(overrides)?.into_bytes(),
        })
    }
}

fn export_json(overrides: &CaptionOverrides) -> Result<String, Error> {
    let mut body = serde_json::to_string_pretty(overrides)?;
    body.push('\n');
    Ok(body)
}
