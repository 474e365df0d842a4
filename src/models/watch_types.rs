use crate::error::{Result, SorterError};
use crate::services::fs_service;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const DEFAULT_CONFIDENCE: f32 = 0.9;

/// Directory, accepted extensions and confidence threshold for one watch session.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchTarget {
    root: PathBuf,
    extensions: Vec<String>,
    confidence: f32,
}

impl WatchTarget {
    pub fn new<I, S>(root: impl Into<PathBuf>, extensions: I, confidence: f32) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref());
            if ext.is_empty() {
                return Err(SorterError::InvalidArgument(
                    "file extensions must not be empty".to_string(),
                ));
            }
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        if normalized.is_empty() {
            return Err(SorterError::InvalidArgument(
                "at least one file extension is required".to_string(),
            ));
        }
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(SorterError::InvalidArgument(format!(
                "confidence must be in (0, 1], got {}",
                confidence
            )));
        }

        Ok(Self {
            root: root.into(),
            extensions: normalized,
            confidence,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(SorterError::Config(format!(
                "Directory \"{}\" does not exist.",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Case-insensitive suffix match against the configured extensions.
    pub fn matches(&self, path: &Path) -> bool {
        fs_service::has_extension(path, &self.extensions)
    }
}

pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Starting,
    Sweeping,
    Watching,
    Stopping,
    Stopped,
}

/// A filesystem creation notification, consumed once by the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub path: PathBuf,
}

impl PendingEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    /// Matching files found by the initial sweep.
    pub swept: usize,
    /// Files moved during the initial sweep.
    pub swept_moved: usize,
    /// Creation events accepted while watching.
    pub events: usize,
    pub moved: usize,
    pub below_threshold: usize,
    pub failed: usize,
    /// Attempts still running when the drain timeout expired.
    pub abandoned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalized_and_deduplicated() {
        let target = WatchTarget::new("/tmp", [".PNG", "jpg", " Jpg ", "png"], 0.9).unwrap();
        assert_eq!(target.extensions(), &["png".to_string(), "jpg".to_string()]);
    }

    #[test]
    fn empty_extension_set_is_rejected() {
        let err = WatchTarget::new("/tmp", Vec::<String>::new(), 0.9).unwrap_err();
        assert!(matches!(err, SorterError::InvalidArgument(_)));

        let err = WatchTarget::new("/tmp", ["."], 0.9).unwrap_err();
        assert!(matches!(err, SorterError::InvalidArgument(_)));
    }

    #[test]
    fn confidence_must_be_in_half_open_unit_interval() {
        assert!(WatchTarget::new("/tmp", ["png"], 1.0).is_ok());
        assert!(WatchTarget::new("/tmp", ["png"], 0.0).is_err());
        assert!(WatchTarget::new("/tmp", ["png"], 1.5).is_err());
        assert!(WatchTarget::new("/tmp", ["png"], f32::NAN).is_err());
    }

    #[test]
    fn matches_is_case_insensitive() {
        let target = WatchTarget::new("/tmp", ["png", "jpeg"], 0.9).unwrap();
        assert!(target.matches(Path::new("/tmp/a.PNG")));
        assert!(target.matches(Path::new("/tmp/b.jpeg")));
        assert!(!target.matches(Path::new("/tmp/c.jpg")));
        assert!(!target.matches(Path::new("/tmp/png")));
    }

    #[test]
    fn validate_rejects_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = WatchTarget::new(dir.path().join("missing"), ["png"], 0.9).unwrap();
        assert!(matches!(target.validate(), Err(SorterError::Config(_))));

        let target = WatchTarget::new(dir.path(), ["png"], 0.9).unwrap();
        assert!(target.validate().is_ok());
    }
}
