// Generated scripts and session reports on disk

use crate::error::ArtifactError;
use crate::report::Report;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Map every character outside `[A-Za-z0-9_-]` to `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    scripts_dir: PathBuf,
    reports_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(scripts_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    /// Both directories under one root, named like the defaults.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join("test_scripts"), root.join("reports"))
    }

    /// Write `source` as `test_<timestamp>_<name>.py`. Scripts saved in the
    /// same second under the same name get a numeric suffix.
    pub fn persist_script(&self, test_name: &str, source: &str) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.scripts_dir)?;

        let stem = format!(
            "test_{}_{}",
            Local::now().format(TIMESTAMP_FORMAT),
            sanitize_name(test_name)
        );
        let path = unique_path(&self.scripts_dir, &stem, "py");

        fs::write(&path, source)?;
        info!("Saved test script: {}", path.display());
        Ok(path)
    }

    pub fn write_report(&self, report: &Report) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.reports_dir)?;

        let stem = format!("test_report_{}", Local::now().format(TIMESTAMP_FORMAT));
        let path = unique_path(&self.reports_dir, &stem, "json");

        let content = serde_json::to_string_pretty(report)?;
        fs::write(&path, content)?;
        info!("Report saved to: {}", path.display());
        Ok(path)
    }
}

fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut counter = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Valid login: user/pass"), "Valid_login__user_pass");
        assert_eq!(sanitize_name("already-safe_name1"), "already-safe_name1");
        assert_eq!(sanitize_name("héllo"), "h_llo");
    }

    #[test]
    fn test_persist_script_naming() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::under(dir.path());

        let path = store.persist_script("Login works?", "print(1)").unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();

        assert!(path.starts_with(dir.path().join("test_scripts")));
        assert!(file_name.starts_with("test_"));
        assert!(file_name.ends_with("_Login_works_.py"));
        // test_ + YYYYmmdd_HHMMSS + _
        assert_eq!(&file_name[13..14], "_");
        assert_eq!(fs::read_to_string(&path).unwrap(), "print(1)");
    }

    #[test]
    fn test_same_name_same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::under(dir.path());

        let first = store.persist_script("dup", "a").unwrap();
        let second = store.persist_script("dup", "b").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "a");
        assert_eq!(fs::read_to_string(&second).unwrap(), "b");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::under(dir.path());

        let path = store.write_report(&Report::default()).unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("test_report_"));
        assert!(file_name.ends_with(".json"));

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["success_rate"], serde_json::json!(0.0));
    }
}
