// agentflow-pipeline/src/artifacts.rs
// ============================================================================
// Module: Artifact Writer (C11)
// Description: Writes run artifacts under a per-run directory, appending to
//              `.ndjson` files and overwriting everything else.
// Purpose: Implement agentflow_core::ArtifactSink for a local filesystem
//          layout matching spec §6 (`preflight_plan.json`,
//          `execution_trace.ndjson`, `router_metrics.json`,
//          `meta_report.md`).
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `FileArtifactSink` path-escape protections
//! (component/total length caps, rejecting absolute paths and `..`
//! components), adapted from a synchronous, pre-built-path sink to an
//! async one that resolves `root.join(run_id).join(name)` per call and
//! appends when `name` ends in `.ndjson`.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use agentflow_core::ArtifactError;
use agentflow_core::ArtifactSink;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Maximum length of a single path component accepted for an artifact name.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length accepted for an artifact name.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Writes run artifacts under `root/{run_id}/{name}`.
pub struct FileArtifactSink {
    /// Directory under which each run gets its own subdirectory.
    root: PathBuf,
}

impl FileArtifactSink {
    /// Builds a sink rooted at `root`, which is created if missing.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `run_id`/`name` to a path guaranteed to stay under `self.root`.
    fn resolve(&self, run_id: &str, name: &str) -> Result<PathBuf, ArtifactError> {
        let run_component = Path::new(run_id);
        ensure_relative_path(run_component, run_id)?;
        let name_component = Path::new(name);
        ensure_relative_path(name_component, name)?;

        let candidate = self.root.join(run_id).join(name);
        validate_path(&candidate, name)?;
        Ok(candidate)
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn write_artifact(&self, run_id: &str, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let path = self.resolve(run_id, name)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).await.map_err(|err| write_failed(name, err))?;

        if name.ends_with(".ndjson") {
            let mut file = fs::OpenOptions::new().create(true).append(true).open(&path).await.map_err(|err| write_failed(name, err))?;
            file.write_all(bytes).await.map_err(|err| write_failed(name, err))?;
            file.flush().await.map_err(|err| write_failed(name, err))?;
        } else {
            fs::write(&path, bytes).await.map_err(|err| write_failed(name, err))?;
        }
        Ok(())
    }
}

/// Builds an [`ArtifactError::WriteFailed`] for `name` from an I/O error.
fn write_failed(name: &str, error: std::io::Error) -> ArtifactError {
    ArtifactError::WriteFailed { name: name.to_string(), message: error.to_string() }
}

/// Rejects absolute paths and parent-directory traversal in `candidate`,
/// reporting `original` (the caller-supplied string) in the error.
fn ensure_relative_path(candidate: &Path, original: &str) -> Result<(), ArtifactError> {
    if candidate.is_absolute() {
        return Err(write_failed_message(original, "path must be relative"));
    }
    for component in candidate.components() {
        match component {
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(write_failed_message(original, "path must not escape the run directory"));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Checks total and per-component length limits on `path`.
fn validate_path(path: &Path, original: &str) -> Result<(), ArtifactError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(write_failed_message(original, "path exceeds maximum total length"));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(write_failed_message(original, "path component exceeds maximum length"));
        }
    }
    Ok(())
}

/// Builds an [`ArtifactError::WriteFailed`] carrying a fixed message rather
/// than a wrapped I/O error.
fn write_failed_message(name: &str, message: &str) -> ArtifactError {
    ArtifactError::WriteFailed { name: name.to_string(), message: message.to_string() }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn writes_json_artifact_under_the_run_directory() {
        let dir = tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        sink.write_artifact("run-1", "preflight_plan.json", b"{}").await.unwrap();
        let written = fs::read(dir.path().join("run-1").join("preflight_plan.json")).await.unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn appends_to_ndjson_artifacts_across_calls() {
        let dir = tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        sink.write_artifact("run-1", "execution_trace.ndjson", b"{\"a\":1}\n").await.unwrap();
        sink.write_artifact("run-1", "execution_trace.ndjson", b"{\"a\":2}\n").await.unwrap();
        let written = fs::read_to_string(dir.path().join("run-1").join("execution_trace.ndjson")).await.unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn overwrites_non_ndjson_artifacts() {
        let dir = tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        sink.write_artifact("run-1", "meta_report.md", b"first").await.unwrap();
        sink.write_artifact("run-1", "meta_report.md", b"second").await.unwrap();
        let written = fs::read_to_string(dir.path().join("run-1").join("meta_report.md")).await.unwrap();
        assert_eq!(written, "second");
    }

    #[tokio::test]
    async fn rejects_a_run_id_that_escapes_the_root() {
        let dir = tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        let err = sink.write_artifact("../escape", "meta_report.md", b"x").await.unwrap_err();
        assert!(matches!(err, ArtifactError::WriteFailed { .. }));
    }

    #[tokio::test]
    async fn rejects_an_artifact_name_that_escapes_the_run_directory() {
        let dir = tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        let err = sink.write_artifact("run-1", "../../etc/passwd", b"x").await.unwrap_err();
        assert!(matches!(err, ArtifactError::WriteFailed { .. }));
    }
}
