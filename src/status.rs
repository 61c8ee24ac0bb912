//! Status artifact publishing.
//!
//! The status file is the only coupling between the daemon and its
//! observers: a JSON document rewritten after every state transition and
//! polled by the admin web view (or `harvest status`). The daemon is the
//! single writer; readers may sample the file at any instant, so every
//! publish replaces the document atomically via a sibling temp file and
//! rename.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::PublishError;
use crate::state::{DaemonState, StageResult};

/// The externally visible status document.
///
/// Optional fields are omitted from the JSON when absent; readers must
/// treat them as such and must tolerate the file not existing before the
/// first publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDocument {
    pub running: bool,
    /// 0 until the first cycle starts.
    pub current_cycle_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    pub stages_completed: Vec<StageResult>,
    pub total_stages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shutdown_requested: bool,
    pub last_update: DateTime<Utc>,
}

impl StatusDocument {
    /// Snapshot the supervisor state into the external document shape.
    pub fn from_state(state: &DaemonState) -> Self {
        let cycle = state.cycle.as_ref();
        Self {
            running: state.running,
            current_cycle_number: state.last_cycle_number(),
            current_stage: cycle.and_then(|c| c.current_stage.clone()),
            stages_completed: cycle.map(|c| c.stages.clone()).unwrap_or_default(),
            total_stages: state.total_stages,
            started_at: cycle.map(|c| c.started_at),
            finished_at: cycle.and_then(|c| c.finished_at),
            next_run_at: state.next_run_at,
            shutdown_requested: state.shutdown_requested,
            last_update: Utc::now(),
        }
    }
}

/// Writes the status artifact. One instance per daemon.
pub struct StatusPublisher {
    path: PathBuf,
}

impl StatusPublisher {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publish the current state, replacing the previous artifact.
    ///
    /// Write failures are logged and swallowed: losing one update degrades
    /// observability but must never abort the pipeline.
    pub fn publish(&self, state: &DaemonState) {
        if let Err(e) = self.write(&StatusDocument::from_state(state)) {
            warn!(path = %self.path.display(), error = %e, "failed to publish status");
        }
    }

    /// Serialize and atomically replace the artifact: write a sibling temp
    /// file, sync it, then rename it over the destination so a concurrent
    /// reader never observes a torn document.
    fn write(&self, doc: &StatusDocument) -> Result<(), PublishError> {
        use std::io::Write;

        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file =
                std::fs::File::create(&tmp_path).map_err(|source| PublishError::WriteFailed {
                    path: tmp_path.clone(),
                    source,
                })?;
            file.write_all(json.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|source| PublishError::WriteFailed {
                    path: tmp_path.clone(),
                    source,
                })?;
        }
        std::fs::rename(&tmp_path, &self.path).map_err(|source| PublishError::ReplaceFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DaemonState;
    use tempfile::tempdir;

    fn state_with_one_stage() -> DaemonState {
        let mut state = DaemonState::new(2);
        state.begin_cycle(Utc::now());
        state.set_current_stage("catalog");
        state.record_stage(StageResult {
            name: "catalog".to_string(),
            exit_code: 0,
            duration_seconds: 1.5,
            completed_at: Utc::now(),
        });
        state
    }

    #[test]
    fn from_state_maps_idle_state() {
        let state = DaemonState::new(3);
        let doc = StatusDocument::from_state(&state);
        assert!(!doc.running);
        assert_eq!(doc.current_cycle_number, 0);
        assert!(doc.current_stage.is_none());
        assert!(doc.stages_completed.is_empty());
        assert_eq!(doc.total_stages, 3);
        assert!(doc.started_at.is_none());
        assert!(doc.next_run_at.is_none());
        assert!(!doc.shutdown_requested);
    }

    #[test]
    fn from_state_maps_active_cycle() {
        let mut state = state_with_one_stage();
        state.set_current_stage("chapters");

        let doc = StatusDocument::from_state(&state);
        assert!(doc.running);
        assert_eq!(doc.current_cycle_number, 1);
        assert_eq!(doc.current_stage.as_deref(), Some("chapters"));
        assert_eq!(doc.stages_completed.len(), 1);
        assert_eq!(doc.stages_completed[0].name, "catalog");
        assert!(doc.started_at.is_some());
        assert!(doc.finished_at.is_none());
    }

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let state = DaemonState::new(1);
        let doc = StatusDocument::from_state(&state);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("current_stage"));
        assert!(!json.contains("next_run_at"));
        assert!(!json.contains("started_at"));
    }

    #[test]
    fn document_roundtrips_through_json() {
        let mut state = state_with_one_stage();
        state.finish_cycle(Utc::now());
        state.set_next_run(Utc::now());

        let doc = StatusDocument::from_state(&state);
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: StatusDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.current_cycle_number, 1);
        assert_eq!(parsed.stages_completed.len(), 1);
        assert_eq!(parsed.stages_completed[0].exit_code, 0);
        assert!(parsed.finished_at.is_some());
        assert!(parsed.next_run_at.is_some());
    }

    #[test]
    fn publish_writes_parseable_document() {
        let dir = tempdir().unwrap();
        let publisher = StatusPublisher::new(dir.path().join("status.json"));

        publisher.publish(&state_with_one_stage());

        let content = std::fs::read_to_string(publisher.path()).unwrap();
        let doc: StatusDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(doc.current_cycle_number, 1);
    }

    #[test]
    fn publish_replaces_previous_document_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let publisher = StatusPublisher::new(&path);

        let mut state = DaemonState::new(1);
        publisher.publish(&state);
        state.begin_cycle(Utc::now());
        publisher.publish(&state);

        let doc: StatusDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.current_cycle_number, 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn publish_into_missing_directory_is_swallowed() {
        let dir = tempdir().unwrap();
        let publisher = StatusPublisher::new(dir.path().join("no-such-dir/status.json"));
        // Must not panic or propagate.
        publisher.publish(&DaemonState::new(1));
    }

    #[test]
    fn concurrent_reader_never_sees_torn_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let publisher = StatusPublisher::new(&path);

        // Make the document big enough that a non-atomic write would be
        // observable mid-way.
        let mut state = DaemonState::new(200);
        state.begin_cycle(Utc::now());
        for i in 0..200 {
            state.record_stage(StageResult {
                name: format!("stage-with-a-reasonably-long-name-{i}"),
                exit_code: 0,
                duration_seconds: 123.456,
                completed_at: Utc::now(),
            });
        }
        publisher.publish(&state);

        let reader_path = path.clone();
        let reader = std::thread::spawn(move || {
            for _ in 0..200 {
                let content = std::fs::read_to_string(&reader_path).unwrap();
                serde_json::from_str::<StatusDocument>(&content)
                    .expect("reader observed a torn status document");
            }
        });

        for _ in 0..200 {
            publisher.publish(&state);
        }
        reader.join().unwrap();
    }
}
