//! Write surface of an experiment-tracking run.
//!
//! A run is a hierarchical, slash-delimited namespace.  This component only
//! needs the write half: field assignment, an accumulating append, and
//! artifact attachment.  Network transport, auth, and retries belong to the
//! concrete client behind the trait.

use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use sl_types::{SlError, SlResult};

use crate::value::{FieldValue, MapKey};

/// A self-contained document attached to a run path.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Interactive or static visualization as a standalone HTML document.
    Html(String),
    /// Full serialized study state (JSON bytes).
    Snapshot(Vec<u8>),
}

/// Write-only handle to a tracking run.
///
/// Re-assigning a path overwrites its value; [`RunHandle::append`] accumulates
/// values at a path in call order.  Implementations are free to buffer or
/// block; callers invoke these inline on the optimization thread.
pub trait RunHandle {
    fn assign(&mut self, path: &str, value: FieldValue) -> SlResult<()>;

    fn append(&mut self, path: &str, value: FieldValue) -> SlResult<()>;

    fn upload(&mut self, path: &str, artifact: Artifact) -> SlResult<()>;
}

/// Read surface of a tracking run, for reloading previously recorded state.
///
/// The callback itself only writes; reload utilities read the storage fields
/// and the snapshot artifact back off the run.
pub trait RunReader {
    fn read_field(&self, path: &str) -> Option<&FieldValue>;

    fn read_artifact(&self, path: &str) -> Option<&Artifact>;
}

/// Prefix-scoped view of a run: joins a base namespace onto every path
/// before delegating.  An empty base is a passthrough.
pub struct Namespace<R: RunHandle> {
    inner: R,
    base: String,
}

impl<R: RunHandle> Namespace<R> {
    pub fn new(inner: R, base: impl Into<String>) -> Self {
        Self {
            inner,
            base: base.into(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn join(&self, path: &str) -> String {
        if self.base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.base.trim_end_matches('/'), path)
        }
    }
}

impl<R: RunHandle> RunHandle for Namespace<R> {
    fn assign(&mut self, path: &str, value: FieldValue) -> SlResult<()> {
        let path = self.join(path);
        self.inner.assign(&path, value)
    }

    fn append(&mut self, path: &str, value: FieldValue) -> SlResult<()> {
        let path = self.join(path);
        self.inner.append(&path, value)
    }

    fn upload(&mut self, path: &str, artifact: Artifact) -> SlResult<()> {
        let path = self.join(path);
        self.inner.upload(&path, artifact)
    }
}

/// Reference [`RunHandle`] keeping everything in process.
///
/// Used by the test suite and as a wiring example for real clients.  Assigned
/// maps are flattened into child paths, so `assign("trials", {...})` lands as
/// `trials/...` leaves; the read accessors expose the flattened view.
#[derive(Debug)]
pub struct InMemoryRun {
    run_id: Uuid,
    fields: BTreeMap<String, FieldValue>,
    appends: BTreeMap<String, Vec<FieldValue>>,
    artifacts: BTreeMap<String, Artifact>,
}

impl InMemoryRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            fields: BTreeMap::new(),
            appends: BTreeMap::new(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Leaf value at a flattened path.
    pub fn field(&self, path: &str) -> Option<&FieldValue> {
        self.fields.get(path)
    }

    /// All values appended at a path, in call order.
    pub fn appended(&self, path: &str) -> &[FieldValue] {
        self.appends.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.get(path)
    }

    /// Flattened paths currently assigned, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn artifact_paths(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    fn write_flattened(&mut self, path: &str, value: FieldValue) -> SlResult<()> {
        match value {
            FieldValue::Map(entries) => {
                for (key, child) in entries {
                    let key = match key {
                        MapKey::Str(s) => s,
                        MapKey::Int(i) => {
                            return Err(SlError::Track(format!(
                                "non-string key {i} under '{path}'; namespace keys must be strings"
                            )))
                        }
                    };
                    let child_path = format!("{path}/{key}");
                    self.write_flattened(&child_path, child)?;
                }
                Ok(())
            }
            leaf => {
                self.fields.insert(path.to_string(), leaf);
                Ok(())
            }
        }
    }
}

impl Default for InMemoryRun {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReader for InMemoryRun {
    fn read_field(&self, path: &str) -> Option<&FieldValue> {
        self.field(path)
    }

    fn read_artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifact(path)
    }
}

impl RunHandle for InMemoryRun {
    fn assign(&mut self, path: &str, value: FieldValue) -> SlResult<()> {
        debug!(run_id = %self.run_id, path, "assign");
        self.write_flattened(path, value)
    }

    fn append(&mut self, path: &str, value: FieldValue) -> SlResult<()> {
        debug!(run_id = %self.run_id, path, "append");
        self.appends.entry(path.to_string()).or_default().push(value);
        Ok(())
    }

    fn upload(&mut self, path: &str, artifact: Artifact) -> SlResult<()> {
        debug!(run_id = %self.run_id, path, "upload");
        self.artifacts.insert(path.to_string(), artifact);
        Ok(())
    }
}
