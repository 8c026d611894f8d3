//! Resolves a study's storage backend into a reproducible descriptor.
//!
//! The engine's backend handles are foreign objects; classification works by
//! probing the [`StorageBackend`] attribute surface, never by matching on
//! concrete types.  The result is a closed tagged union over what we emit.

use tracing::debug;

use sl_track::{Artifact, FieldValue, RunReader};
use sl_types::{SlError, SlResult, Study, StudySnapshot};

/// Emitted name for a backend this resolver does not recognize.
pub const UNKNOWN_STORAGE_TYPE: &str = "unknown storage type";
/// Emitted URL placeholder for an unrecognized backend.
pub const UNKNOWN_STORAGE_URL: &str = "unknown storage url";

/// Where a study's durable state lives, resolved for later reloading.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageDescriptor {
    /// Ephemeral in-process storage.  Carries a full serialized study
    /// snapshot, since there is no external location to hand back later.
    InMemory { snapshot: Vec<u8> },
    /// A store re-openable by canonical name and connection string.
    Remote { storage_type: String, url: String },
    /// A backend this resolver does not recognize.  Reported, never an error.
    Unknown,
}

impl StorageDescriptor {
    /// Canonical type name as written to the namespace.
    pub fn storage_type(&self) -> &str {
        match self {
            Self::InMemory { .. } => "InMemoryStorage",
            Self::Remote { storage_type, .. } => storage_type,
            Self::Unknown => UNKNOWN_STORAGE_TYPE,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InMemory { .. } => None,
            Self::Remote { url, .. } => Some(url),
            Self::Unknown => Some(UNKNOWN_STORAGE_URL),
        }
    }
}

/// Classify a study's storage backend.
///
/// Returns `Ok(None)` when an attribute needed for classification is missing
/// (library-version skew): the caller emits nothing for the storage fields
/// rather than failing the whole callback.  Serialization failures for the
/// in-memory snapshot do propagate.
pub fn resolve_storage(study: &Study) -> SlResult<Option<StorageDescriptor>> {
    let backend = study.storage.as_ref();
    let descriptor = match backend.backend_name() {
        "InMemoryStorage" => {
            let snapshot = serde_json::to_vec(&study.snapshot())?;
            Some(StorageDescriptor::InMemory { snapshot })
        }
        // A caching layer typically wraps the relational store; unwrap one
        // level and report the canonical backend underneath.
        "CachedStorage" => backend
            .inner()
            .and_then(|inner| inner.url())
            .map(|url| StorageDescriptor::Remote {
                storage_type: "RDBStorage".to_string(),
                url: url.to_string(),
            }),
        "RDBStorage" => backend.url().map(|url| StorageDescriptor::Remote {
            storage_type: "RDBStorage".to_string(),
            url: url.to_string(),
        }),
        "RedisStorage" => backend.url().map(|url| StorageDescriptor::Remote {
            storage_type: "RedisStorage".to_string(),
            url: url.to_string(),
        }),
        other => {
            debug!(backend = other, "unrecognized storage backend");
            Some(StorageDescriptor::Unknown)
        }
    };
    Ok(descriptor)
}

/// Rehydrate a study from an in-memory snapshot produced by
/// [`resolve_storage`].  Remote descriptors are re-opened through the storage
/// client instead, using the recorded name and URL.
pub fn load_snapshot(bytes: &[u8]) -> SlResult<Study> {
    let snapshot: StudySnapshot = serde_json::from_slice(bytes)?;
    Ok(snapshot.into_study())
}

/// Result of reloading a study from a run's recorded storage fields.
#[derive(Debug)]
pub enum LoadedStudy {
    /// Rehydrated from the `study/study` snapshot artifact.
    InMemory(Study),
    /// Re-openable through the storage client with the recorded name and
    /// connection string; the reconnect itself stays the client's job.
    Remote { study_name: String, url: String },
}

/// Reload dispatch over the storage fields previously written to a run.
///
/// Reads `study/storage_type` back off the run: the in-memory case
/// deserializes the snapshot artifact, every other recorded type hands back
/// the `(study_name, url)` pair.  Fails when the run carries no storage
/// fields (the study section was never written).
pub fn load_study_from_run<R: RunReader>(run: &R) -> SlResult<LoadedStudy> {
    let storage_type = match run.read_field("study/storage_type") {
        Some(FieldValue::Str(storage_type)) => storage_type.as_str(),
        _ => {
            return Err(SlError::MissingAttribute {
                object: "run",
                attribute: "study/storage_type",
            })
        }
    };

    if storage_type == "InMemoryStorage" {
        let Some(Artifact::Snapshot(bytes)) = run.read_artifact("study/study") else {
            return Err(SlError::MissingAttribute {
                object: "run",
                attribute: "study/study",
            });
        };
        return Ok(LoadedStudy::InMemory(load_snapshot(bytes)?));
    }

    let Some(FieldValue::Str(study_name)) = run.read_field("study/study_name") else {
        return Err(SlError::MissingAttribute {
            object: "run",
            attribute: "study/study_name",
        });
    };
    let Some(FieldValue::Str(url)) = run.read_field("study/storage_url") else {
        return Err(SlError::MissingAttribute {
            object: "run",
            attribute: "study/storage_url",
        });
    };
    Ok(LoadedStudy::Remote {
        study_name: study_name.clone(),
        url: url.clone(),
    })
}
