//! Stream catalog types.
//!
//! A [`Catalog`] is the set of [`Stream`]s a connector exposes. A
//! [`ConfiguredCatalog`] is the caller's selection of those streams together
//! with the sync mode and cursor to use for each.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::{DestinationSyncMode, SyncMode};

/// Identity of a stream: its name scoped by an optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl StreamDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}.{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A discoverable stream exposed by a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// JSON schema of the records in this stream.
    pub json_schema: serde_json::Value,
    pub supported_sync_modes: Vec<SyncMode>,
    /// Whether the source decides the cursor (callers may not override it).
    #[serde(default)]
    pub source_defined_cursor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cursor_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_defined_primary_key: Option<Vec<String>>,
}

impl Stream {
    /// Stream supporting only full refresh.
    #[must_use]
    pub fn new(name: impl Into<String>, json_schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            json_schema,
            supported_sync_modes: vec![SyncMode::FullRefresh],
            source_defined_cursor: false,
            default_cursor_field: None,
            source_defined_primary_key: None,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        }
    }

    #[must_use]
    pub fn supports(&self, mode: SyncMode) -> bool {
        self.supported_sync_modes.contains(&mode)
    }
}

/// Structural violations in a catalog or configured catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate stream '{0}' in catalog")]
    DuplicateStream(StreamDescriptor),
    #[error("stream '{0}' is configured as incremental but has no cursor field")]
    MissingCursorField(StreamDescriptor),
    #[error("stream '{stream}' does not support sync mode '{mode}'")]
    UnsupportedSyncMode {
        stream: StreamDescriptor,
        mode: SyncMode,
    },
}

fn ensure_unique(descriptors: impl Iterator<Item = StreamDescriptor>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.clone()) {
            return Err(CatalogError::DuplicateStream(descriptor));
        }
    }
    Ok(())
}

/// Collection of streams discovered by a connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<Stream>,
}

impl Catalog {
    /// Check that stream identities are unique.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateStream`] naming the first repeat.
    pub fn validate(&self) -> Result<(), CatalogError> {
        ensure_unique(self.streams.iter().map(Stream::descriptor))
    }

    #[must_use]
    pub fn find(&self, descriptor: &StreamDescriptor) -> Option<&Stream> {
        self.streams.iter().find(|s| s.descriptor() == *descriptor)
    }

    /// Copy of this catalog with streams sorted by identity, for
    /// order-insensitive comparison.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut streams = self.streams.clone();
        streams.sort_by_key(Stream::descriptor);
        Self { streams }
    }
}

/// One caller-selected stream with its sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub stream: Stream,
    pub sync_mode: SyncMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_field: Option<String>,
    #[serde(default)]
    pub destination_sync_mode: DestinationSyncMode,
}

impl ConfiguredStream {
    #[must_use]
    pub fn full_refresh(stream: Stream) -> Self {
        Self {
            stream,
            sync_mode: SyncMode::FullRefresh,
            cursor_field: None,
            destination_sync_mode: DestinationSyncMode::Append,
        }
    }

    #[must_use]
    pub fn incremental(stream: Stream, cursor_field: impl Into<String>) -> Self {
        Self {
            stream,
            sync_mode: SyncMode::Incremental,
            cursor_field: Some(cursor_field.into()),
            destination_sync_mode: DestinationSyncMode::Append,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> StreamDescriptor {
        self.stream.descriptor()
    }

    /// Cursor field used for checkpointing, if the stream is incremental.
    #[must_use]
    pub fn incremental_cursor(&self) -> Option<&str> {
        match self.sync_mode {
            SyncMode::Incremental => self.cursor_field.as_deref(),
            SyncMode::FullRefresh => None,
        }
    }
}

/// The subset of a catalog selected for a sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Structural checks: unique identities, incremental streams carry a
    /// cursor field, and each chosen sync mode is supported by its stream.
    ///
    /// Whether the streams exist in a prior discover result is for the
    /// connector to decide.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        ensure_unique(self.streams.iter().map(ConfiguredStream::descriptor))?;
        for configured in &self.streams {
            if !configured.stream.supports(configured.sync_mode) {
                return Err(CatalogError::UnsupportedSyncMode {
                    stream: configured.descriptor(),
                    mode: configured.sync_mode,
                });
            }
            if configured.sync_mode == SyncMode::Incremental && configured.cursor_field.is_none()
            {
                return Err(CatalogError::MissingCursorField(configured.descriptor()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn find(&self, descriptor: &StreamDescriptor) -> Option<&ConfiguredStream> {
        self.streams.iter().find(|s| s.descriptor() == *descriptor)
    }
}
