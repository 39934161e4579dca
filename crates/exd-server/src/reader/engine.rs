//! Reader engine.
//!
//! [`Reader`] is the entry point the service layer talks to. It owns the
//! session registry and routes each operation to the structure builder or
//! the value extractor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::error::{ReaderError, ReaderResult};
use super::registry::{SessionGuard, SessionRegistry};
use super::result::{Structure, StructureOptions, ValuesRequest, ValuesResult};
use super::session::{Handle, SourceIdentifier};
use super::structure::build_structure;
use super::table::TableLoader;
use super::values::{extract_values, validate_group};

/// Reader statistics.
#[derive(Debug, Clone, Default)]
pub struct ReaderStats {
    /// Currently open sessions.
    pub open_sessions: usize,
    /// Distinct sources held open.
    pub cached_sources: usize,
    /// Sessions opened since start.
    pub total_sessions: u64,
    /// Uptime.
    pub uptime: Duration,
}

/// Serves structure and value requests for Parquet sources.
#[derive(Debug)]
pub struct Reader {
    registry: SessionRegistry,
    started_at: Instant,
}

impl Reader {
    /// Creates a reader backed by the Parquet loader.
    pub fn new() -> Self {
        Self::with_registry(SessionRegistry::new())
    }

    /// Creates a reader with a custom table loader.
    pub fn with_loader(loader: Arc<dyn TableLoader>) -> Self {
        Self::with_registry(SessionRegistry::with_loader(loader))
    }

    fn with_registry(registry: SessionRegistry) -> Self {
        Self {
            registry,
            started_at: Instant::now(),
        }
    }

    /// Opens a session on a source.
    pub fn open(&self, identifier: SourceIdentifier) -> ReaderResult<Handle> {
        self.registry.open(identifier)
    }

    /// Opens a session closed automatically when the guard drops.
    pub fn open_scoped(&self, identifier: SourceIdentifier) -> ReaderResult<SessionGuard<'_>> {
        self.registry.open_scoped(identifier)
    }

    /// Closes a session.
    pub fn close(&self, handle: &Handle) -> ReaderResult<()> {
        self.registry.close(handle)
    }

    /// Describes the source behind `handle`.
    pub fn get_structure(
        &self,
        handle: &Handle,
        options: &StructureOptions,
    ) -> ReaderResult<Structure> {
        let session = self.registry.session(handle)?;
        debug!(handle = handle.uuid(), ?options, "structure request");

        build_structure(&session, options).map_err(|e| {
            warn!(handle = handle.uuid(), "structure request rejected: {}", e);
            e
        })
    }

    /// Reads a row window of the requested channels.
    pub fn get_values(&self, handle: &Handle, request: &ValuesRequest) -> ReaderResult<ValuesResult> {
        validate_group(request.group_id)?;
        let session = self.registry.session(handle)?;
        debug!(
            handle = handle.uuid(),
            channels = request.channel_ids.len(),
            start = request.start,
            limit = request.limit,
            "values request"
        );

        extract_values(session.table(), request).map_err(|e| {
            warn!(handle = handle.uuid(), "values request rejected: {}", e);
            e
        })
    }

    /// Extended value access. Not supported.
    pub fn get_values_ex(&self, _handle: &Handle, _request: &ValuesRequest) -> ReaderResult<ValuesResult> {
        Err(ReaderError::Unimplemented("GetValuesEx"))
    }

    /// Returns the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns reader statistics.
    pub fn stats(&self) -> ReaderStats {
        let registry = self.registry.stats();
        ReaderStats {
            open_sessions: registry.open_sessions,
            cached_sources: registry.cached_sources,
            total_sessions: registry.total_sessions,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}
