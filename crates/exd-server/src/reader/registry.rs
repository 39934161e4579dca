//! Session registry and shared source cache.
//!
//! The registry hands out handles and keeps one opened table per canonical
//! path, shared by every session on that path and reference counted.
//!
//! # Locking
//!
//! The handle counter, the handle map and the path cache only change inside
//! the registry mutex, which `open` and `close` hold for their whole
//! duration. Structure and value reads never take it: they look the handle up
//! in a concurrent map, clone the session's `Arc`, and read the immutable
//! table outside any lock. A table evicted by the last `close` stays alive
//! until in-flight readers drop their reference.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::{ReaderError, ReaderResult};
use super::path::resolve_path;
use super::session::{Handle, Session, SourceIdentifier};
use super::table::{ParquetLoader, SourceTable, TableLoader};

/// One opened table and the number of sessions holding it.
#[derive(Debug)]
struct CachedSource {
    table: Arc<SourceTable>,
    ref_count: usize,
}

/// State mutated under the registry mutex.
#[derive(Debug, Default)]
struct RegistryState {
    /// Last issued handle number.
    last_handle: u64,
    /// Canonical path → shared table.
    sources: HashMap<PathBuf, CachedSource>,
}

/// Registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Currently open sessions.
    pub open_sessions: usize,
    /// Distinct paths with an opened table.
    pub cached_sources: usize,
    /// Handles issued since the registry was created.
    pub total_sessions: u64,
}

/// Issues session handles and shares opened tables between them.
pub struct SessionRegistry {
    loader: Arc<dyn TableLoader>,
    state: Mutex<RegistryState>,
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    /// Creates a registry that reads Parquet files.
    pub fn new() -> Self {
        Self::with_loader(Arc::new(ParquetLoader::new()))
    }

    /// Creates a registry with a custom table loader.
    pub fn with_loader(loader: Arc<dyn TableLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(RegistryState::default()),
            sessions: DashMap::new(),
        }
    }

    /// Opens a session on the source named by `identifier`.
    ///
    /// The table is loaded on the first open of its canonical path; later
    /// opens of the same path share it and bump its reference count.
    pub fn open(&self, identifier: SourceIdentifier) -> ReaderResult<Handle> {
        let path = resolve_path(&identifier.url)?;
        if !path.is_file() {
            warn!(url = %identifier.url, path = %path.display(), "source not accessible");
            return Err(ReaderError::not_accessible(
                &identifier.url,
                "not an existing regular file",
            ));
        }

        let mut state = self.state.lock();

        let table = match state.sources.entry(path.clone()) {
            Entry::Occupied(mut entry) => {
                let cached = entry.get_mut();
                cached.ref_count += 1;
                Arc::clone(&cached.table)
            }
            Entry::Vacant(entry) => {
                let batch = self
                    .loader
                    .load(&path)
                    .map_err(|e| ReaderError::not_accessible(&identifier.url, e))?;
                let table = Arc::new(SourceTable::new(path.clone(), batch));
                entry.insert(CachedSource {
                    table: Arc::clone(&table),
                    ref_count: 1,
                });
                debug!(
                    path = %path.display(),
                    rows = table.num_rows(),
                    columns = table.num_columns(),
                    "loaded source"
                );
                table
            }
        };

        state.last_handle += 1;
        let handle = Handle::new(state.last_handle.to_string());
        self.sessions.insert(
            handle.uuid().to_string(),
            Arc::new(Session::new(handle.clone(), identifier, table)),
        );

        info!(handle = handle.uuid(), path = %path.display(), "opened session");
        Ok(handle)
    }

    /// Closes a session and releases its hold on the shared table.
    pub fn close(&self, handle: &Handle) -> ReaderResult<()> {
        let mut state = self.state.lock();

        let (_, session) = self
            .sessions
            .remove(handle.uuid())
            .ok_or_else(|| ReaderError::UnknownHandle(handle.uuid().to_string()))?;

        if let Entry::Occupied(mut entry) = state.sources.entry(session.path().to_path_buf()) {
            if entry.get().ref_count > 1 {
                entry.get_mut().ref_count -= 1;
            } else {
                entry.remove();
                debug!(path = %session.path().display(), "released source");
            }
        }

        info!(handle = handle.uuid(), path = %session.path().display(), "closed session");
        Ok(())
    }

    /// Opens a session that is closed when the returned guard drops.
    pub fn open_scoped(&self, identifier: SourceIdentifier) -> ReaderResult<SessionGuard<'_>> {
        let handle = self.open(identifier)?;
        Ok(SessionGuard {
            registry: self,
            handle,
        })
    }

    /// Looks up an open session without taking the registry lock.
    pub fn session(&self, handle: &Handle) -> ReaderResult<Arc<Session>> {
        self.sessions
            .get(handle.uuid())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ReaderError::UnknownHandle(handle.uuid().to_string()))
    }

    /// Returns how many sessions share the table at `path`, if it is open.
    pub fn ref_count(&self, path: &Path) -> Option<usize> {
        self.state.lock().sources.get(path).map(|cached| cached.ref_count)
    }

    /// Returns the number of open sessions.
    pub fn open_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns registry statistics.
    pub fn stats(&self) -> RegistryStats {
        let state = self.state.lock();
        RegistryStats {
            open_sessions: self.sessions.len(),
            cached_sources: state.sources.len(),
            total_sessions: state.last_handle,
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// A session that closes itself on drop.
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    handle: Handle,
}

impl<'a> SessionGuard<'a> {
    /// Returns the session handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the open session.
    pub fn session(&self) -> ReaderResult<Arc<Session>> {
        self.registry.session(&self.handle)
    }
}

impl<'a> Drop for SessionGuard<'a> {
    fn drop(&mut self) {
        if let Err(e) = self.registry.close(&self.handle) {
            warn!(handle = self.handle.uuid(), "failed to close scoped session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::error::ErrorKind;
    use crate::reader::table::LoadError;
    use crate::reader::test_util::{file_url, write_int_parquet, TestResult};
    use arrow::record_batch::RecordBatch;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts how often each load reaches the parser.
    struct CountingLoader {
        inner: ParquetLoader,
        loads: AtomicUsize,
    }

    impl TableLoader for CountingLoader {
        fn load(&self, path: &Path) -> Result<RecordBatch, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(path)
        }
    }

    fn fixture(tmp: &TempDir, name: &str) -> TestResult<PathBuf> {
        let path = tmp.path().join(name);
        write_int_parquet(&path, &[1, 2, 3])?;
        Ok(path)
    }

    #[test]
    fn test_open_close() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "a.parquet")?;
        let registry = SessionRegistry::new();

        let handle = registry.open(SourceIdentifier::new(file_url(&path)))?;
        assert_eq!(handle.uuid(), "1");
        assert_eq!(registry.open_session_count(), 1);
        assert_eq!(registry.ref_count(&path), Some(1));

        registry.close(&handle)?;
        assert_eq!(registry.open_session_count(), 0);
        assert_eq!(registry.ref_count(&path), None);
        Ok(())
    }

    #[test]
    fn test_shared_source_ref_counting() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "shared.parquet")?;
        let loader = Arc::new(CountingLoader {
            inner: ParquetLoader::new(),
            loads: AtomicUsize::new(0),
        });
        let registry = SessionRegistry::with_loader(loader.clone());

        let first = registry.open(SourceIdentifier::new(file_url(&path)))?;
        // Different spelling, same canonical path.
        let second = registry.open(SourceIdentifier::new(path.to_string_lossy()))?;

        assert_ne!(first, second);
        assert_eq!(registry.ref_count(&path), Some(2));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(
            registry.session(&first)?.table(),
            registry.session(&second)?.table()
        ));

        registry.close(&first)?;
        assert_eq!(registry.ref_count(&path), Some(1));
        assert_eq!(registry.session(&second)?.table().num_rows(), 3);

        registry.close(&second)?;
        assert_eq!(registry.ref_count(&path), None);
        assert_eq!(registry.stats().cached_sources, 0);

        // Reopening after full release loads again.
        let third = registry.open(SourceIdentifier::new(file_url(&path)))?;
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        registry.close(&third)?;
        Ok(())
    }

    #[test]
    fn test_handles_are_never_reused() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "b.parquet")?;
        let registry = SessionRegistry::new();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let handle = registry.open(SourceIdentifier::new(file_url(&path)))?;
            assert!(seen.insert(handle.uuid().to_string()));
            registry.close(&handle)?;
        }
        assert_eq!(registry.stats().total_sessions, 10);
        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        let registry = SessionRegistry::new();
        let err = registry
            .open(SourceIdentifier::new("file:///definitely/not/here.parquet"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAccessible);
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[test]
    fn test_open_directory_is_not_accessible() -> TestResult {
        let tmp = TempDir::new()?;
        let registry = SessionRegistry::new();
        let err = registry
            .open(SourceIdentifier::new(file_url(tmp.path())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAccessible);
        Ok(())
    }

    #[test]
    fn test_open_unreadable_file_leaves_no_state() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("broken.parquet");
        std::fs::write(&path, b"PAR1 but not really")?;
        let registry = SessionRegistry::new();

        let err = registry
            .open(SourceIdentifier::new(file_url(&path)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAccessible);
        assert_eq!(registry.ref_count(&path), None);
        assert_eq!(registry.open_session_count(), 0);
        Ok(())
    }

    #[test]
    fn test_close_twice_is_rejected() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "c.parquet")?;
        let registry = SessionRegistry::new();

        let handle = registry.open(SourceIdentifier::new(file_url(&path)))?;
        registry.close(&handle)?;

        let err = registry.close(&handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            registry.session(&handle).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[test]
    fn test_scoped_session_closes_on_drop() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "d.parquet")?;
        let registry = SessionRegistry::new();

        {
            let guard = registry.open_scoped(SourceIdentifier::new(file_url(&path)))?;
            assert_eq!(guard.session()?.table().num_rows(), 3);
            assert_eq!(registry.ref_count(&path), Some(1));
        }

        assert_eq!(registry.ref_count(&path), None);
        assert_eq!(registry.open_session_count(), 0);
        Ok(())
    }

    #[test]
    fn test_reader_outlives_release() -> TestResult {
        let tmp = TempDir::new()?;
        let path = fixture(&tmp, "e.parquet")?;
        let registry = SessionRegistry::new();

        let handle = registry.open(SourceIdentifier::new(file_url(&path)))?;
        let session = registry.session(&handle)?;
        registry.close(&handle)?;

        // The in-flight reference keeps the table readable.
        assert_eq!(session.table().num_rows(), 3);
        assert_eq!(session.identifier().url, file_url(&path));
        Ok(())
    }

    #[test]
    fn test_concurrent_open_close() -> TestResult {
        let tmp = TempDir::new()?;
        let paths = [fixture(&tmp, "p0.parquet")?, fixture(&tmp, "p1.parquet")?];
        let registry = Arc::new(SessionRegistry::new());

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let url = file_url(&paths[i % 2]);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let handle = registry.open(SourceIdentifier::new(url.clone())).unwrap();
                        assert_eq!(registry.session(&handle).unwrap().table().num_rows(), 3);
                        registry.close(&handle).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().expect("worker panicked");
        }

        let stats = registry.stats();
        assert_eq!(stats.open_sessions, 0);
        assert_eq!(stats.cached_sources, 0);
        assert_eq!(stats.total_sessions, 200);
        Ok(())
    }
}
