//! Session handles and per-session state.
//!
//! A session is created by `Open` and lives until `Close`. It remembers the
//! identifier the caller opened with and shares the opened table with every
//! other session on the same canonical path.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::table::SourceTable;

/// Locator of a source as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceIdentifier {
    /// Source URI or path.
    pub url: String,
    /// Opaque open parameters. Stored and echoed back, never interpreted.
    pub parameters: String,
}

impl SourceIdentifier {
    /// Creates an identifier with empty parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parameters: String::new(),
        }
    }

    /// Sets the open parameters.
    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }
}

/// Opaque session handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(String);

impl Handle {
    /// Wraps a handle string received from a caller.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(uuid.into())
    }

    /// Returns the handle string.
    pub fn uuid(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle_{}", self.0)
    }
}

/// State of one open session.
#[derive(Debug)]
pub struct Session {
    handle: Handle,
    identifier: SourceIdentifier,
    table: Arc<SourceTable>,
}

impl Session {
    pub(crate) fn new(handle: Handle, identifier: SourceIdentifier, table: Arc<SourceTable>) -> Self {
        Self {
            handle,
            identifier,
            table,
        }
    }

    /// Returns the session handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the identifier the session was opened with.
    pub fn identifier(&self) -> &SourceIdentifier {
        &self.identifier
    }

    /// Returns the shared table.
    pub fn table(&self) -> &Arc<SourceTable> {
        &self.table
    }

    /// Returns the canonical path of the source.
    pub fn path(&self) -> &Path {
        self.table.path()
    }
}
