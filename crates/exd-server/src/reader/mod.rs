//! # Parquet Reader
//!
//! This module implements the reader behind the external data service:
//!
//! - Locator resolution (`file://` URIs and plain paths)
//! - A session registry that shares one opened table per path
//! - Source-to-ODS type mapping
//! - Structure introspection and windowed value extraction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Reader                             │
//! │                             │                                │
//! │        ┌────────────────────┼─────────────────────┐          │
//! │        ▼                    ▼                     ▼          │
//! │ ┌──────────────┐   ┌─────────────────┐   ┌───────────────┐   │
//! │ │ Structure    │   │ SessionRegistry │   │ Value         │   │
//! │ │ Builder      │   │                 │   │ Extractor     │   │
//! │ │              │   │ - handles       │   │               │   │
//! │ │ - one group  │   │ - path cache    │   │ - window      │   │
//! │ │ - channels   │   │ - ref counts    │   │ - cast/encode │   │
//! │ └──────────────┘   └─────────────────┘   └───────────────┘   │
//! │        │                    │                     │          │
//! │        │                    ▼                     │          │
//! │        │           ┌─────────────────┐            │          │
//! │        └──────────►│  SourceTable    │◄───────────┘          │
//! │                    │  (Arrow batch)  │                       │
//! │                    └─────────────────┘                       │
//! │                             ▲                                │
//! │                    TableLoader (Parquet)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use exd_server::reader::{Reader, SourceIdentifier, StructureOptions, ValuesRequest};
//!
//! let reader = Reader::new();
//! let handle = reader.open(SourceIdentifier::new("file:///data/run42.parquet"))?;
//!
//! let structure = reader.get_structure(&handle, &StructureOptions::default())?;
//! for channel in &structure.groups[0].channels {
//!     println!("{} {} {}", channel.id, channel.name, channel.data_type);
//! }
//!
//! let values = reader.get_values(&handle, &ValuesRequest::new(vec![0, 1], 0, 100))?;
//! reader.close(&handle)?;
//! ```

mod engine;
mod error;
mod path;
mod registry;
mod result;
mod session;
mod structure;
mod table;
mod types;
mod values;

#[cfg(test)]
pub(crate) mod test_util;

pub use engine::{Reader, ReaderStats};
pub use error::{ErrorKind, ReaderError, ReaderResult};
pub use path::{resolve_path, source_name};
pub use registry::{RegistryStats, SessionGuard, SessionRegistry};
pub use result::{
    Channel, ChannelPayload, ChannelValues, Group, Structure, StructureOptions, ValuesRequest,
    ValuesResult, GROUP_ID, GROUP_NAME,
};
pub use session::{Handle, Session, SourceIdentifier};
pub use structure::build_structure;
pub use table::{LoadError, ParquetLoader, SourceTable, TableLoader, DEFAULT_READ_BATCH_SIZE};
pub use types::{map_data_type, DataType, SourcePrimitive};
pub use values::{extract_values, validate_group};
