//! # exd-server
//!
//! ASAM ODS external data reader for Apache Parquet files.
//!
//! This crate provides:
//!
//! - **Reader**: Opens Parquet files behind session handles, shares one
//!   loaded table per path across sessions, and answers structure and
//!   windowed value requests.
//!
//! - **gRPC Server**: The `ods.external_data.ExternalDataReader` service on
//!   top of the reader.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use exd_server::config::ServerConfig;
//! use exd_server::grpc::GrpcServer;
//! use exd_server::reader::Reader;
//!
//! let reader = Arc::new(Reader::new());
//! let server = GrpcServer::new(reader, ServerConfig::default());
//! server.serve().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Parquet reader - session registry, structure and values.
pub mod reader;

/// gRPC service implementation.
pub mod grpc;

/// Server configuration.
pub mod config;

// Re-export commonly used types
pub use config::ServerConfig;
pub use grpc::{ExdService, GrpcServer};
pub use reader::{
    DataType, ErrorKind, Handle, Reader, ReaderError, ReaderResult, ReaderStats, SourceIdentifier,
    StructureOptions, ValuesRequest,
};
