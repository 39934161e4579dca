//! ASAM ODS external data gRPC protocol definitions
//!
//! This crate provides the protobuf messages and tonic service stubs for the
//! external data reader protocol.
//!
//! # Overview
//!
//! The protocol defines:
//! - Session handles (`Open` / `Close`)
//! - Structure discovery (one group of typed channels)
//! - Windowed value access per channel
//!
//! # Example
//!
//! ```ignore
//! use exd_proto::ExternalDataReaderClient;
//! use exd_proto::{Identifier, StructureRequest};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ExternalDataReaderClient::connect("http://localhost:50051").await?;
//!
//!     let handle = client
//!         .open(Identifier {
//!             url: "file:///data/run_42.parquet".to_string(),
//!             parameters: String::new(),
//!         })
//!         .await?
//!         .into_inner();
//!
//!     let structure = client
//!         .get_structure(StructureRequest {
//!             handle: Some(handle.clone()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("Structure: {:?}", structure);
//!
//!     client.close(handle).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

/// Generated protobuf types for the `ods` package.
#[allow(missing_docs)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub mod ods {
    tonic::include_proto!("ods");

    /// Generated protobuf types and gRPC service for `ods.external_data`.
    #[allow(missing_docs)]
    #[allow(clippy::derive_partial_eq_without_eq)]
    pub mod external_data {
        tonic::include_proto!("ods.external_data");
    }
}

// Re-export commonly used types
pub use ods::external_data::*;
pub use ods::{unknown_array, DataTypeEnum, UnknownArray};

// Re-export server and client types
pub use ods::external_data::external_data_reader_client::ExternalDataReaderClient;
pub use ods::external_data::external_data_reader_server::{
    ExternalDataReader, ExternalDataReaderServer,
};
