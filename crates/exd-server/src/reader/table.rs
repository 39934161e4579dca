//! Opened tables and the loader seam to the columnar parser.
//!
//! A [`SourceTable`] is immutable once loaded, so any number of sessions can
//! read it concurrently without locking. The default [`ParquetLoader`] reads
//! a whole Parquet file into a single Arrow record batch.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Default number of rows decoded per Parquet read batch.
pub const DEFAULT_READ_BATCH_SIZE: usize = 8192;

/// Errors raised while loading a table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid Parquet.
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
    /// Decoded data could not be assembled.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Opens a canonical path and returns its contents as one record batch.
pub trait TableLoader: Send + Sync {
    /// Loads the table stored at `path`.
    fn load(&self, path: &Path) -> Result<RecordBatch, LoadError>;
}

/// Reads Parquet files through the Arrow record batch reader.
#[derive(Debug, Clone)]
pub struct ParquetLoader {
    batch_size: usize,
}

impl ParquetLoader {
    /// Creates a loader with the default read batch size.
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_READ_BATCH_SIZE,
        }
    }

    /// Sets the number of rows decoded per read batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl Default for ParquetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader for ParquetLoader {
    fn load(&self, path: &Path) -> Result<RecordBatch, LoadError> {
        let file = File::open(path)?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(self.batch_size);
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
        Ok(concat_batches(&schema, &batches)?)
    }
}

/// An opened, immutable table shared by all sessions on one path.
#[derive(Debug)]
pub struct SourceTable {
    path: PathBuf,
    batch: RecordBatch,
}

impl SourceTable {
    /// Wraps a loaded record batch.
    pub fn new(path: PathBuf, batch: RecordBatch) -> Self {
        Self { path, batch }
    }

    /// Returns the canonical path the table was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the table schema.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Returns the column at `index`, if any.
    pub fn column(&self, index: usize) -> Option<&ArrayRef> {
        self.batch.columns().get(index)
    }
}
