//! Parquet fixtures for reader unit tests.
//!
//! Shared batches live in `exd-test`; this adds the small single-column files
//! the registry and table tests write.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

pub(crate) use exd_test::{file_url, TestResult};

/// Single non-nullable Int32 column named `value`.
pub(crate) fn write_int_parquet(path: &Path, values: &[i32]) -> TestResult {
    let schema = Schema::new(vec![Field::new("value", DataType::Int32, false)]);
    let column = Arc::new(Int32Array::from(values.to_vec())) as ArrayRef;
    let batch = RecordBatch::try_new(Arc::new(schema), vec![column])?;
    exd_test::write_parquet(path, &batch)
}
