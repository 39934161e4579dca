//! # exd-test
//!
//! Integration test support for the Parquet external data reader.
//!
//! The tests themselves live in `tests/`; this library only provides
//! fixture files written with the Arrow Parquet writer.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    StringArray, TimestampMicrosecondArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

/// Error type used by fixtures and tests.
pub type TestError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used by fixtures and tests.
pub type TestResult<T = ()> = Result<T, TestError>;

/// Column names of the all-datatypes fixture, in ordinal order.
pub const ALL_DATATYPES_COLUMNS: [&str; 12] = [
    "int8_data",
    "uint8_data",
    "int16_data",
    "uint16_data",
    "int32_data",
    "uint32_data",
    "int64_data",
    "uint64_data",
    "date_data",
    "float32_data",
    "float64_data",
    "string_data",
];

/// 2017-07-09 12:35:00 in microseconds since the epoch.
const FIRST_TIMESTAMP_US: i64 = 1_499_603_700_000_000;

/// Writes `batch` as a single-row-group Parquet file.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> TestResult {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Two rows, one column per supported source type.
///
/// Signed columns hold `{-2, 4}`, unsigned ones `{2, 4}`; timestamps are
/// 2017-07-09 12:35:00 and 12:36:00, strings `"abc"` and `"def"`.
pub fn all_datatypes_batch() -> TestResult<RecordBatch> {
    let fields = vec![
        Field::new(ALL_DATATYPES_COLUMNS[0], DataType::Int8, false),
        Field::new(ALL_DATATYPES_COLUMNS[1], DataType::UInt8, false),
        Field::new(ALL_DATATYPES_COLUMNS[2], DataType::Int16, false),
        Field::new(ALL_DATATYPES_COLUMNS[3], DataType::UInt16, false),
        Field::new(ALL_DATATYPES_COLUMNS[4], DataType::Int32, false),
        Field::new(ALL_DATATYPES_COLUMNS[5], DataType::UInt32, false),
        Field::new(ALL_DATATYPES_COLUMNS[6], DataType::Int64, false),
        Field::new(ALL_DATATYPES_COLUMNS[7], DataType::UInt64, false),
        Field::new(
            ALL_DATATYPES_COLUMNS[8],
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        Field::new(ALL_DATATYPES_COLUMNS[9], DataType::Float32, false),
        Field::new(ALL_DATATYPES_COLUMNS[10], DataType::Float64, false),
        Field::new(ALL_DATATYPES_COLUMNS[11], DataType::Utf8, false),
    ];

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int8Array::from(vec![-2, 4])),
        Arc::new(UInt8Array::from(vec![2, 4])),
        Arc::new(Int16Array::from(vec![-2, 4])),
        Arc::new(UInt16Array::from(vec![2, 4])),
        Arc::new(Int32Array::from(vec![-2, 4])),
        Arc::new(UInt32Array::from(vec![2, 4])),
        Arc::new(Int64Array::from(vec![-2, 4])),
        Arc::new(UInt64Array::from(vec![2, 4])),
        Arc::new(TimestampMicrosecondArray::from(vec![
            FIRST_TIMESTAMP_US,
            FIRST_TIMESTAMP_US + 60_000_000,
        ])),
        Arc::new(Float32Array::from(vec![1.1, 1.2])),
        Arc::new(Float64Array::from(vec![2.1, 2.2])),
        Arc::new(StringArray::from(vec!["abc", "def"])),
    ];

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// One Int64 column named `counter` holding `0..rows`.
pub fn counter_batch(rows: i64) -> TestResult<RecordBatch> {
    let schema = Schema::new(vec![Field::new("counter", DataType::Int64, false)]);
    let column = Arc::new(Int64Array::from((0..rows).collect::<Vec<_>>())) as ArrayRef;
    Ok(RecordBatch::try_new(Arc::new(schema), vec![column])?)
}

/// A temporary directory holding fixture files.
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    /// Creates an empty fixture directory.
    pub fn new() -> TestResult<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the fixture directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes the all-datatypes fixture and returns its path.
    pub fn all_datatypes(&self) -> TestResult<PathBuf> {
        let path = self.dir.path().join("all_datatypes.parquet");
        write_parquet(&path, &all_datatypes_batch()?)?;
        Ok(path)
    }

    /// Writes a counter fixture named `name` and returns its path.
    pub fn counter(&self, name: &str, rows: i64) -> TestResult<PathBuf> {
        let path = self.dir.path().join(name);
        write_parquet(&path, &counter_batch(rows)?)?;
        Ok(path)
    }
}

/// `file://` URL of a local path.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
