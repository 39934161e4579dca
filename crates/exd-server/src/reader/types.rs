//! Mapping from source column types to ODS data types.
//!
//! Every source column is first classified into a [`SourcePrimitive`], a
//! closed set of tags. Each tag has exactly one destination [`DataType`].
//! The mapping widens where the ODS type set has no exact slot: unsigned
//! 16-bit values land in LONG and unsigned 64-bit values in DOUBLE, so
//! unsigned wide integers do not round-trip.

use std::fmt;

use arrow::datatypes::DataType as ArrowType;

use super::error::{ReaderError, ReaderResult};

/// Destination data types exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unsigned 8-bit, sent as raw bytes.
    Byte,
    /// 16-bit signed slot, sent as i32.
    Short,
    /// 32-bit signed, sent as i32.
    Long,
    /// 64-bit signed.
    LongLong,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Timestamp, sent as an ASAM time digit string.
    Date,
    /// UTF-8 text.
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Byte => "DT_BYTE",
            DataType::Short => "DT_SHORT",
            DataType::Long => "DT_LONG",
            DataType::LongLong => "DT_LONGLONG",
            DataType::Float => "DT_FLOAT",
            DataType::Double => "DT_DOUBLE",
            DataType::Date => "DT_DATE",
            DataType::String => "DT_STRING",
        };
        f.write_str(name)
    }
}

/// Canonical primitive tag of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SourcePrimitive {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Timestamp of any unit, with or without timezone.
    Timestamp,
    /// UTF-8 text with 32- or 64-bit offsets.
    Utf8,
}

impl SourcePrimitive {
    /// Every tag, in table order.
    pub const ALL: [SourcePrimitive; 12] = [
        SourcePrimitive::Int8,
        SourcePrimitive::UInt8,
        SourcePrimitive::Int16,
        SourcePrimitive::UInt16,
        SourcePrimitive::Int32,
        SourcePrimitive::UInt32,
        SourcePrimitive::Int64,
        SourcePrimitive::UInt64,
        SourcePrimitive::Float32,
        SourcePrimitive::Float64,
        SourcePrimitive::Timestamp,
        SourcePrimitive::Utf8,
    ];

    /// Classifies an Arrow column type.
    pub fn classify(data_type: &ArrowType) -> ReaderResult<Self> {
        let tag = match data_type {
            ArrowType::Int8 => SourcePrimitive::Int8,
            ArrowType::UInt8 => SourcePrimitive::UInt8,
            ArrowType::Int16 => SourcePrimitive::Int16,
            ArrowType::UInt16 => SourcePrimitive::UInt16,
            ArrowType::Int32 => SourcePrimitive::Int32,
            ArrowType::UInt32 => SourcePrimitive::UInt32,
            ArrowType::Int64 => SourcePrimitive::Int64,
            ArrowType::UInt64 => SourcePrimitive::UInt64,
            ArrowType::Float32 => SourcePrimitive::Float32,
            ArrowType::Float64 => SourcePrimitive::Float64,
            ArrowType::Timestamp(_, _) => SourcePrimitive::Timestamp,
            ArrowType::Utf8 | ArrowType::LargeUtf8 => SourcePrimitive::Utf8,
            other => return Err(ReaderError::UnsupportedType(other.clone())),
        };
        Ok(tag)
    }

    /// Destination type for this tag.
    pub const fn destination(self) -> DataType {
        match self {
            SourcePrimitive::Int8 => DataType::Short,
            SourcePrimitive::UInt8 => DataType::Byte,
            SourcePrimitive::Int16 => DataType::Short,
            SourcePrimitive::UInt16 => DataType::Long,
            SourcePrimitive::Int32 => DataType::Long,
            SourcePrimitive::UInt32 => DataType::LongLong,
            SourcePrimitive::Int64 => DataType::LongLong,
            SourcePrimitive::UInt64 => DataType::Double,
            SourcePrimitive::Float32 => DataType::Float,
            SourcePrimitive::Float64 => DataType::Double,
            SourcePrimitive::Timestamp => DataType::Date,
            SourcePrimitive::Utf8 => DataType::String,
        }
    }
}

/// Maps an Arrow column type straight to its destination type.
pub fn map_data_type(data_type: &ArrowType) -> ReaderResult<DataType> {
    SourcePrimitive::classify(data_type).map(SourcePrimitive::destination)
}
