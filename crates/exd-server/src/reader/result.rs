//! Structure and value results returned by the reader.

use super::session::SourceIdentifier;
use super::types::DataType;

/// Name of the single group every source exposes.
pub const GROUP_NAME: &str = "data";

/// Id of the single group every source exposes.
pub const GROUP_ID: i64 = 0;

/// Options of a structure request.
///
/// Only the unfiltered request is supported; any filter is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureOptions {
    /// Omit channels from the result.
    pub suppress_channels: bool,
    /// Omit attributes from the result.
    pub suppress_attributes: bool,
    /// Only describe channels with these names.
    pub channel_names: Vec<String>,
}

impl StructureOptions {
    /// Returns true if any filter is requested.
    pub fn is_filtered(&self) -> bool {
        self.suppress_channels || self.suppress_attributes || !self.channel_names.is_empty()
    }
}

/// Description of an open source.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Identifier the session was opened with.
    pub identifier: SourceIdentifier,
    /// Display name (file name of the resolved path).
    pub name: String,
    /// Groups of the source. Always exactly one.
    pub groups: Vec<Group>,
}

/// A flat group of channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Group id.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Number of channels (columns).
    pub total_channels: usize,
    /// Number of rows.
    pub number_of_rows: usize,
    /// Channels in column order.
    pub channels: Vec<Channel>,
}

/// One column of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Zero-based column ordinal.
    pub id: usize,
    /// Column name.
    pub name: String,
    /// Mapped data type.
    pub data_type: DataType,
    /// Unit of measure. Always empty.
    pub unit: String,
}

/// A windowed value request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuesRequest {
    /// Group id. Must be 0.
    pub group_id: i64,
    /// Channels to read, in result order.
    pub channel_ids: Vec<i64>,
    /// First row of the window.
    pub start: i64,
    /// Maximum number of rows.
    pub limit: i64,
}

impl ValuesRequest {
    /// Creates a request for `channel_ids` over `[start, start + limit)`.
    pub fn new(channel_ids: impl Into<Vec<i64>>, start: i64, limit: i64) -> Self {
        Self {
            group_id: GROUP_ID,
            channel_ids: channel_ids.into(),
            start,
            limit,
        }
    }
}

/// Values of the requested channels over one row window.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesResult {
    /// Group id the values belong to.
    pub group_id: i64,
    /// One entry per requested channel, in request order.
    pub channels: Vec<ChannelValues>,
}

/// Encoded values of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValues {
    /// Channel id.
    pub channel_id: usize,
    /// Mapped data type of the channel.
    pub data_type: DataType,
    /// Encoded values.
    pub payload: ChannelPayload,
}

/// Channel values in their wire representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPayload {
    /// `BYTE` channels.
    Bytes(Vec<u8>),
    /// `SHORT` and `LONG` channels.
    Int32(Vec<i32>),
    /// `LONGLONG` channels.
    Int64(Vec<i64>),
    /// `FLOAT` channels.
    Float32(Vec<f32>),
    /// `DOUBLE` channels.
    Float64(Vec<f64>),
    /// `DATE` channels (ASAM time strings) and `STRING` channels.
    Strings(Vec<String>),
}

impl ChannelPayload {
    /// Returns the number of values.
    pub fn len(&self) -> usize {
        match self {
            ChannelPayload::Bytes(v) => v.len(),
            ChannelPayload::Int32(v) => v.len(),
            ChannelPayload::Int64(v) => v.len(),
            ChannelPayload::Float32(v) => v.len(),
            ChannelPayload::Float64(v) => v.len(),
            ChannelPayload::Strings(v) => v.len(),
        }
    }

    /// Returns true if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
