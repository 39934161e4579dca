//! Windowed value extraction.
//!
//! A request selects channels of the single group and a row window
//! `[start, start + limit)`, clamped to the table length. Each channel is
//! sliced (zero-copy), cast to the Arrow type backing its destination slot
//! and copied out into a [`ChannelPayload`]. Nulls become the zero value of
//! integer slots, NaN for float slots and an empty string for text slots.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType as ArrowType, Float32Type, Float64Type, Int32Type, Int64Type,
    UInt8Type,
};
use arrow::error::ArrowError;
use arrow::util::display::{ArrayFormatter, FormatOptions};

use super::error::{ReaderError, ReaderResult};
use super::result::{ChannelPayload, ChannelValues, ValuesRequest, ValuesResult, GROUP_ID};
use super::table::SourceTable;
use super::types::{map_data_type, DataType};

/// Rejects any group id other than the single flat group.
pub fn validate_group(group_id: i64) -> ReaderResult<()> {
    if group_id != GROUP_ID {
        return Err(ReaderError::InvalidGroup(group_id));
    }
    Ok(())
}

/// Row window as `(offset, length)` within a table of `number_of_rows`.
fn window(start: i64, limit: i64, number_of_rows: usize) -> ReaderResult<(usize, usize)> {
    let out_of_range = || ReaderError::StartOutOfRange {
        start,
        number_of_rows,
    };

    let offset = usize::try_from(start).map_err(|_| out_of_range())?;
    if limit < 0 {
        return Err(ReaderError::InvalidLimit(limit));
    }
    if offset >= number_of_rows {
        return Err(out_of_range());
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let end = offset.saturating_add(limit).min(number_of_rows);
    Ok((offset, end - offset))
}

/// Extracts the requested window of every requested channel.
///
/// Fails as a whole on the first invalid channel; the result holds one entry
/// per requested id, in request order, duplicates included.
pub fn extract_values(table: &SourceTable, request: &ValuesRequest) -> ReaderResult<ValuesResult> {
    validate_group(request.group_id)?;
    let (offset, length) = window(request.start, request.limit, table.num_rows())?;

    let channels = request
        .channel_ids
        .iter()
        .map(|&channel_id| extract_channel(table, channel_id, offset, length))
        .collect::<ReaderResult<Vec<_>>>()?;

    Ok(ValuesResult {
        group_id: request.group_id,
        channels,
    })
}

fn extract_channel(
    table: &SourceTable,
    channel_id: i64,
    offset: usize,
    length: usize,
) -> ReaderResult<ChannelValues> {
    let (index, column) = usize::try_from(channel_id)
        .ok()
        .and_then(|index| table.column(index).map(|column| (index, column)))
        .ok_or(ReaderError::InvalidChannel(channel_id))?;

    let data_type = map_data_type(column.data_type())?;
    let window = column.slice(offset, length);

    let payload = encode(&window, data_type).map_err(|source| ReaderError::Encode {
        channel: index,
        path: table.path().to_path_buf(),
        source,
    })?;

    Ok(ChannelValues {
        channel_id: index,
        data_type,
        payload,
    })
}

/// Encodes a column window into the representation of `data_type`.
fn encode(column: &ArrayRef, data_type: DataType) -> Result<ChannelPayload, ArrowError> {
    let payload = match data_type {
        DataType::Byte => ChannelPayload::Bytes(primitive_values::<UInt8Type>(column, 0)?),
        DataType::Short | DataType::Long => {
            ChannelPayload::Int32(primitive_values::<Int32Type>(column, 0)?)
        }
        DataType::LongLong => ChannelPayload::Int64(primitive_values::<Int64Type>(column, 0)?),
        DataType::Float => {
            ChannelPayload::Float32(primitive_values::<Float32Type>(column, f32::NAN)?)
        }
        DataType::Double => {
            ChannelPayload::Float64(primitive_values::<Float64Type>(column, f64::NAN)?)
        }
        DataType::Date => ChannelPayload::Strings(asam_time_values(column)?),
        DataType::String => ChannelPayload::Strings(string_values(column)?),
    };
    Ok(payload)
}

fn primitive_values<T: ArrowPrimitiveType>(
    column: &ArrayRef,
    null: T::Native,
) -> Result<Vec<T::Native>, ArrowError> {
    let converted = cast(column, &T::DATA_TYPE)?;
    let array = converted.as_primitive_opt::<T>().ok_or_else(|| {
        ArrowError::CastError(format!(
            "cannot view {} as {}",
            converted.data_type(),
            T::DATA_TYPE
        ))
    })?;
    Ok(array.iter().map(|value| value.unwrap_or(null)).collect())
}

fn string_values(column: &ArrayRef) -> Result<Vec<String>, ArrowError> {
    let converted = cast(column, &ArrowType::Utf8)?;
    let array = converted.as_string_opt::<i32>().ok_or_else(|| {
        ArrowError::CastError(format!("cannot view {} as Utf8", converted.data_type()))
    })?;
    Ok(array
        .iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

/// Renders timestamps and keeps only their digits, e.g. `20170709123500`.
///
/// Zone-aware columns render as their UTC wall clock. Fractional seconds keep
/// the 3, 6 or 9 digits the formatter emits; the format is positional, so
/// `...123500120` and `...123500120000` name the same instant.
fn asam_time_values(column: &ArrayRef) -> Result<Vec<String>, ArrowError> {
    let column = utc_wall_clock(column)?;
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(column.as_ref(), &options)?;

    Ok((0..column.len())
        .map(|row| {
            if column.is_null(row) {
                return String::new();
            }
            formatter
                .value(row)
                .to_string()
                .chars()
                .filter(char::is_ascii_digit)
                .collect()
        })
        .collect())
}

/// Drops the zone of a timestamp column. The stored values are UTC instants
/// and stay untouched, so named zones need no zone database.
fn utc_wall_clock(column: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    match column.data_type() {
        ArrowType::Timestamp(unit, Some(_)) => cast(column, &ArrowType::Timestamp(*unit, None)),
        _ => Ok(Arc::clone(column)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::error::ErrorKind;
    use crate::reader::test_util::TestResult;
    use arrow::array::{
        Float64Array, Int32Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
        TimestampMillisecondArray, TimestampSecondArray,
    };
    use arrow::datatypes::{Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use exd_test::all_datatypes_batch;
    use std::path::PathBuf;

    fn table_of(columns: Vec<(&str, ArrayRef)>) -> TestResult<SourceTable> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(SourceTable::new(PathBuf::from("/data/t.parquet"), batch))
    }

    fn all_datatypes() -> TestResult<SourceTable> {
        Ok(SourceTable::new(
            PathBuf::from("/data/all_datatypes.parquet"),
            all_datatypes_batch()?,
        ))
    }

    fn ints(rows: i32) -> TestResult<SourceTable> {
        table_of(vec![(
            "value",
            Arc::new(Int32Array::from((0..rows).collect::<Vec<_>>())) as ArrayRef,
        )])
    }

    #[test]
    fn test_all_datatypes_full_window() -> TestResult {
        let table = all_datatypes()?;
        let request = ValuesRequest::new((0..12).collect::<Vec<_>>(), 0, 2);
        let result = extract_values(&table, &request)?;

        assert_eq!(result.group_id, 0);
        let payloads: Vec<&ChannelPayload> = result.channels.iter().map(|c| &c.payload).collect();
        assert_eq!(payloads[0], &ChannelPayload::Int32(vec![-2, 4]));
        assert_eq!(payloads[1], &ChannelPayload::Bytes(vec![2, 4]));
        assert_eq!(payloads[2], &ChannelPayload::Int32(vec![-2, 4]));
        assert_eq!(payloads[3], &ChannelPayload::Int32(vec![2, 4]));
        assert_eq!(payloads[4], &ChannelPayload::Int32(vec![-2, 4]));
        assert_eq!(payloads[5], &ChannelPayload::Int64(vec![2, 4]));
        assert_eq!(payloads[6], &ChannelPayload::Int64(vec![-2, 4]));
        assert_eq!(payloads[7], &ChannelPayload::Float64(vec![2.0, 4.0]));
        assert_eq!(
            payloads[8],
            &ChannelPayload::Strings(vec![
                "20170709123500".to_string(),
                "20170709123600".to_string()
            ])
        );
        assert_eq!(payloads[9], &ChannelPayload::Float32(vec![1.1, 1.2]));
        assert_eq!(payloads[10], &ChannelPayload::Float64(vec![2.1, 2.2]));
        assert_eq!(
            payloads[11],
            &ChannelPayload::Strings(vec!["abc".to_string(), "def".to_string()])
        );

        for (id, channel) in result.channels.iter().enumerate() {
            assert_eq!(channel.channel_id, id);
        }
        assert_eq!(result.channels[8].data_type, DataType::Date);
        Ok(())
    }

    #[test]
    fn test_window_length() -> TestResult {
        let rows = 5;
        let table = ints(rows as i32)?;

        for start in 0..rows {
            for limit in 0..8 {
                let request = ValuesRequest::new(vec![0], start, limit);
                let result = extract_values(&table, &request)?;
                let expected = limit.min(rows - start) as usize;
                assert_eq!(result.channels[0].payload.len(), expected, "{start}/{limit}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_window_contents() -> TestResult {
        let table = ints(10)?;
        let result = extract_values(&table, &ValuesRequest::new(vec![0], 3, 4))?;
        assert_eq!(result.channels[0].payload, ChannelPayload::Int32(vec![3, 4, 5, 6]));

        let result = extract_values(&table, &ValuesRequest::new(vec![0], 8, i64::MAX))?;
        assert_eq!(result.channels[0].payload, ChannelPayload::Int32(vec![8, 9]));
        Ok(())
    }

    #[test]
    fn test_request_order_preserved() -> TestResult {
        let table = all_datatypes()?;
        let result = extract_values(&table, &ValuesRequest::new(vec![11, 0, 11], 1, 1))?;

        let ids: Vec<usize> = result.channels.iter().map(|c| c.channel_id).collect();
        assert_eq!(ids, vec![11, 0, 11]);
        assert_eq!(
            result.channels[0].payload,
            ChannelPayload::Strings(vec!["def".to_string()])
        );
        assert_eq!(result.channels[1].payload, ChannelPayload::Int32(vec![4]));
        Ok(())
    }

    #[test]
    fn test_empty_selection() -> TestResult {
        let table = all_datatypes()?;
        let result = extract_values(&table, &ValuesRequest::new(Vec::new(), 0, 2))?;
        assert!(result.channels.is_empty());

        let result = extract_values(&table, &ValuesRequest::new(vec![0], 0, 0))?;
        assert!(result.channels[0].payload.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_requests() -> TestResult {
        let table = all_datatypes()?;

        let cases = [
            ValuesRequest {
                group_id: 1,
                ..ValuesRequest::new(vec![0], 0, 1)
            },
            ValuesRequest::new(vec![0], 2, 1),
            ValuesRequest::new(vec![0], -1, 1),
            ValuesRequest::new(vec![0], 0, -1),
            ValuesRequest::new(vec![12], 0, 1),
            ValuesRequest::new(vec![0, -1], 0, 1),
        ];
        for request in cases {
            let err = extract_values(&table, &request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{request:?}");
        }

        let err = extract_values(&table, &ValuesRequest::new(vec![0], 2, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Channel start index 2 out of range!");
        let err = extract_values(&table, &ValuesRequest::new(vec![12], 0, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid channel id 12!");
        Ok(())
    }

    #[test]
    fn test_empty_table_has_no_valid_start() -> TestResult {
        let table = ints(0)?;
        let err = extract_values(&table, &ValuesRequest::new(vec![0], 0, 1)).unwrap_err();
        assert!(matches!(err, ReaderError::StartOutOfRange { .. }));
        Ok(())
    }

    #[test]
    fn test_null_fill() -> TestResult {
        let table = table_of(vec![
            (
                "ints",
                Arc::new(Int32Array::from(vec![Some(7), None])) as ArrayRef,
            ),
            (
                "doubles",
                Arc::new(Float64Array::from(vec![None, Some(1.5)])) as ArrayRef,
            ),
            (
                "text",
                Arc::new(StringArray::from(vec![None, Some("x")])) as ArrayRef,
            ),
            (
                "stamps",
                Arc::new(TimestampMicrosecondArray::from(vec![None, Some(0)])) as ArrayRef,
            ),
        ])?;
        let result = extract_values(&table, &ValuesRequest::new(vec![0, 1, 2, 3], 0, 2))?;

        assert_eq!(result.channels[0].payload, ChannelPayload::Int32(vec![7, 0]));
        match &result.channels[1].payload {
            ChannelPayload::Float64(values) => {
                assert!(values[0].is_nan());
                assert_eq!(values[1], 1.5);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(
            result.channels[2].payload,
            ChannelPayload::Strings(vec![String::new(), "x".to_string()])
        );
        assert_eq!(
            result.channels[3].payload,
            ChannelPayload::Strings(vec![String::new(), "19700101000000".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_other_timestamp_and_text_layouts() -> TestResult {
        let table = table_of(vec![
            (
                "seconds",
                Arc::new(TimestampSecondArray::from(vec![1_499_603_700])) as ArrayRef,
            ),
            (
                "large",
                Arc::new(LargeStringArray::from(vec!["wide"])) as ArrayRef,
            ),
        ])?;
        assert_eq!(
            table.schema().field(0).data_type(),
            &ArrowType::Timestamp(TimeUnit::Second, None)
        );

        let result = extract_values(&table, &ValuesRequest::new(vec![0, 1], 0, 1))?;
        assert_eq!(
            result.channels[0].payload,
            ChannelPayload::Strings(vec!["20170709123500".to_string()])
        );
        assert_eq!(
            result.channels[1].payload,
            ChannelPayload::Strings(vec!["wide".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_fractional_seconds_keep_digits() -> TestResult {
        let table = table_of(vec![(
            "stamps",
            Arc::new(TimestampMicrosecondArray::from(vec![1_499_603_700_500_000])) as ArrayRef,
        )])?;
        let result = extract_values(&table, &ValuesRequest::new(vec![0], 0, 1))?;
        assert_eq!(
            result.channels[0].payload,
            ChannelPayload::Strings(vec!["20170709123500500".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_fractional_seconds_use_formatter_precision() -> TestResult {
        let table = table_of(vec![
            (
                "millis",
                Arc::new(TimestampMicrosecondArray::from(vec![1_499_603_700_120_000])) as ArrayRef,
            ),
            (
                "micros",
                Arc::new(TimestampMicrosecondArray::from(vec![1_499_603_700_120_001])) as ArrayRef,
            ),
        ])?;
        let result = extract_values(&table, &ValuesRequest::new(vec![0, 1], 0, 1))?;
        assert_eq!(
            result.channels[0].payload,
            ChannelPayload::Strings(vec!["20170709123500120".to_string()])
        );
        assert_eq!(
            result.channels[1].payload,
            ChannelPayload::Strings(vec!["20170709123500120001".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_zoned_timestamps_render_utc() -> TestResult {
        let instant = 1_499_603_700_000_000;
        let table = table_of(vec![
            (
                "offset",
                Arc::new(TimestampMicrosecondArray::from(vec![instant]).with_timezone("+02:00"))
                    as ArrayRef,
            ),
            (
                "named",
                Arc::new(
                    TimestampMicrosecondArray::from(vec![instant]).with_timezone("Europe/Berlin"),
                ) as ArrayRef,
            ),
            (
                "utc",
                Arc::new(
                    TimestampMillisecondArray::from(vec![instant / 1_000]).with_timezone("UTC"),
                ) as ArrayRef,
            ),
        ])?;
        assert_eq!(map_data_type(table.schema().field(1).data_type())?, DataType::Date);

        let result = extract_values(&table, &ValuesRequest::new(vec![0, 1, 2], 0, 1))?;
        for channel in &result.channels {
            assert_eq!(channel.data_type, DataType::Date);
            assert_eq!(
                channel.payload,
                ChannelPayload::Strings(vec!["20170709123500".to_string()]),
                "channel {}",
                channel.channel_id
            );
        }
        Ok(())
    }
}
