//! Structure introspection.

use super::error::{ReaderError, ReaderResult};
use super::path::source_name;
use super::result::{Channel, Group, Structure, StructureOptions, GROUP_ID, GROUP_NAME};
use super::session::Session;
use super::types::map_data_type;

/// Describes the source of an open session as one group of channels.
pub fn build_structure(session: &Session, options: &StructureOptions) -> ReaderResult<Structure> {
    if options.is_filtered() {
        return Err(ReaderError::Unimplemented("Filtered structure request"));
    }

    let table = session.table();
    let schema = table.schema();

    let channels = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(id, field)| {
            Ok(Channel {
                id,
                name: field.name().clone(),
                data_type: map_data_type(field.data_type())?,
                unit: String::new(),
            })
        })
        .collect::<ReaderResult<Vec<_>>>()?;

    let group = Group {
        id: GROUP_ID,
        name: GROUP_NAME.to_string(),
        total_channels: table.num_columns(),
        number_of_rows: table.num_rows(),
        channels,
    };

    Ok(Structure {
        identifier: session.identifier().clone(),
        name: source_name(session.path()),
        groups: vec![group],
    })
}
