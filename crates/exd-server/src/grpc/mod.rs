//! gRPC service implementation for the external data reader.
//!
//! This module implements the `ods.external_data.ExternalDataReader` service
//! defined in exd-proto on top of [`Reader`]. Reader errors are translated to
//! status codes here and nowhere else.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{error, info};

use exd_proto::ods::{
    unknown_array::Values, ByteArray, DoubleArray, FloatArray, LongArray, LongLongArray,
    StringArray,
};
use exd_proto::{
    structure_result, values_result, DataTypeEnum, Empty, ExternalDataReader,
    ExternalDataReaderServer, StructureResult, UnknownArray, ValuesExRequest, ValuesExResult,
};

use crate::config::ServerConfig;
use crate::reader::{
    ChannelPayload, DataType, ErrorKind, Handle, Reader, ReaderError, SourceIdentifier, Structure,
    StructureOptions, ValuesRequest, ValuesResult,
};

/// Error type returned by the server entry points.
pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

impl From<ReaderError> for Status {
    fn from(err: ReaderError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::InvalidArgument => Status::invalid_argument(message),
            ErrorKind::Unimplemented => Status::unimplemented(message),
            ErrorKind::NotAccessible | ErrorKind::NotFound => Status::not_found(message),
            ErrorKind::Internal => Status::internal(message),
        }
    }
}

fn data_type_enum(data_type: DataType) -> DataTypeEnum {
    match data_type {
        DataType::Byte => DataTypeEnum::DtByte,
        DataType::Short => DataTypeEnum::DtShort,
        DataType::Long => DataTypeEnum::DtLong,
        DataType::LongLong => DataTypeEnum::DtLonglong,
        DataType::Float => DataTypeEnum::DtFloat,
        DataType::Double => DataTypeEnum::DtDouble,
        DataType::Date => DataTypeEnum::DtDate,
        DataType::String => DataTypeEnum::DtString,
    }
}

fn unknown_array(data_type: DataType, payload: ChannelPayload) -> UnknownArray {
    let values = match payload {
        ChannelPayload::Bytes(values) => Values::ByteArray(ByteArray { values }),
        ChannelPayload::Int32(values) => Values::LongArray(LongArray { values }),
        ChannelPayload::Int64(values) => Values::LonglongArray(LongLongArray { values }),
        ChannelPayload::Float32(values) => Values::FloatArray(FloatArray { values }),
        ChannelPayload::Float64(values) => Values::DoubleArray(DoubleArray { values }),
        ChannelPayload::Strings(values) => Values::StringArray(StringArray { values }),
    };
    UnknownArray {
        data_type: data_type_enum(data_type) as i32,
        values: Some(values),
    }
}

fn handle_of(handle: Option<exd_proto::Handle>) -> Result<Handle, ReaderError> {
    handle
        .map(|h| Handle::new(h.uuid))
        .ok_or(ReaderError::MissingHandle)
}

fn structure_to_proto(structure: Structure) -> StructureResult {
    let groups = structure
        .groups
        .into_iter()
        .map(|group| structure_result::Group {
            id: group.id,
            name: group.name,
            total_number_of_channels: group.total_channels as i64,
            number_of_rows: group.number_of_rows as i64,
            channels: group
                .channels
                .into_iter()
                .map(|channel| structure_result::Channel {
                    id: channel.id as i64,
                    name: channel.name,
                    data_type: data_type_enum(channel.data_type) as i32,
                    unit_string: channel.unit,
                })
                .collect(),
        })
        .collect();

    StructureResult {
        identifier: Some(exd_proto::Identifier {
            url: structure.identifier.url,
            parameters: structure.identifier.parameters,
        }),
        name: structure.name,
        groups,
    }
}

fn values_to_proto(result: ValuesResult) -> exd_proto::ValuesResult {
    exd_proto::ValuesResult {
        id: result.group_id,
        channels: result
            .channels
            .into_iter()
            .map(|channel| values_result::ChannelValues {
                id: channel.channel_id as i64,
                values: Some(unknown_array(channel.data_type, channel.payload)),
            })
            .collect(),
    }
}

/// External data reader gRPC service.
#[derive(Debug, Clone)]
pub struct ExdService {
    reader: Arc<Reader>,
}

impl ExdService {
    /// Creates a service over a shared reader.
    pub fn new(reader: Arc<Reader>) -> Self {
        Self { reader }
    }

    /// Runs a reader call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, Status>
    where
        T: Send + 'static,
        F: FnOnce(&Reader) -> Result<T, ReaderError> + Send + 'static,
    {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || f(reader.as_ref()))
            .await
            .map_err(|e| {
                error!("reader task failed: {}", e);
                Status::internal(format!("reader task failed: {e}"))
            })?
            .map_err(Status::from)
    }
}

#[tonic::async_trait]
impl ExternalDataReader for ExdService {
    async fn open(
        &self,
        request: Request<exd_proto::Identifier>,
    ) -> Result<Response<exd_proto::Handle>, Status> {
        let identifier = request.into_inner();
        let identifier =
            SourceIdentifier::new(identifier.url).with_parameters(identifier.parameters);

        let handle = self.blocking(move |reader| reader.open(identifier)).await?;
        Ok(Response::new(exd_proto::Handle {
            uuid: handle.uuid().to_string(),
        }))
    }

    async fn close(&self, request: Request<exd_proto::Handle>) -> Result<Response<Empty>, Status> {
        let handle = Handle::new(request.into_inner().uuid);
        self.blocking(move |reader| reader.close(&handle)).await?;
        Ok(Response::new(Empty {}))
    }

    async fn get_structure(
        &self,
        request: Request<exd_proto::StructureRequest>,
    ) -> Result<Response<StructureResult>, Status> {
        let request = request.into_inner();
        let handle = handle_of(request.handle)?;
        let options = StructureOptions {
            suppress_channels: request.suppress_channels,
            suppress_attributes: request.suppress_attributes,
            channel_names: request.channel_names,
        };

        let structure = self.reader.get_structure(&handle, &options)?;
        Ok(Response::new(structure_to_proto(structure)))
    }

    async fn get_values(
        &self,
        request: Request<exd_proto::ValuesRequest>,
    ) -> Result<Response<exd_proto::ValuesResult>, Status> {
        let request = request.into_inner();
        let handle = handle_of(request.handle)?;
        let values = ValuesRequest {
            group_id: request.group_id,
            channel_ids: request.channel_ids,
            start: request.start,
            limit: request.limit,
        };

        let result = self
            .blocking(move |reader| reader.get_values(&handle, &values))
            .await?;
        Ok(Response::new(values_to_proto(result)))
    }

    async fn get_values_ex(
        &self,
        request: Request<ValuesExRequest>,
    ) -> Result<Response<ValuesExResult>, Status> {
        let request = request.into_inner();
        let handle = handle_of(request.handle)?;
        let values = ValuesRequest {
            group_id: request.group_id,
            channel_ids: request.channel_ids,
            start: request.start,
            limit: request.limit,
        };

        let result = self.reader.get_values_ex(&handle, &values)?;
        Ok(Response::new(ValuesExResult {
            id: result.group_id,
            channels: values_to_proto(result).channels,
        }))
    }
}

/// gRPC server builder.
pub struct GrpcServer {
    reader: Arc<Reader>,
    config: ServerConfig,
}

impl GrpcServer {
    /// Creates a new gRPC server for `reader`.
    pub fn new(reader: Arc<Reader>, config: ServerConfig) -> Self {
        Self { reader, config }
    }

    /// Returns the shared reader.
    pub fn reader(&self) -> &Arc<Reader> {
        &self.reader
    }

    fn service(&self) -> ExternalDataReaderServer<ExdService> {
        let limit = self.config.max_message_size_bytes();
        ExternalDataReaderServer::new(ExdService::new(Arc::clone(&self.reader)))
            .max_decoding_message_size(limit)
            .max_encoding_message_size(limit)
    }

    fn builder(&self) -> Server {
        Server::builder()
            .concurrency_limit_per_connection(self.config.concurrency_limit_per_connection)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .tcp_nodelay(self.config.tcp_nodelay)
    }

    fn addr(&self) -> Result<SocketAddr, ServeError> {
        Ok(self.config.socket_addr().parse()?)
    }

    /// Starts the gRPC server and runs until it fails.
    pub async fn serve(self) -> Result<(), ServeError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Starts the gRPC server and stops when `signal` completes.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.addr()?;
        info!("External data reader listening on {}", addr);

        self.builder()
            .add_service(self.service())
            .serve_with_shutdown(addr, signal)
            .await?;
        Ok(())
    }

    /// Serves connections accepted on an already bound listener.
    pub async fn serve_with_incoming<F>(self, listener: TcpListener, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("External data reader listening on {}", addr);
        }

        self.builder()
            .add_service(self.service())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await?;
        Ok(())
    }
}
