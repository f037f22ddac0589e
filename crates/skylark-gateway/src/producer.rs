//! Flight SQL producer: the gRPC dispatch surface.
//!
//! `SkylarkFlightSqlService` implements the raw Flight service verbs and
//! routes each envelope-wrapped command to the engine, the registry, or the
//! discovery builders. Every call is stateless and reentrant; the statement
//! registry is the only shared mutable state. Unknown command tags and
//! action types fail the call with `InvalidArgument`, never the process.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::FlightService;
use arrow_flight::utils::flight_data_to_arrow_batch;
use arrow_flight::{
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightEndpoint, FlightInfo,
    HandshakeRequest, HandshakeResponse, IpcMessage, PollInfo, PutResult, SchemaAsIpc,
    SchemaResult, Ticket,
};
use arrow_ipc::writer::IpcWriteOptions;
use arrow_schema::{Schema, SchemaRef};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use prost::Message;
use skylark_protocol::command::{
    ActionCreatePreparedStatementRequest, ActionCreatePreparedStatementResult,
    ActionClosePreparedStatementRequest, DoPutUpdateResult, TicketStatementQuery,
};
use skylark_protocol::envelope::{
    Envelope, ACTION_CLOSE_PREPARED_STATEMENT, ACTION_CREATE_PREPARED_STATEMENT,
};
use skylark_protocol::sql_info::{info_id, SqlInfoData, SqlInfoDataBuilder};
use skylark_protocol::variant::ScalarValue;
use skylark_protocol::{schema as result_schema, Command, Error};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};

use crate::discovery;
use crate::engine::{SqlEngine, Statement};
use crate::metrics;
use crate::registry::StatementRegistry;

/// Capabilities reported by `GetSqlInfo`.
static SERVER_SQL_INFO: Lazy<SqlInfoData> = Lazy::new(|| {
    let mut builder = SqlInfoDataBuilder::new();
    builder.append(
        info_id::FLIGHT_SQL_SERVER_NAME,
        "flight_sql_server_name",
        "Skylark Flight SQL",
    );
    builder.append(
        info_id::FLIGHT_SQL_SERVER_VERSION,
        "flight_sql_server_version",
        env!("CARGO_PKG_VERSION"),
    );
    builder.append(
        info_id::FLIGHT_SQL_SERVER_ARROW_VERSION,
        "flight_sql_server_arrow_version",
        "56.0.0",
    );
    builder.append(
        info_id::FLIGHT_SQL_SERVER_READ_ONLY,
        "flight_sql_server_read_only",
        false,
    );
    builder.append(info_id::SQL_IDENTIFIER_CASE, "sql_identifier_case", 1i64);
    builder.append(
        info_id::SQL_IDENTIFIER_QUOTE_CHAR,
        "sql_identifier_quote_char",
        "\"",
    );
    builder.append(
        info_id::SQL_QUOTED_IDENTIFIER_CASE,
        "sql_quoted_identifier_case",
        1i64,
    );
    builder.append(info_id::SQL_NULL_ORDERING, "sql_null_ordering", 3i64);
    builder.append(
        info_id::SQL_KEYWORDS,
        "sql_keywords",
        vec!["SELECT".to_string(), "INSERT".to_string(), "DELETE".to_string()],
    );
    builder.append(
        info_id::SQL_NUMERIC_FUNCTIONS,
        "sql_numeric_functions",
        Vec::<String>::new(),
    );
    builder.append(
        info_id::SQL_STRING_FUNCTIONS,
        "sql_string_functions",
        Vec::<String>::new(),
    );
    builder.build()
});

type BoxedFlightStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

pub struct SkylarkFlightSqlService {
    engine: Arc<dyn SqlEngine>,
    registry: StatementRegistry,
}

fn handle_str(handle: &Bytes) -> Result<&str, Status> {
    std::str::from_utf8(handle)
        .map_err(|_| Status::invalid_argument("prepared statement handle is not valid utf-8"))
}

fn encode_schema(schema: &Schema) -> Result<Bytes, Status> {
    let options = IpcWriteOptions::default();
    let message: IpcMessage = SchemaAsIpc::new(schema, &options)
        .try_into()
        .map_err(|e| Status::from(Error::Arrow(e)))?;
    Ok(message.0)
}

fn update_ack(record_count: i64) -> PutResult {
    let result = DoPutUpdateResult { record_count };
    PutResult {
        app_metadata: result.encode_to_vec().into(),
    }
}

fn batches_to_stream(
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
) -> BoxedFlightStream<FlightData> {
    let stream = FlightDataEncoderBuilder::new()
        .with_schema(schema)
        .build(stream::iter(batches.into_iter().map(Ok::<_, FlightError>)))
        .map_err(|e| Status::internal(e.to_string()));
    Box::pin(stream)
}

impl SkylarkFlightSqlService {
    pub fn new(engine: Arc<dyn SqlEngine>) -> Self {
        Self {
            engine,
            registry: StatementRegistry::new(),
        }
    }

    /// Schema a descriptor command will produce, without materializing rows.
    fn schema_for_command(&self, command: &Command) -> Result<SchemaRef, Status> {
        match command {
            Command::StatementQuery(c) => {
                let statement = self.engine.prepare(&c.query)?;
                Ok(statement.result_schema())
            }
            Command::PreparedStatementQuery(c) => {
                let entry = self
                    .registry
                    .lookup(handle_str(&c.prepared_statement_handle)?)?;
                let prepared = entry
                    .lock()
                    .map_err(|_| Status::internal("statement lock poisoned"))?;
                Ok(prepared.statement.result_schema())
            }
            Command::GetCatalogs(_) => Ok(result_schema::catalogs()),
            Command::GetDbSchemas(_) => Ok(result_schema::db_schemas()),
            Command::GetTables(c) => Ok(result_schema::tables(c.include_schema)),
            Command::GetTableTypes(_) => Ok(result_schema::table_types()),
            Command::GetSqlInfo(_) => Ok(result_schema::sql_info()),
            Command::GetPrimaryKeys(_) => Ok(result_schema::primary_keys()),
            Command::GetForeignKeys(_) => Ok(result_schema::foreign_keys()),
            Command::StatementUpdate(_)
            | Command::PreparedStatementUpdate(_)
            | Command::TicketStatementQuery(_) => Err(Status::invalid_argument(format!(
                "{} cannot describe a result set",
                command.type_name()
            ))),
        }
    }

    /// Binds every uploaded row's columns as positional parameters.
    fn bind_uploaded_rows(
        statement: &mut dyn Statement,
        frames: &[FlightData],
    ) -> Result<(), Status> {
        if frames.len() < 2 {
            // Descriptor-only or schema-only upload carries no binds.
            return Ok(());
        }
        let schema = Arc::new(
            Schema::try_from(&frames[0])
                .map_err(|e| Status::invalid_argument(format!("invalid bind schema: {e}")))?,
        );
        let dictionaries = HashMap::new();
        for frame in &frames[1..] {
            let batch = flight_data_to_arrow_batch(frame, schema.clone(), &dictionaries)
                .map_err(|e| Status::invalid_argument(format!("invalid bind batch: {e}")))?;
            for row in 0..batch.num_rows() {
                for (index, column) in batch.columns().iter().enumerate() {
                    let value = ScalarValue::try_from_array(column.as_ref(), row)?;
                    statement.bind(index, value)?;
                }
            }
        }
        Ok(())
    }

    /// `do_put` body, split out so tests can feed a plain stream instead of
    /// a tonic `Streaming`.
    pub async fn handle_do_put<S>(&self, mut stream: S) -> Result<Vec<PutResult>, Status>
    where
        S: Stream<Item = Result<FlightData, Status>> + Unpin + Send,
    {
        let first = stream
            .next()
            .await
            .ok_or_else(|| Status::invalid_argument("empty do_put stream"))??;
        let descriptor = first
            .flight_descriptor
            .clone()
            .ok_or_else(|| Status::invalid_argument("first do_put frame has no descriptor"))?;
        let command = Command::decode(&descriptor.cmd)?;
        debug!(command = command.type_name(), "do_put");

        let mut frames = vec![first];
        while let Some(frame) = stream.next().await {
            frames.push(frame?);
        }

        match command {
            Command::StatementUpdate(c) => {
                let mut statement = self.engine.prepare(&c.query)?;
                let count = statement.execute_update()?;
                metrics::record_dispatch("do_put", "ok");
                Ok(vec![update_ack(count)])
            }
            Command::PreparedStatementUpdate(c) => {
                let entry = self
                    .registry
                    .lookup(handle_str(&c.prepared_statement_handle)?)?;
                let mut prepared = entry
                    .lock()
                    .map_err(|_| Status::internal("statement lock poisoned"))?;
                Self::bind_uploaded_rows(prepared.statement.as_mut(), &frames)?;
                let count = prepared.statement.execute_update()?;
                metrics::record_dispatch("do_put", "ok");
                Ok(vec![update_ack(count)])
            }
            Command::PreparedStatementQuery(c) => {
                let entry = self
                    .registry
                    .lookup(handle_str(&c.prepared_statement_handle)?)?;
                let mut prepared = entry
                    .lock()
                    .map_err(|_| Status::internal("statement lock poisoned"))?;
                Self::bind_uploaded_rows(prepared.statement.as_mut(), &frames)?;
                metrics::record_dispatch("do_put", "ok");
                Ok(vec![PutResult::default()])
            }
            other => Err(Status::invalid_argument(format!(
                "{} is not a do_put command",
                other.type_name()
            ))),
        }
    }
}

#[tonic::async_trait]
impl FlightService for SkylarkFlightSqlService {
    type HandshakeStream = BoxedFlightStream<HandshakeResponse>;
    type ListFlightsStream = BoxedFlightStream<FlightInfo>;
    type DoGetStream = BoxedFlightStream<FlightData>;
    type DoPutStream = BoxedFlightStream<PutResult>;
    type DoActionStream = BoxedFlightStream<arrow_flight::Result>;
    type ListActionsStream = BoxedFlightStream<ActionType>;
    type DoExchangeStream = BoxedFlightStream<FlightData>;

    async fn handshake(
        &self,
        _request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake is not supported"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        Err(Status::unimplemented("list_flights is not supported"))
    }

    async fn get_flight_info(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        let descriptor = request.into_inner();
        let command = Command::decode(&descriptor.cmd).map_err(|e| {
            metrics::record_dispatch("get_flight_info", "rejected");
            Status::from(e)
        })?;
        debug!(command = command.type_name(), "get_flight_info");

        let schema = self.schema_for_command(&command)?;

        // Statement text travels inside its own ticket; everything else is
        // its own ticket verbatim.
        let ticket = match &command {
            Command::StatementQuery(c) => Command::TicketStatementQuery(TicketStatementQuery {
                statement_handle: Bytes::from(c.query.clone().into_bytes()),
            })
            .encode(),
            _ => command.encode(),
        };

        let endpoint = FlightEndpoint::new().with_ticket(Ticket::new(ticket));
        let info = FlightInfo::new()
            .try_with_schema(schema.as_ref())
            .map_err(|e| Status::from(Error::Arrow(e)))?
            .with_endpoint(endpoint)
            .with_descriptor(descriptor);
        metrics::record_dispatch("get_flight_info", "ok");
        Ok(Response::new(info))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info is not supported"))
    }

    async fn get_schema(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        let descriptor = request.into_inner();
        let command = Command::decode(&descriptor.cmd)?;
        debug!(command = command.type_name(), "get_schema");

        let schema = self.schema_for_command(&command)?;
        let options = IpcWriteOptions::default();
        let result: SchemaResult = SchemaAsIpc::new(schema.as_ref(), &options)
            .try_into()
            .map_err(|e| Status::from(Error::Arrow(e)))?;
        metrics::record_dispatch("get_schema", "ok");
        Ok(Response::new(result))
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        let ticket = request.into_inner();
        let command = Command::decode(&ticket.ticket)?;
        debug!(command = command.type_name(), "do_get");

        let (schema, batches) = match &command {
            Command::TicketStatementQuery(t) => {
                let query = std::str::from_utf8(&t.statement_handle)
                    .map_err(|_| Status::invalid_argument("statement handle is not valid utf-8"))?;
                let mut statement = self.engine.prepare(query)?;
                (statement.result_schema(), statement.execute_query()?)
            }
            Command::PreparedStatementQuery(c) => {
                let entry = self
                    .registry
                    .lookup(handle_str(&c.prepared_statement_handle)?)?;
                let mut prepared = entry
                    .lock()
                    .map_err(|_| Status::internal("statement lock poisoned"))?;
                (
                    prepared.statement.result_schema(),
                    prepared.statement.execute_query()?,
                )
            }
            Command::GetCatalogs(_) => {
                let batch = discovery::catalogs(self.engine.as_ref())?;
                (batch.schema(), vec![batch])
            }
            Command::GetDbSchemas(c) => {
                let batch = discovery::db_schemas(self.engine.as_ref(), c)?;
                (batch.schema(), vec![batch])
            }
            Command::GetTables(c) => {
                let batch = discovery::tables(self.engine.as_ref(), c)?;
                (batch.schema(), vec![batch])
            }
            Command::GetTableTypes(_) => {
                let batch = discovery::table_types(self.engine.as_ref())?;
                (batch.schema(), vec![batch])
            }
            Command::GetSqlInfo(c) => {
                let batch = discovery::sql_info(&SERVER_SQL_INFO, c)?;
                (batch.schema(), vec![batch])
            }
            Command::GetPrimaryKeys(c) => {
                let batch = discovery::primary_keys(self.engine.as_ref(), c)?;
                (batch.schema(), vec![batch])
            }
            Command::GetForeignKeys(c) => {
                let batch = discovery::foreign_keys(self.engine.as_ref(), c)?;
                (batch.schema(), vec![batch])
            }
            Command::StatementQuery(_)
            | Command::StatementUpdate(_)
            | Command::PreparedStatementUpdate(_) => {
                return Err(Status::invalid_argument(format!(
                    "{} is not a do_get ticket",
                    command.type_name()
                )))
            }
        };
        metrics::record_dispatch("do_get", "ok");
        Ok(Response::new(batches_to_stream(schema, batches)))
    }

    async fn do_put(
        &self,
        request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        let acks = self.handle_do_put(request.into_inner()).await?;
        Ok(Response::new(Box::pin(stream::iter(
            acks.into_iter().map(Ok),
        ))))
    }

    async fn do_exchange(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("do_exchange is not supported"))
    }

    async fn do_action(
        &self,
        request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        let action = request.into_inner();
        debug!(action = %action.r#type, "do_action");

        match action.r#type.as_str() {
            ACTION_CREATE_PREPARED_STATEMENT => {
                let envelope = Envelope::parse(&action.body)?;
                let create: ActionCreatePreparedStatementRequest = envelope.unpack()?;
                let created = self.registry.create(self.engine.as_ref(), &create.query)?;
                info!(handle = %created.handle, "prepared statement created");

                let result = ActionCreatePreparedStatementResult {
                    prepared_statement_handle: Bytes::from(created.handle.into_bytes()),
                    dataset_schema: encode_schema(&created.dataset_schema)?,
                    parameter_schema: encode_schema(&created.parameter_schema)?,
                };
                let body = Envelope::pack(&result).encode_to_bytes();
                metrics::record_dispatch("do_action", "ok");
                Ok(Response::new(Box::pin(stream::iter([Ok(
                    arrow_flight::Result { body },
                )]))))
            }
            ACTION_CLOSE_PREPARED_STATEMENT => {
                let envelope = Envelope::parse(&action.body)?;
                let close: ActionClosePreparedStatementRequest = envelope.unpack()?;
                self.registry
                    .close(handle_str(&close.prepared_statement_handle)?)?;
                metrics::record_dispatch("do_action", "ok");
                // Callers must observe stream completion, so close still
                // answers with an empty, already-completed stream.
                Ok(Response::new(Box::pin(stream::empty())))
            }
            other => Err(Status::invalid_argument(format!(
                "unknown action type: {other}"
            ))),
        }
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        let actions = vec![
            Ok(ActionType {
                r#type: ACTION_CREATE_PREPARED_STATEMENT.to_string(),
                description: "Create a reusable prepared statement handle".to_string(),
            }),
            Ok(ActionType {
                r#type: ACTION_CLOSE_PREPARED_STATEMENT.to_string(),
                description: "Close a prepared statement handle".to_string(),
            }),
        ];
        Ok(Response::new(Box::pin(stream::iter(actions))))
    }
}
