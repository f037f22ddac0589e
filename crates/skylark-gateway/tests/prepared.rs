//! Prepared statement lifecycle over the action and put/get verbs.

mod common;

use arrow_array::builder::{Int64Builder, StringBuilder};
use arrow_array::{Int64Array, RecordBatch, StringArray};
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::FlightService;
use arrow_flight::{Action, Empty, FlightData, IpcMessage, Ticket};
use arrow_schema::{DataType, Schema};
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use prost::Message;
use skylark_protocol::command::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult, CommandPreparedStatementQuery,
    CommandPreparedStatementUpdate, CommandStatementQuery, DoPutUpdateResult,
};
use skylark_protocol::envelope::{
    Envelope, ACTION_CLOSE_PREPARED_STATEMENT, ACTION_CREATE_PREPARED_STATEMENT,
};
use skylark_protocol::Command;
use tonic::{Code, Request};

use common::{descriptor, do_get_batches, fetch, flight_info, service};
use skylark_gateway::SkylarkFlightSqlService;

async fn create_prepared(
    service: &SkylarkFlightSqlService,
    sql: &str,
) -> ActionCreatePreparedStatementResult {
    let body = Envelope::pack(&ActionCreatePreparedStatementRequest {
        query: sql.to_string(),
    })
    .encode_to_bytes();
    let action = Action {
        r#type: ACTION_CREATE_PREPARED_STATEMENT.to_string(),
        body,
    };
    let mut results = service
        .do_action(Request::new(action))
        .await
        .expect("create prepared statement")
        .into_inner();
    let first = results.next().await.expect("one result").unwrap();
    Envelope::parse(&first.body)
        .unwrap()
        .unpack::<ActionCreatePreparedStatementResult>()
        .unwrap()
}

async fn close_prepared(
    service: &SkylarkFlightSqlService,
    handle: &Bytes,
) -> Result<(), tonic::Status> {
    let body = Envelope::pack(&ActionClosePreparedStatementRequest {
        prepared_statement_handle: handle.clone(),
    })
    .encode_to_bytes();
    let action = Action {
        r#type: ACTION_CLOSE_PREPARED_STATEMENT.to_string(),
        body,
    };
    let mut results = service.do_action(Request::new(action)).await?.into_inner();
    // The close stream completes without emitting results.
    assert!(results.next().await.is_none());
    Ok(())
}

/// Encodes `batch` as upload frames with the prepared-statement descriptor
/// attached to the first one.
async fn upload_frames(command: &Command, batch: RecordBatch) -> Vec<FlightData> {
    let mut frames: Vec<FlightData> = FlightDataEncoderBuilder::new()
        .with_schema(batch.schema())
        .build(stream::iter(vec![Ok::<_, FlightError>(batch)]))
        .try_collect()
        .await
        .unwrap();
    frames[0].flight_descriptor = Some(descriptor(command));
    frames
}

#[tokio::test]
async fn create_reports_both_schemas() {
    let service = service();
    let created = create_prepared(&service, "SELECT ?").await;
    assert!(!created.prepared_statement_handle.is_empty());

    let dataset: Schema = IpcMessage(created.dataset_schema.clone()).try_into().unwrap();
    assert_eq!(dataset.fields().len(), 1);
    assert_eq!(dataset.field(0).data_type(), &DataType::Utf8);

    let parameters: Schema = IpcMessage(created.parameter_schema.clone())
        .try_into()
        .unwrap();
    assert_eq!(parameters.fields().len(), 1);
    assert_eq!(parameters.field(0).name(), "parameter_1");
    assert!(matches!(
        parameters.field(0).data_type(),
        DataType::Union(_, _)
    ));
}

#[tokio::test]
async fn prepared_query_lifecycle() {
    let service = service();
    let created = create_prepared(&service, "SELECT ?").await;
    let command = Command::PreparedStatementQuery(CommandPreparedStatementQuery {
        prepared_statement_handle: created.prepared_statement_handle.clone(),
    });

    // get_flight_info advertises the dataset schema and hands the command
    // back as its own ticket.
    let info = flight_info(&service, &command).await;
    let advertised = info.try_decode_schema().unwrap();
    let dataset: Schema = IpcMessage(created.dataset_schema.clone()).try_into().unwrap();
    assert_eq!(advertised.fields(), dataset.fields());

    // Bind one parameter row through do_put.
    let mut values = StringBuilder::new();
    values.append_value("bound");
    let batch = RecordBatch::try_from_iter(vec![(
        "parameter_1",
        std::sync::Arc::new(values.finish()) as arrow_array::ArrayRef,
    )])
    .unwrap();
    let frames = upload_frames(&command, batch).await;
    let acks = service
        .handle_do_put(stream::iter(frames.into_iter().map(Ok)))
        .await
        .unwrap();
    assert_eq!(acks.len(), 1);
    assert!(acks[0].app_metadata.is_empty());

    // Execute through the endpoint ticket.
    let batches = do_get_batches(&service, Ticket::new(command.encode())).await;
    assert_eq!(batches[0].num_rows(), 1);
    let column = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(column.value(0), "bound");

    close_prepared(&service, &created.prepared_statement_handle)
        .await
        .unwrap();
}

#[tokio::test]
async fn prepared_update_binds_and_counts() {
    let service = service();
    let created = create_prepared(&service, "INSERT INTO int_table VALUES (?, ?, ?, ?)").await;

    let dataset: Schema = IpcMessage(created.dataset_schema.clone()).try_into().unwrap();
    assert!(dataset.fields().is_empty());
    let parameters: Schema = IpcMessage(created.parameter_schema.clone())
        .try_into()
        .unwrap();
    assert_eq!(parameters.fields().len(), 4);

    let mut ids = Int64Builder::new();
    ids.append_value(4);
    let mut names = StringBuilder::new();
    names.append_value("four");
    let mut values = Int64Builder::new();
    values.append_value(40);
    let mut foreign_ids = Int64Builder::new();
    foreign_ids.append_value(2);
    let batch = RecordBatch::try_from_iter(vec![
        ("id", std::sync::Arc::new(ids.finish()) as arrow_array::ArrayRef),
        ("key_name", std::sync::Arc::new(names.finish()) as _),
        ("value", std::sync::Arc::new(values.finish()) as _),
        ("foreign_id", std::sync::Arc::new(foreign_ids.finish()) as _),
    ])
    .unwrap();

    let command = Command::PreparedStatementUpdate(CommandPreparedStatementUpdate {
        prepared_statement_handle: created.prepared_statement_handle.clone(),
    });
    let frames = upload_frames(&command, batch).await;
    let acks = service
        .handle_do_put(stream::iter(frames.into_iter().map(Ok)))
        .await
        .unwrap();
    let result = DoPutUpdateResult::decode(acks[0].app_metadata.clone()).unwrap();
    assert_eq!(result.record_count, 1);

    let batches = fetch(
        &service,
        &Command::StatementQuery(CommandStatementQuery {
            query: "SELECT * FROM int_table".into(),
        }),
    )
    .await;
    assert_eq!(batches[0].num_rows(), 4);
    let ids = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.value(3), 4);
}

#[tokio::test]
async fn close_is_terminal() {
    let service = service();
    let created = create_prepared(&service, "SELECT 1").await;
    let handle = created.prepared_statement_handle.clone();

    close_prepared(&service, &handle).await.unwrap();

    // Double close names a handle that no longer exists.
    let status = close_prepared(&service, &handle).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    // The handle is gone from every entry point.
    let command = Command::PreparedStatementQuery(CommandPreparedStatementQuery {
        prepared_statement_handle: handle,
    });
    let status = service
        .do_get(Request::new(Ticket::new(command.encode())))
        .await
        .err()
        .unwrap();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn unknown_action_type_rejected() {
    let service = service();
    let action = Action {
        r#type: "BeginTransaction".to_string(),
        body: Bytes::new(),
    };
    let status = service.do_action(Request::new(action)).await.err().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("BeginTransaction"));
}

#[tokio::test]
async fn create_with_invalid_sql_fails() {
    let service = service();
    let body = Envelope::pack(&ActionCreatePreparedStatementRequest {
        query: "GRANT ALL TO nobody".into(),
    })
    .encode_to_bytes();
    let action = Action {
        r#type: ACTION_CREATE_PREPARED_STATEMENT.to_string(),
        body,
    };
    let status = service.do_action(Request::new(action)).await.err().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn list_actions_advertises_both() {
    let service = service();
    let actions: Vec<_> = service
        .list_actions(Request::new(Empty {}))
        .await
        .unwrap()
        .into_inner()
        .try_collect()
        .await
        .unwrap();
    let names: Vec<&str> = actions.iter().map(|a| a.r#type.as_str()).collect();
    assert_eq!(
        names,
        vec![ACTION_CREATE_PREPARED_STATEMENT, ACTION_CLOSE_PREPARED_STATEMENT]
    );
}
