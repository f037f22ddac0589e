#![allow(dead_code)]

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::FlightService;
use arrow_flight::{FlightDescriptor, FlightInfo, Ticket};
use futures::{StreamExt, TryStreamExt};
use skylark_gateway::mem::MemEngine;
use skylark_gateway::SkylarkFlightSqlService;
use skylark_protocol::Command;
use tonic::Request;

/// A producer over the demo catalog, fresh state per test.
pub fn service() -> SkylarkFlightSqlService {
    SkylarkFlightSqlService::new(Arc::new(MemEngine::with_demo_data()))
}

pub fn descriptor(command: &Command) -> FlightDescriptor {
    FlightDescriptor::new_cmd(command.encode())
}

pub async fn flight_info(service: &SkylarkFlightSqlService, command: &Command) -> FlightInfo {
    service
        .get_flight_info(Request::new(descriptor(command)))
        .await
        .expect("get_flight_info")
        .into_inner()
}

pub fn endpoint_ticket(info: &FlightInfo) -> Ticket {
    info.endpoint[0]
        .ticket
        .clone()
        .expect("endpoint carries a ticket")
}

pub async fn do_get_batches(
    service: &SkylarkFlightSqlService,
    ticket: Ticket,
) -> Vec<RecordBatch> {
    let stream = service
        .do_get(Request::new(ticket))
        .await
        .expect("do_get")
        .into_inner();
    FlightRecordBatchStream::new_from_flight_data(stream.map_err(FlightError::from))
        .try_collect()
        .await
        .expect("decode do_get stream")
}

/// `get_flight_info` then `do_get` through the returned ticket.
pub async fn fetch(service: &SkylarkFlightSqlService, command: &Command) -> Vec<RecordBatch> {
    let info = flight_info(service, command).await;
    do_get_batches(service, endpoint_ticket(&info)).await
}
