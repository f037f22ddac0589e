//! Flight SQL producer over a pluggable SQL engine.
//!
//! The gateway exposes the Flight SQL command surface (statements, prepared
//! statements, catalog discovery, server info) as a gRPC Flight service. SQL
//! execution is delegated to a [`engine::SqlEngine`] implementation;
//! [`mem::MemEngine`] is the embedded reference engine.

pub mod discovery;
pub mod engine;
pub mod mem;
pub mod metrics;
pub mod producer;
pub mod registry;
pub mod telemetry;

pub use producer::SkylarkFlightSqlService;
