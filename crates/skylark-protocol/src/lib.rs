//! Skylark Flight SQL wire protocol.
//!
//! This crate is the interoperability contract of the Skylark gateway: the
//! closed set of SQL command messages, the self-describing envelope they
//! travel in, the exact result-set schema of every metadata stream, and the
//! dense-union value encoding shared by `GetSqlInfo` results and prepared
//! statement parameters.
//!
//! Everything here is byte-compatible with the Arrow Flight SQL protocol:
//! commands are protobuf messages wrapped in a `google.protobuf.Any` with
//! `type.googleapis.com/arrow.flight.protocol.sql.*` type URLs, so any
//! independent Flight SQL client can talk to a Skylark server with no shared
//! code.

pub mod command;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod schema;
pub mod sql_info;
pub mod variant;

pub use command::TableRef;
pub use envelope::{Command, Envelope};
pub use error::{Error, Result};
