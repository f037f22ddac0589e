//! Flight SQL command and action messages.
//!
//! These are hand-maintained prost messages rather than build-time codegen:
//! the field numbers and type URLs (see [`crate::envelope`]) are the wire
//! contract, and keeping them in source makes the contract reviewable.
//! Proto3 `optional` string fields map to `Option<String>`; the distinction
//! between an absent filter, a present-but-empty filter, and a non-empty
//! pattern is semantically load-bearing and must survive a round trip.

use bytes::Bytes;

/// Execute an ad-hoc SQL query and fetch its result stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandStatementQuery {
    #[prost(string, tag = "1")]
    pub query: String,
}

/// Execute an ad-hoc SQL update; the affected-row count is acknowledged in a
/// [`DoPutUpdateResult`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandStatementUpdate {
    #[prost(string, tag = "1")]
    pub query: String,
}

/// Reference a server-side prepared statement for query execution or
/// parameter binding.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandPreparedStatementQuery {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}

/// Reference a server-side prepared statement for update execution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandPreparedStatementUpdate {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}

/// List the catalogs known to the server.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetCatalogs {}

/// List database schemas, optionally constrained to one catalog and a
/// `LIKE`-style schema name pattern.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetDbSchemas {
    #[prost(string, optional, tag = "1")]
    pub catalog: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema_filter_pattern: Option<String>,
}

/// List tables. An empty `table_types` list means all types; `include_schema`
/// selects the wider result form carrying each table's serialized schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetTables {
    #[prost(string, optional, tag = "1")]
    pub catalog: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema_filter_pattern: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub table_name_filter_pattern: Option<String>,
    #[prost(string, repeated, tag = "4")]
    pub table_types: Vec<String>,
    #[prost(bool, tag = "5")]
    pub include_schema: bool,
}

/// List the distinct table types present in the server's catalog.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetTableTypes {}

/// Fetch SQL capability metadata. An empty `info` list requests everything.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetSqlInfo {
    #[prost(uint32, repeated, tag = "1")]
    pub info: Vec<u32>,
}

/// List the primary key columns of one table.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetPrimaryKeys {
    #[prost(string, optional, tag = "1")]
    pub catalog: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema: Option<String>,
    #[prost(string, tag = "3")]
    pub table: String,
}

/// List the foreign key relationships between a referenced (pk side) table
/// and a referencing (fk side) table.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetForeignKeys {
    #[prost(string, optional, tag = "1")]
    pub pk_catalog: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub pk_db_schema: Option<String>,
    #[prost(string, tag = "3")]
    pub pk_table: String,
    #[prost(string, optional, tag = "4")]
    pub fk_catalog: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub fk_db_schema: Option<String>,
    #[prost(string, tag = "6")]
    pub fk_table: String,
}

/// Ticket for an ad-hoc statement stream. The handle embeds the query text
/// itself, so the data-retrieval call needs no server-side session state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TicketStatementQuery {
    #[prost(bytes = "bytes", tag = "1")]
    pub statement_handle: Bytes,
}

/// Body of the `CreatePreparedStatement` action.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionCreatePreparedStatementRequest {
    #[prost(string, tag = "1")]
    pub query: String,
}

/// Result of the `CreatePreparedStatement` action: the opaque handle plus the
/// IPC-serialized dataset and parameter schemas.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionCreatePreparedStatementResult {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    pub dataset_schema: Bytes,
    #[prost(bytes = "bytes", tag = "3")]
    pub parameter_schema: Bytes,
}

/// Body of the `ClosePreparedStatement` action.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionClosePreparedStatementRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}

/// Acknowledgement message for update commands, carried in the `DoPut`
/// result's app metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoPutUpdateResult {
    #[prost(int64, tag = "1")]
    pub record_count: i64,
}

/// Value-typed composite key identifying one table, shared by the primary
/// key and foreign key lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub db_schema: Option<String>,
    pub table: String,
}

impl CommandGetPrimaryKeys {
    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.catalog.clone(),
            db_schema: self.db_schema.clone(),
            table: self.table.clone(),
        }
    }
}

impl CommandGetForeignKeys {
    /// The referenced (primary key side) table.
    pub fn pk_table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.pk_catalog.clone(),
            db_schema: self.pk_db_schema.clone(),
            table: self.pk_table.clone(),
        }
    }

    /// The referencing (foreign key side) table.
    pub fn fk_table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.fk_catalog.clone(),
            db_schema: self.fk_db_schema.clone(),
            table: self.fk_table.clone(),
        }
    }
}
