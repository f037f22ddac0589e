//! The self-describing command envelope.
//!
//! Every descriptor, ticket, and action body on the wire is a protobuf
//! `Any`: a type URL naming the payload message plus the serialized payload.
//! [`Envelope`] is that container, and [`Command`] is the closed sum type the
//! dispatcher branches on. Decoding is total: unparsable bytes are a
//! [`Error::MalformedCommand`], a recognized tag with an unparsable payload
//! is also `MalformedCommand`, and an unrecognized tag is
//! [`Error::InvalidArgument`], never a silent no-op.

use bytes::Bytes;
use prost::Message;

use crate::command::*;
use crate::error::{Error, Result};

/// Namespace prefix for all Skylark command type URLs. Matches the Flight
/// SQL protocol so independent client implementations interoperate.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/arrow.flight.protocol.sql.";

/// Action type string for creating a prepared statement.
pub const ACTION_CREATE_PREPARED_STATEMENT: &str = "CreatePreparedStatement";
/// Action type string for closing a prepared statement.
pub const ACTION_CLOSE_PREPARED_STATEMENT: &str = "ClosePreparedStatement";

/// A protocol message with a fixed type URL, packable into an [`Envelope`].
pub trait ProtocolMessage: Message + Default + Sized {
    /// Unqualified message name, appended to [`TYPE_URL_PREFIX`].
    const TYPE_NAME: &'static str;
}

macro_rules! protocol_message {
    ($($ty:ident),* $(,)?) => {
        $(impl ProtocolMessage for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);
        })*
    };
}

protocol_message!(
    CommandStatementQuery,
    CommandStatementUpdate,
    CommandPreparedStatementQuery,
    CommandPreparedStatementUpdate,
    CommandGetCatalogs,
    CommandGetDbSchemas,
    CommandGetTables,
    CommandGetTableTypes,
    CommandGetSqlInfo,
    CommandGetPrimaryKeys,
    CommandGetForeignKeys,
    TicketStatementQuery,
    ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult,
    ActionClosePreparedStatementRequest,
    DoPutUpdateResult,
);

/// Wire-compatible `google.protobuf.Any`: a type tag plus opaque payload.
/// Immutable once constructed; the tag uniquely determines the payload
/// schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub value: Bytes,
}

impl Envelope {
    /// Wraps a protocol message, serializing it deterministically.
    pub fn pack<M: ProtocolMessage>(message: &M) -> Self {
        Envelope {
            type_url: format!("{TYPE_URL_PREFIX}{}", M::TYPE_NAME),
            value: message.encode_to_vec().into(),
        }
    }

    /// Parses envelope framing from raw descriptor/ticket/body bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Envelope::decode(bytes).map_err(Error::malformed)
    }

    /// True if this envelope carries the given message type.
    pub fn is<M: ProtocolMessage>(&self) -> bool {
        self.type_url
            .strip_prefix(TYPE_URL_PREFIX)
            .is_some_and(|name| name == M::TYPE_NAME)
    }

    /// Unpacks the payload as `M`. The caller must have matched the tag; a
    /// mismatched tag or an unparsable payload is a `MalformedCommand`.
    pub fn unpack<M: ProtocolMessage>(&self) -> Result<M> {
        if !self.is::<M>() {
            return Err(Error::MalformedCommand(format!(
                "expected {}, got {}",
                M::TYPE_NAME,
                self.type_url
            )));
        }
        M::decode(self.value.as_ref()).map_err(Error::malformed)
    }

    /// Serializes the envelope back to wire bytes.
    pub fn encode_to_bytes(&self) -> Bytes {
        self.encode_to_vec().into()
    }
}

/// The closed set of commands the producer dispatches on. New variants are a
/// wire-protocol change; every dispatch site matches exhaustively so the
/// compiler flags any addition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StatementQuery(CommandStatementQuery),
    StatementUpdate(CommandStatementUpdate),
    PreparedStatementQuery(CommandPreparedStatementQuery),
    PreparedStatementUpdate(CommandPreparedStatementUpdate),
    GetCatalogs(CommandGetCatalogs),
    GetDbSchemas(CommandGetDbSchemas),
    GetTables(CommandGetTables),
    GetTableTypes(CommandGetTableTypes),
    GetSqlInfo(CommandGetSqlInfo),
    GetPrimaryKeys(CommandGetPrimaryKeys),
    GetForeignKeys(CommandGetForeignKeys),
    TicketStatementQuery(TicketStatementQuery),
}

impl Command {
    /// Decodes a command from raw envelope bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope = Envelope::parse(bytes)?;
        Command::try_from(&envelope)
    }

    /// Encodes the command as envelope wire bytes, the inverse of
    /// [`Command::decode`].
    pub fn encode(&self) -> Bytes {
        self.to_envelope().encode_to_bytes()
    }

    pub fn to_envelope(&self) -> Envelope {
        match self {
            Command::StatementQuery(c) => Envelope::pack(c),
            Command::StatementUpdate(c) => Envelope::pack(c),
            Command::PreparedStatementQuery(c) => Envelope::pack(c),
            Command::PreparedStatementUpdate(c) => Envelope::pack(c),
            Command::GetCatalogs(c) => Envelope::pack(c),
            Command::GetDbSchemas(c) => Envelope::pack(c),
            Command::GetTables(c) => Envelope::pack(c),
            Command::GetTableTypes(c) => Envelope::pack(c),
            Command::GetSqlInfo(c) => Envelope::pack(c),
            Command::GetPrimaryKeys(c) => Envelope::pack(c),
            Command::GetForeignKeys(c) => Envelope::pack(c),
            Command::TicketStatementQuery(c) => Envelope::pack(c),
        }
    }

    /// Unqualified message name, used in logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::StatementQuery(_) => CommandStatementQuery::TYPE_NAME,
            Command::StatementUpdate(_) => CommandStatementUpdate::TYPE_NAME,
            Command::PreparedStatementQuery(_) => CommandPreparedStatementQuery::TYPE_NAME,
            Command::PreparedStatementUpdate(_) => CommandPreparedStatementUpdate::TYPE_NAME,
            Command::GetCatalogs(_) => CommandGetCatalogs::TYPE_NAME,
            Command::GetDbSchemas(_) => CommandGetDbSchemas::TYPE_NAME,
            Command::GetTables(_) => CommandGetTables::TYPE_NAME,
            Command::GetTableTypes(_) => CommandGetTableTypes::TYPE_NAME,
            Command::GetSqlInfo(_) => CommandGetSqlInfo::TYPE_NAME,
            Command::GetPrimaryKeys(_) => CommandGetPrimaryKeys::TYPE_NAME,
            Command::GetForeignKeys(_) => CommandGetForeignKeys::TYPE_NAME,
            Command::TicketStatementQuery(_) => TicketStatementQuery::TYPE_NAME,
        }
    }
}

impl TryFrom<&Envelope> for Command {
    type Error = Error;

    fn try_from(envelope: &Envelope) -> Result<Self> {
        let name = envelope
            .type_url
            .strip_prefix(TYPE_URL_PREFIX)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("unrecognized type URL: {}", envelope.type_url))
            })?;

        let command = match name {
            CommandStatementQuery::TYPE_NAME => Command::StatementQuery(envelope.unpack()?),
            CommandStatementUpdate::TYPE_NAME => Command::StatementUpdate(envelope.unpack()?),
            CommandPreparedStatementQuery::TYPE_NAME => {
                Command::PreparedStatementQuery(envelope.unpack()?)
            }
            CommandPreparedStatementUpdate::TYPE_NAME => {
                Command::PreparedStatementUpdate(envelope.unpack()?)
            }
            CommandGetCatalogs::TYPE_NAME => Command::GetCatalogs(envelope.unpack()?),
            CommandGetDbSchemas::TYPE_NAME => Command::GetDbSchemas(envelope.unpack()?),
            CommandGetTables::TYPE_NAME => Command::GetTables(envelope.unpack()?),
            CommandGetTableTypes::TYPE_NAME => Command::GetTableTypes(envelope.unpack()?),
            CommandGetSqlInfo::TYPE_NAME => Command::GetSqlInfo(envelope.unpack()?),
            CommandGetPrimaryKeys::TYPE_NAME => Command::GetPrimaryKeys(envelope.unpack()?),
            CommandGetForeignKeys::TYPE_NAME => Command::GetForeignKeys(envelope.unpack()?),
            TicketStatementQuery::TYPE_NAME => Command::TicketStatementQuery(envelope.unpack()?),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unrecognized command type: {other}"
                )))
            }
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Command> {
        vec![
            Command::StatementQuery(CommandStatementQuery {
                query: "SELECT 1".into(),
            }),
            Command::StatementUpdate(CommandStatementUpdate {
                query: "DELETE FROM int_table".into(),
            }),
            Command::PreparedStatementQuery(CommandPreparedStatementQuery {
                prepared_statement_handle: Bytes::from_static(b"handle-1"),
            }),
            Command::PreparedStatementUpdate(CommandPreparedStatementUpdate {
                prepared_statement_handle: Bytes::from_static(b"handle-2"),
            }),
            Command::GetCatalogs(CommandGetCatalogs {}),
            Command::GetDbSchemas(CommandGetDbSchemas {
                catalog: Some("memory".into()),
                db_schema_filter_pattern: Some(String::new()),
            }),
            Command::GetTables(CommandGetTables {
                catalog: None,
                db_schema_filter_pattern: Some("PUB%".into()),
                table_name_filter_pattern: None,
                table_types: vec!["TABLE".into(), "VIEW".into()],
                include_schema: true,
            }),
            Command::GetTableTypes(CommandGetTableTypes {}),
            Command::GetSqlInfo(CommandGetSqlInfo { info: vec![0, 1, 2] }),
            Command::GetPrimaryKeys(CommandGetPrimaryKeys {
                catalog: None,
                db_schema: None,
                table: "int_table".into(),
            }),
            Command::GetForeignKeys(CommandGetForeignKeys {
                pk_catalog: None,
                pk_db_schema: None,
                pk_table: "foreign_table".into(),
                fk_catalog: None,
                fk_db_schema: None,
                fk_table: "int_table".into(),
            }),
            Command::TicketStatementQuery(TicketStatementQuery {
                statement_handle: Bytes::from_static(b"SELECT 1"),
            }),
        ]
    }

    #[test]
    fn test_roundtrip_every_variant() {
        for command in all_variants() {
            let decoded = Command::decode(&command.encode()).unwrap();
            assert_eq!(decoded, command, "{} did not round-trip", command.type_name());
        }
    }

    #[test]
    fn test_unknown_type_url_is_invalid_argument() {
        let envelope = Envelope {
            type_url: format!("{TYPE_URL_PREFIX}CommandDoesNotExist"),
            value: Bytes::new(),
        };
        let err = Command::try_from(&envelope).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let envelope = Envelope {
            type_url: "type.example.com/some.other.Message".into(),
            value: Bytes::new(),
        };
        let err = Command::try_from(&envelope).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let err = Command::decode(&[0xff, 0xff, 0xff, 0x01]).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand(_)));
    }

    #[test]
    fn test_payload_mismatch_is_malformed() {
        // A recognized tag whose payload does not parse against the tag's
        // declared shape: field 1 is a string, but the bytes are not UTF-8.
        let envelope = Envelope {
            type_url: format!("{TYPE_URL_PREFIX}{}", CommandStatementQuery::TYPE_NAME),
            value: Bytes::from_static(&[0x0a, 0x02, 0xff, 0xfe]),
        };
        let err = Command::try_from(&envelope).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand(_)));
    }

    #[test]
    fn test_action_type_names() {
        assert_eq!(ACTION_CREATE_PREPARED_STATEMENT, "CreatePreparedStatement");
        assert_eq!(ACTION_CLOSE_PREPARED_STATEMENT, "ClosePreparedStatement");
    }
}
