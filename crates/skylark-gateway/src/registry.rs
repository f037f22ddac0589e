//! Prepared statement registry.
//!
//! Handles are v4 UUIDs in a single flat namespace. The map is safe under
//! concurrent create/close/lookup; the per-handle mutex serializes bind and
//! execute races on one statement. Statements live until explicitly closed.

use std::sync::{Arc, Mutex};

use arrow_schema::{Field, Schema, SchemaRef};
use dashmap::DashMap;
use skylark_protocol::variant::parameter_type;
use skylark_protocol::{Error, Result};
use tracing::debug;
use uuid::Uuid;

use crate::engine::{SqlEngine, Statement};

pub struct PreparedStatement {
    pub query: String,
    pub statement: Box<dyn Statement>,
}

/// Outcome of `create`: the handle plus both schemas the create action
/// reports back to the client.
pub struct CreatedStatement {
    pub handle: String,
    pub dataset_schema: SchemaRef,
    pub parameter_schema: SchemaRef,
}

#[derive(Default)]
pub struct StatementRegistry {
    statements: DashMap<String, Arc<Mutex<PreparedStatement>>>,
}

/// One tagged-union field per positional parameter. Fields take the
/// engine's name when it assigns one, `parameter_<n>` (1-based) otherwise.
pub fn parameter_schema(statement: &dyn Statement) -> SchemaRef {
    let fields: Vec<Field> = (0..statement.parameter_count())
        .map(|i| {
            let name = statement
                .parameter_name(i)
                .unwrap_or_else(|| format!("parameter_{}", i + 1));
            Field::new(name, parameter_type(), true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares `sql` against the engine and registers it under a fresh
    /// handle. Rejected text surfaces as `InvalidQuery`.
    pub fn create(&self, engine: &dyn SqlEngine, sql: &str) -> Result<CreatedStatement> {
        let statement = engine.prepare(sql)?;
        let handle = Uuid::new_v4().to_string();
        let dataset_schema = statement.result_schema();
        let parameter_schema = parameter_schema(statement.as_ref());
        debug!(handle = %handle, parameters = statement.parameter_count(), "prepared statement created");
        self.statements.insert(
            handle.clone(),
            Arc::new(Mutex::new(PreparedStatement {
                query: sql.to_string(),
                statement,
            })),
        );
        crate::metrics::PREPARED_STATEMENTS_OPEN.inc();
        Ok(CreatedStatement {
            handle,
            dataset_schema,
            parameter_schema,
        })
    }

    pub fn lookup(&self, handle: &str) -> Result<Arc<Mutex<PreparedStatement>>> {
        self.statements
            .get(handle)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(format!("prepared statement {handle}")))
    }

    /// Removes the statement. Closing twice is an error: the second close
    /// names a handle that no longer exists.
    pub fn close(&self, handle: &str) -> Result<()> {
        self.statements
            .remove(handle)
            .map(|_| {
                crate::metrics::PREPARED_STATEMENTS_OPEN.dec();
                debug!(handle = %handle, "prepared statement closed");
            })
            .ok_or_else(|| Error::NotFound(format!("prepared statement {handle}")))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
