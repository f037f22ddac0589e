//! Server capability metadata served by `GetSqlInfo`.
//!
//! A server registers its capabilities once at startup into a
//! [`SqlInfoData`]; each `GetSqlInfo` call renders the registered entries
//! (optionally filtered by info id) into the two-column record batch whose
//! layout [`crate::schema::sql_info`] declares.

use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, StringArray};

use crate::error::Result;
use crate::schema;
use crate::variant::{SqlInfoUnionBuilder, SqlInfoValue};

/// Well-known info ids. The numeric values are wire contract.
pub mod info_id {
    pub const FLIGHT_SQL_SERVER_NAME: u32 = 0;
    pub const FLIGHT_SQL_SERVER_VERSION: u32 = 1;
    pub const FLIGHT_SQL_SERVER_ARROW_VERSION: u32 = 2;
    pub const FLIGHT_SQL_SERVER_READ_ONLY: u32 = 3;
    pub const SQL_IDENTIFIER_CASE: u32 = 503;
    pub const SQL_IDENTIFIER_QUOTE_CHAR: u32 = 504;
    pub const SQL_QUOTED_IDENTIFIER_CASE: u32 = 505;
    pub const SQL_NULL_ORDERING: u32 = 507;
    pub const SQL_KEYWORDS: u32 = 508;
    pub const SQL_NUMERIC_FUNCTIONS: u32 = 509;
    pub const SQL_STRING_FUNCTIONS: u32 = 510;
    pub const SQL_SUPPORTS_CONVERT: u32 = 519;
}

struct SqlInfoEntry {
    id: u32,
    name: String,
    value: SqlInfoValue,
}

/// Collects `(id, name, value)` entries in registration order.
#[derive(Default)]
pub struct SqlInfoDataBuilder {
    entries: Vec<SqlInfoEntry>,
}

impl SqlInfoDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one capability. Re-registering an id replaces the earlier
    /// entry in place.
    pub fn append(&mut self, id: u32, name: impl Into<String>, value: impl Into<SqlInfoValue>) {
        let entry = SqlInfoEntry {
            id,
            name: name.into(),
            value: value.into(),
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == id) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn build(self) -> SqlInfoData {
        SqlInfoData {
            entries: self.entries,
        }
    }
}

/// Immutable registered capability set.
pub struct SqlInfoData {
    entries: Vec<SqlInfoEntry>,
}

impl SqlInfoData {
    /// Renders the info batch. An empty `requested` list means all entries;
    /// otherwise entries are emitted in registration order and ids the
    /// server never registered are skipped, not errors.
    pub fn batch(&self, requested: &[u32]) -> Result<RecordBatch> {
        let mut names = Vec::new();
        let mut values = SqlInfoUnionBuilder::new();
        for entry in &self.entries {
            if !requested.is_empty() && !requested.contains(&entry.id) {
                continue;
            }
            names.push(Some(entry.name.clone()));
            values.append(&entry.value)?;
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(names)),
            Arc::new(values.finish()?),
        ];
        Ok(RecordBatch::try_new(schema::sql_info(), columns)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SqlInfoData {
        let mut builder = SqlInfoDataBuilder::new();
        builder.append(info_id::FLIGHT_SQL_SERVER_NAME, "flight_sql_server_name", "Skylark");
        builder.append(info_id::FLIGHT_SQL_SERVER_READ_ONLY, "flight_sql_server_read_only", false);
        builder.append(info_id::SQL_IDENTIFIER_CASE, "sql_identifier_case", 1i64);
        builder.append(
            info_id::SQL_KEYWORDS,
            "sql_keywords",
            vec!["SELECT".to_string(), "FROM".to_string()],
        );
        builder.build()
    }

    #[test]
    fn test_empty_filter_returns_all() {
        let batch = sample().batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.schema(), schema::sql_info());
    }

    #[test]
    fn test_id_filter_narrows_and_skips_unknown() {
        let batch = sample()
            .batch(&[info_id::SQL_IDENTIFIER_CASE, 9999])
            .unwrap();
        assert_eq!(batch.num_rows(), 1);
        let names = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "sql_identifier_case");
    }

    #[test]
    fn test_reappend_replaces() {
        let mut builder = SqlInfoDataBuilder::new();
        builder.append(0, "name", "first");
        builder.append(0, "name", "second");
        let data = builder.build();
        assert_eq!(data.len(), 1);
    }
}
