//! Seam between the Flight SQL surface and whatever executes SQL.
//!
//! The producer never interprets SQL itself; it hands statement text to a
//! [`SqlEngine`] and renders the engine's answers onto the wire. Catalog
//! filtering semantics (tri-state filters, SQL LIKE patterns) live here so
//! every engine applies them identically.

use arrow_array::RecordBatch;
use arrow_schema::{DataType, SchemaRef};
use skylark_protocol::variant::ScalarValue;
use skylark_protocol::{Result, TableRef};

/// One database schema (namespace) row for `GetDbSchemas`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub catalog: Option<String>,
    pub db_schema: Option<String>,
}

/// One table row for `GetTables`, carrying the column layout so the
/// `include_schema` variant can serialize it.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub catalog: Option<String>,
    pub db_schema: Option<String>,
    pub name: String,
    pub table_type: String,
    pub schema: SchemaRef,
}

/// One primary-key column row, ordered by `key_sequence` (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyEntry {
    pub column: String,
    pub key_sequence: i32,
    pub key_name: Option<String>,
}

/// One foreign-key column row. Rule codes use the integer mapping in
/// [`skylark_protocol::keys`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyEntry {
    pub pk_catalog: Option<String>,
    pub pk_db_schema: Option<String>,
    pub pk_table: String,
    pub pk_column: String,
    pub fk_catalog: Option<String>,
    pub fk_db_schema: Option<String>,
    pub fk_table: String,
    pub fk_column: String,
    pub key_sequence: i32,
    pub fk_key_name: Option<String>,
    pub pk_key_name: Option<String>,
    pub update_rule: i32,
    pub delete_rule: i32,
}

/// A prepared statement: schema introspection before execution, positional
/// parameter binding, then query or update execution.
pub trait Statement: Send {
    /// Schema of the result set this statement would produce as a query.
    fn result_schema(&self) -> SchemaRef;

    /// Number of positional parameters in the statement text.
    fn parameter_count(&self) -> usize;

    /// Engine-assigned name for parameter `index` (0-based), if it has one.
    fn parameter_name(&self, index: usize) -> Option<String>;

    /// Binds parameter `index` (0-based). Rebinding replaces the value.
    fn bind(&mut self, index: usize, value: ScalarValue) -> Result<()>;

    fn execute_query(&mut self) -> Result<Vec<RecordBatch>>;

    fn execute_update(&mut self) -> Result<i64>;
}

/// A SQL execution and catalog metadata source.
pub trait SqlEngine: Send + Sync {
    /// Parses and plans `sql`. Rejected text is `InvalidQuery` with the
    /// engine's message passed through verbatim.
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Distinct catalog names, sorted.
    fn catalogs(&self) -> Vec<String>;

    /// Schemas under `catalog` (exact tri-state filter) whose name matches
    /// `pattern` (LIKE tri-state filter).
    fn db_schemas(&self, catalog: Option<&str>, pattern: Option<&str>) -> Vec<SchemaEntry>;

    /// Tables surviving the catalog filter, both name patterns, and the
    /// `table_types` allow-list (empty list = every type).
    fn tables(
        &self,
        catalog: Option<&str>,
        db_schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        table_types: &[String],
    ) -> Vec<TableEntry>;

    /// Distinct table types, deduplicated.
    fn table_types(&self) -> Vec<String>;

    fn primary_keys(&self, table: &TableRef) -> Vec<PrimaryKeyEntry>;

    fn foreign_keys(&self, pk_table: &TableRef, fk_table: &TableRef) -> Vec<ForeignKeyEntry>;
}

/// Maps an engine's native type name onto an Arrow type. Unrecognized names
/// fall back to `Null` rather than failing.
pub fn arrow_type_for(native: &str) -> DataType {
    let lowered = native.to_ascii_lowercase();
    match lowered.as_str() {
        "int" | "integer" => DataType::Int64,
        "real" => DataType::Float64,
        "blob" => DataType::Binary,
        "text" => DataType::Utf8,
        _ if lowered.starts_with("char") || lowered.starts_with("varchar") => DataType::Utf8,
        _ => DataType::Null,
    }
}

/// SQL LIKE with `%` (any run) and `_` (any single character); everything
/// else matches literally.
pub fn like_match(pattern: &str, value: &str) -> bool {
    fn matches(pattern: &[char], value: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some(('%', rest)) => {
                (0..=value.len()).any(|skip| matches(rest, &value[skip..]))
            }
            Some(('_', rest)) => !value.is_empty() && matches(rest, &value[1..]),
            Some((c, rest)) => value.first() == Some(c) && matches(rest, &value[1..]),
        }
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    matches(&pattern, &value)
}

/// Tri-state LIKE filter: absent passes everything, present-but-empty keeps
/// only rows where the field itself is absent or empty, non-empty applies
/// the LIKE pattern.
pub fn matches_pattern(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        None => true,
        Some("") => value.map_or(true, str::is_empty),
        Some(pattern) => value.map_or(false, |v| like_match(pattern, v)),
    }
}

/// Tri-state exact filter, same absent/empty semantics as
/// [`matches_pattern`] but with string equality instead of LIKE.
pub fn matches_exact(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        None => true,
        Some("") => value.map_or(true, str::is_empty),
        Some(wanted) => value == Some(wanted),
    }
}
