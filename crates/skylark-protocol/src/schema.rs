//! Fixed result-set schemas for every discovery command.
//!
//! Each schema is a pure function of the command's shape, never of the data.
//! The metadata path, the schema path, and the row stream must all agree on
//! these layouts exactly; the gateway's tests hold all three to this module.
//! `GetTables` has two forms selected by the `include_schema` flag, which
//! appends one opaque column carrying each table's IPC-serialized schema.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use once_cell::sync::Lazy;

use crate::variant::sql_info_value_type;

static CATALOGS: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![Field::new(
        "catalog_name",
        DataType::Utf8,
        true,
    )]))
});

static DB_SCHEMAS: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("catalog_name", DataType::Utf8, true),
        Field::new("schema_name", DataType::Utf8, true),
    ]))
});

static TABLES: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("catalog_name", DataType::Utf8, true),
        Field::new("schema_name", DataType::Utf8, true),
        Field::new("table_name", DataType::Utf8, true),
        Field::new("table_type", DataType::Utf8, true),
    ]))
});

static TABLES_WITH_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let mut fields: Vec<Field> = TABLES.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new("table_schema", DataType::Binary, true));
    Arc::new(Schema::new(fields))
});

static TABLE_TYPES: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![Field::new(
        "table_type",
        DataType::Utf8,
        true,
    )]))
});

static PRIMARY_KEYS: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("catalog_name", DataType::Utf8, true),
        Field::new("schema_name", DataType::Utf8, true),
        Field::new("table_name", DataType::Utf8, true),
        Field::new("column_name", DataType::Utf8, true),
        Field::new("key_sequence", DataType::Int32, true),
        Field::new("key_name", DataType::Utf8, true),
    ]))
});

static FOREIGN_KEYS: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("pk_catalog_name", DataType::Utf8, true),
        Field::new("pk_schema_name", DataType::Utf8, true),
        Field::new("pk_table_name", DataType::Utf8, true),
        Field::new("pk_column_name", DataType::Utf8, true),
        Field::new("fk_catalog_name", DataType::Utf8, true),
        Field::new("fk_schema_name", DataType::Utf8, true),
        Field::new("fk_table_name", DataType::Utf8, true),
        Field::new("fk_column_name", DataType::Utf8, true),
        Field::new("key_sequence", DataType::Int32, true),
        Field::new("fk_key_name", DataType::Utf8, true),
        Field::new("pk_key_name", DataType::Utf8, true),
        Field::new("update_rule", DataType::Int32, true),
        Field::new("delete_rule", DataType::Int32, true),
    ]))
});

static SQL_INFO: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("info_name", DataType::Utf8, true),
        Field::new("value", sql_info_value_type(), false),
    ]))
});

pub fn catalogs() -> SchemaRef {
    Arc::clone(&CATALOGS)
}

pub fn db_schemas() -> SchemaRef {
    Arc::clone(&DB_SCHEMAS)
}

/// Schema of `GetTables` results; pass the command's `include_schema` flag.
pub fn tables(include_schema: bool) -> SchemaRef {
    if include_schema {
        Arc::clone(&TABLES_WITH_SCHEMA)
    } else {
        Arc::clone(&TABLES)
    }
}

pub fn table_types() -> SchemaRef {
    Arc::clone(&TABLE_TYPES)
}

pub fn primary_keys() -> SchemaRef {
    Arc::clone(&PRIMARY_KEYS)
}

pub fn foreign_keys() -> SchemaRef {
    Arc::clone(&FOREIGN_KEYS)
}

pub fn sql_info() -> SchemaRef {
    Arc::clone(&SQL_INFO)
}
