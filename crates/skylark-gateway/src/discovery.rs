//! Renders engine catalog metadata into the fixed discovery result schemas.
//!
//! One builder per discovery command; each produces a single `RecordBatch`
//! whose schema is exactly what `get_schema` advertises for that command.

use std::sync::Arc;

use arrow_array::builder::BinaryBuilder;
use arrow_array::{ArrayRef, Int32Array, RecordBatch, StringArray};
use arrow_flight::{IpcMessage, SchemaAsIpc};
use arrow_ipc::writer::IpcWriteOptions;
use arrow_schema::Schema;
use skylark_protocol::command::{
    CommandGetDbSchemas, CommandGetForeignKeys, CommandGetPrimaryKeys, CommandGetSqlInfo,
    CommandGetTables,
};
use skylark_protocol::sql_info::SqlInfoData;
use skylark_protocol::{schema, Result};

use crate::engine::SqlEngine;

pub fn catalogs(engine: &dyn SqlEngine) -> Result<RecordBatch> {
    let names: StringArray = engine.catalogs().into_iter().map(Some).collect();
    Ok(RecordBatch::try_new(
        schema::catalogs(),
        vec![Arc::new(names)],
    )?)
}

pub fn db_schemas(engine: &dyn SqlEngine, cmd: &CommandGetDbSchemas) -> Result<RecordBatch> {
    let entries = engine.db_schemas(
        cmd.catalog.as_deref(),
        cmd.db_schema_filter_pattern.as_deref(),
    );
    let catalog_names: StringArray = entries.iter().map(|e| e.catalog.clone()).collect();
    let schema_names: StringArray = entries.iter().map(|e| e.db_schema.clone()).collect();
    Ok(RecordBatch::try_new(
        schema::db_schemas(),
        vec![Arc::new(catalog_names), Arc::new(schema_names)],
    )?)
}

/// Serializes one table's column layout the way schemas travel everywhere
/// else on this protocol: as an IPC schema message.
fn ipc_schema_bytes(schema: &Schema) -> Result<Vec<u8>> {
    let options = IpcWriteOptions::default();
    let message: IpcMessage = SchemaAsIpc::new(schema, &options).try_into()?;
    Ok(message.0.to_vec())
}

pub fn tables(engine: &dyn SqlEngine, cmd: &CommandGetTables) -> Result<RecordBatch> {
    let entries = engine.tables(
        cmd.catalog.as_deref(),
        cmd.db_schema_filter_pattern.as_deref(),
        cmd.table_name_filter_pattern.as_deref(),
        &cmd.table_types,
    );
    let catalog_names: StringArray = entries.iter().map(|e| e.catalog.clone()).collect();
    let schema_names: StringArray = entries.iter().map(|e| e.db_schema.clone()).collect();
    let table_names: StringArray = entries.iter().map(|e| Some(e.name.clone())).collect();
    let table_types: StringArray = entries.iter().map(|e| Some(e.table_type.clone())).collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(catalog_names),
        Arc::new(schema_names),
        Arc::new(table_names),
        Arc::new(table_types),
    ];
    if cmd.include_schema {
        let mut table_schemas = BinaryBuilder::new();
        for entry in &entries {
            table_schemas.append_value(ipc_schema_bytes(&entry.schema)?);
        }
        columns.push(Arc::new(table_schemas.finish()));
    }
    Ok(RecordBatch::try_new(
        schema::tables(cmd.include_schema),
        columns,
    )?)
}

pub fn table_types(engine: &dyn SqlEngine) -> Result<RecordBatch> {
    let types: StringArray = engine.table_types().into_iter().map(Some).collect();
    Ok(RecordBatch::try_new(
        schema::table_types(),
        vec![Arc::new(types)],
    )?)
}

pub fn primary_keys(engine: &dyn SqlEngine, cmd: &CommandGetPrimaryKeys) -> Result<RecordBatch> {
    let table_ref = cmd.table_ref();
    let keys = engine.primary_keys(&table_ref);

    let catalog_names: StringArray = keys.iter().map(|_| table_ref.catalog.clone()).collect();
    let schema_names: StringArray = keys.iter().map(|_| table_ref.db_schema.clone()).collect();
    let table_names: StringArray = keys.iter().map(|_| Some(table_ref.table.clone())).collect();
    let column_names: StringArray = keys.iter().map(|k| Some(k.column.clone())).collect();
    let key_sequences: Int32Array = keys.iter().map(|k| Some(k.key_sequence)).collect();
    let key_names: StringArray = keys.iter().map(|k| k.key_name.clone()).collect();

    Ok(RecordBatch::try_new(
        schema::primary_keys(),
        vec![
            Arc::new(catalog_names),
            Arc::new(schema_names),
            Arc::new(table_names),
            Arc::new(column_names),
            Arc::new(key_sequences),
            Arc::new(key_names),
        ],
    )?)
}

pub fn foreign_keys(engine: &dyn SqlEngine, cmd: &CommandGetForeignKeys) -> Result<RecordBatch> {
    let keys = engine.foreign_keys(&cmd.pk_table_ref(), &cmd.fk_table_ref());

    let pk_catalogs: StringArray = keys.iter().map(|k| k.pk_catalog.clone()).collect();
    let pk_schemas: StringArray = keys.iter().map(|k| k.pk_db_schema.clone()).collect();
    let pk_tables: StringArray = keys.iter().map(|k| Some(k.pk_table.clone())).collect();
    let pk_columns: StringArray = keys.iter().map(|k| Some(k.pk_column.clone())).collect();
    let fk_catalogs: StringArray = keys.iter().map(|k| k.fk_catalog.clone()).collect();
    let fk_schemas: StringArray = keys.iter().map(|k| k.fk_db_schema.clone()).collect();
    let fk_tables: StringArray = keys.iter().map(|k| Some(k.fk_table.clone())).collect();
    let fk_columns: StringArray = keys.iter().map(|k| Some(k.fk_column.clone())).collect();
    let key_sequences: Int32Array = keys.iter().map(|k| Some(k.key_sequence)).collect();
    let fk_key_names: StringArray = keys.iter().map(|k| k.fk_key_name.clone()).collect();
    let pk_key_names: StringArray = keys.iter().map(|k| k.pk_key_name.clone()).collect();
    let update_rules: Int32Array = keys.iter().map(|k| Some(k.update_rule)).collect();
    let delete_rules: Int32Array = keys.iter().map(|k| Some(k.delete_rule)).collect();

    Ok(RecordBatch::try_new(
        schema::foreign_keys(),
        vec![
            Arc::new(pk_catalogs),
            Arc::new(pk_schemas),
            Arc::new(pk_tables),
            Arc::new(pk_columns),
            Arc::new(fk_catalogs),
            Arc::new(fk_schemas),
            Arc::new(fk_tables),
            Arc::new(fk_columns),
            Arc::new(key_sequences),
            Arc::new(fk_key_names),
            Arc::new(pk_key_names),
            Arc::new(update_rules),
            Arc::new(delete_rules),
        ],
    )?)
}

pub fn sql_info(info: &SqlInfoData, cmd: &CommandGetSqlInfo) -> Result<RecordBatch> {
    info.batch(&cmd.info)
}
