//! Embedded in-memory reference engine.
//!
//! `MemEngine` backs the server binary and the test suite. It understands
//! just enough SQL to exercise every protocol path: `SELECT` of literals and
//! positional parameters, `SELECT * FROM <table>`, `INSERT INTO <table>
//! VALUES (...)`, and `DELETE FROM <table>`. Anything else is rejected at
//! prepare time.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use arrow_array::builder::{BooleanBuilder, Int32Builder, Int64Builder, StringBuilder};
use arrow_array::{new_null_array, ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use skylark_protocol::variant::ScalarValue;
use skylark_protocol::{Error, Result, TableRef};

use crate::engine::{
    arrow_type_for, matches_exact, matches_pattern, ForeignKeyEntry, PrimaryKeyEntry, SchemaEntry,
    SqlEngine, Statement, TableEntry,
};

struct Column {
    name: String,
    native_type: String,
}

struct MemTable {
    catalog: Option<String>,
    db_schema: Option<String>,
    name: String,
    table_type: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Option<ScalarValue>>>,
    primary_keys: Vec<PrimaryKeyEntry>,
    foreign_keys: Vec<ForeignKeyEntry>,
}

impl MemTable {
    fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, arrow_type_for(&c.native_type), true))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// In-memory SQL engine with a mutable table store.
#[derive(Clone)]
pub struct MemEngine {
    tables: Arc<RwLock<Vec<MemTable>>>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seeds the two-table demo catalog the server binary ships with:
    /// `foreign_table` referenced by `int_table` through a NO ACTION foreign
    /// key, plus a view in a second schema so schema filters have something
    /// to exclude.
    pub fn with_demo_data() -> Self {
        let engine = Self::new();
        {
            let mut tables = engine.tables.write().unwrap();
            tables.push(MemTable {
                catalog: Some("main".into()),
                db_schema: Some("PUBLIC".into()),
                name: "foreign_table".into(),
                table_type: "table".into(),
                columns: vec![
                    Column {
                        name: "id".into(),
                        native_type: "int".into(),
                    },
                    Column {
                        name: "foreign_name".into(),
                        native_type: "varchar(100)".into(),
                    },
                    Column {
                        name: "value".into(),
                        native_type: "int".into(),
                    },
                ],
                rows: vec![
                    vec![
                        Some(ScalarValue::Int64(1)),
                        Some(ScalarValue::Utf8("keyOne".into())),
                        Some(ScalarValue::Int64(1)),
                    ],
                    vec![
                        Some(ScalarValue::Int64(2)),
                        Some(ScalarValue::Utf8("keyTwo".into())),
                        Some(ScalarValue::Int64(0)),
                    ],
                ],
                primary_keys: vec![PrimaryKeyEntry {
                    column: "id".into(),
                    key_sequence: 1,
                    key_name: None,
                }],
                foreign_keys: Vec::new(),
            });
            tables.push(MemTable {
                catalog: Some("main".into()),
                db_schema: Some("PUBLIC".into()),
                name: "int_table".into(),
                table_type: "table".into(),
                columns: vec![
                    Column {
                        name: "id".into(),
                        native_type: "int".into(),
                    },
                    Column {
                        name: "key_name".into(),
                        native_type: "varchar(100)".into(),
                    },
                    Column {
                        name: "value".into(),
                        native_type: "int".into(),
                    },
                    Column {
                        name: "foreign_id".into(),
                        native_type: "int".into(),
                    },
                ],
                rows: vec![
                    vec![
                        Some(ScalarValue::Int64(1)),
                        Some(ScalarValue::Utf8("one".into())),
                        Some(ScalarValue::Int64(1)),
                        Some(ScalarValue::Int64(1)),
                    ],
                    vec![
                        Some(ScalarValue::Int64(2)),
                        Some(ScalarValue::Utf8("zero".into())),
                        Some(ScalarValue::Int64(0)),
                        Some(ScalarValue::Int64(1)),
                    ],
                    vec![
                        Some(ScalarValue::Int64(3)),
                        None,
                        Some(ScalarValue::Int64(-1)),
                        Some(ScalarValue::Int64(2)),
                    ],
                ],
                primary_keys: vec![PrimaryKeyEntry {
                    column: "id".into(),
                    key_sequence: 1,
                    key_name: None,
                }],
                foreign_keys: vec![ForeignKeyEntry {
                    pk_catalog: Some("main".into()),
                    pk_db_schema: Some("PUBLIC".into()),
                    pk_table: "foreign_table".into(),
                    pk_column: "id".into(),
                    fk_catalog: Some("main".into()),
                    fk_db_schema: Some("PUBLIC".into()),
                    fk_table: "int_table".into(),
                    fk_column: "foreign_id".into(),
                    key_sequence: 1,
                    fk_key_name: None,
                    pk_key_name: None,
                    update_rule: skylark_protocol::keys::RULE_NO_ACTION,
                    delete_rule: skylark_protocol::keys::RULE_NO_ACTION,
                }],
            });
            tables.push(MemTable {
                catalog: Some("main".into()),
                db_schema: Some("OTHER".into()),
                name: "value_view".into(),
                table_type: "view".into(),
                columns: vec![Column {
                    name: "value".into(),
                    native_type: "int".into(),
                }],
                rows: Vec::new(),
                primary_keys: Vec::new(),
                foreign_keys: Vec::new(),
            });
        }
        engine
    }
}

impl Default for MemEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ── micro-dialect parsing ──

#[derive(Debug, Clone, PartialEq)]
enum ValueExpr {
    Literal(Option<ScalarValue>),
    Parameter(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct SelectItem {
    label: String,
    expr: ValueExpr,
}

#[derive(Debug, Clone, PartialEq)]
enum Plan {
    SelectItems(Vec<SelectItem>),
    SelectAll(String),
    Insert { table: String, values: Vec<ValueExpr> },
    DeleteAll(String),
}

fn invalid(sql: &str, detail: &str) -> Error {
    Error::InvalidQuery(format!("{detail}: {sql}"))
}

/// Splits on top-level commas, respecting single-quoted strings.
fn split_exprs(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            ',' if !in_string => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let last = current.trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last.to_string());
    }
    parts
}

fn parse_value_expr(text: &str, next_param: &mut usize) -> Result<ValueExpr> {
    let text = text.trim();
    if text == "?" {
        let index = *next_param;
        *next_param += 1;
        return Ok(ValueExpr::Parameter(index));
    }
    if text.eq_ignore_ascii_case("null") {
        return Ok(ValueExpr::Literal(None));
    }
    if text.eq_ignore_ascii_case("true") {
        return Ok(ValueExpr::Literal(Some(ScalarValue::Boolean(true))));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(ValueExpr::Literal(Some(ScalarValue::Boolean(false))));
    }
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return Ok(ValueExpr::Literal(Some(ScalarValue::Utf8(
            text[1..text.len() - 1].to_string(),
        ))));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(ValueExpr::Literal(Some(ScalarValue::Int64(n))));
    }
    Err(Error::InvalidQuery(format!("unsupported expression: {text}")))
}

fn parse_identifier(text: &str) -> Result<String> {
    let ident = text.trim().trim_end_matches(';').trim();
    if ident.is_empty()
        || !ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::InvalidQuery(format!("invalid table name: {text}")));
    }
    Ok(ident.to_string())
}

fn parse(sql: &str) -> Result<Plan> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    let upper = trimmed.to_ascii_uppercase();

    if let Some(rest) = strip_keyword(trimmed, &upper, "SELECT") {
        let rest_upper = rest.to_ascii_uppercase();
        if let Some(table) = strip_keyword(rest, &rest_upper, "* FROM") {
            return Ok(Plan::SelectAll(parse_identifier(table)?));
        }
        let mut next_param = 0;
        let mut items = Vec::new();
        for part in split_exprs(rest) {
            if part.is_empty() {
                return Err(invalid(sql, "empty select item"));
            }
            let expr = parse_value_expr(&part, &mut next_param)?;
            items.push(SelectItem { label: part, expr });
        }
        if items.is_empty() {
            return Err(invalid(sql, "empty select list"));
        }
        return Ok(Plan::SelectItems(items));
    }

    if let Some(rest) = strip_keyword(trimmed, &upper, "INSERT INTO") {
        let values_at = rest
            .to_ascii_uppercase()
            .find("VALUES")
            .ok_or_else(|| invalid(sql, "missing VALUES clause"))?;
        let table = parse_identifier(&rest[..values_at])?;
        let tail = rest[values_at + "VALUES".len()..].trim();
        if !tail.starts_with('(') || !tail.ends_with(')') {
            return Err(invalid(sql, "malformed VALUES list"));
        }
        let mut next_param = 0;
        let mut values = Vec::new();
        for part in split_exprs(&tail[1..tail.len() - 1]) {
            values.push(parse_value_expr(&part, &mut next_param)?);
        }
        if values.is_empty() {
            return Err(invalid(sql, "empty VALUES list"));
        }
        return Ok(Plan::Insert { table, values });
    }

    if let Some(table) = strip_keyword(trimmed, &upper, "DELETE FROM") {
        return Ok(Plan::DeleteAll(parse_identifier(table)?));
    }

    Err(invalid(sql, "unsupported statement"))
}

fn strip_keyword<'a>(text: &'a str, upper: &str, keyword: &str) -> Option<&'a str> {
    let rest = upper.strip_prefix(keyword)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(text[keyword.len()..].trim_start())
}

// ── statement execution ──

pub struct MemStatement {
    tables: Arc<RwLock<Vec<MemTable>>>,
    plan: Plan,
    schema: SchemaRef,
    binds: Vec<Option<ScalarValue>>,
}

fn expr_type(expr: &ValueExpr) -> DataType {
    match expr {
        ValueExpr::Literal(Some(ScalarValue::Utf8(_))) => DataType::Utf8,
        ValueExpr::Literal(Some(ScalarValue::Boolean(_))) => DataType::Boolean,
        ValueExpr::Literal(Some(ScalarValue::Int64(_))) => DataType::Int64,
        ValueExpr::Literal(Some(ScalarValue::Int32(_))) => DataType::Int32,
        ValueExpr::Literal(None) => DataType::Null,
        // A bare parameter has no declared type until bound; text is the
        // one every client in the demo dialect can produce.
        ValueExpr::Parameter(_) => DataType::Utf8,
    }
}

fn parameter_count(plan: &Plan) -> usize {
    match plan {
        Plan::SelectItems(items) => items
            .iter()
            .filter(|i| matches!(i.expr, ValueExpr::Parameter(_)))
            .count(),
        Plan::Insert { values, .. } => values
            .iter()
            .filter(|e| matches!(e, ValueExpr::Parameter(_)))
            .count(),
        Plan::SelectAll(_) | Plan::DeleteAll(_) => 0,
    }
}

/// Coerces a bound or literal value onto a declared column type. Integer
/// widening is the only implicit conversion.
fn coerce(value: Option<ScalarValue>, data_type: &DataType) -> Result<Option<ScalarValue>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let coerced = match (value, data_type) {
        (v @ ScalarValue::Utf8(_), DataType::Utf8) => v,
        (v @ ScalarValue::Boolean(_), DataType::Boolean) => v,
        (v @ ScalarValue::Int64(_), DataType::Int64) => v,
        (v @ ScalarValue::Int32(_), DataType::Int32) => v,
        (ScalarValue::Int32(n), DataType::Int64) => ScalarValue::Int64(n as i64),
        (ScalarValue::Int64(n), DataType::Int32) => {
            let narrowed = i32::try_from(n).map_err(|_| {
                Error::UnsupportedValue(format!("{n} does not fit in an int32 column"))
            })?;
            ScalarValue::Int32(narrowed)
        }
        (value, data_type) => {
            return Err(Error::UnsupportedValue(format!(
                "cannot store {value:?} in a {data_type} column"
            )))
        }
    };
    Ok(Some(coerced))
}

fn build_column(data_type: &DataType, cells: &[Option<ScalarValue>]) -> Result<ArrayRef> {
    match data_type {
        DataType::Utf8 => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                match cell {
                    Some(ScalarValue::Utf8(v)) => builder.append_value(v),
                    None => builder.append_null(),
                    Some(other) => {
                        return Err(Error::UnsupportedValue(format!(
                            "{other:?} in a utf8 column"
                        )))
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for cell in cells {
                match cell {
                    Some(ScalarValue::Boolean(v)) => builder.append_value(*v),
                    None => builder.append_null(),
                    Some(other) => {
                        return Err(Error::UnsupportedValue(format!(
                            "{other:?} in a boolean column"
                        )))
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for cell in cells {
                match cell {
                    Some(ScalarValue::Int64(v)) => builder.append_value(*v),
                    Some(ScalarValue::Int32(v)) => builder.append_value(*v as i64),
                    None => builder.append_null(),
                    Some(other) => {
                        return Err(Error::UnsupportedValue(format!(
                            "{other:?} in an int64 column"
                        )))
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int32 => {
            let mut builder = Int32Builder::new();
            for cell in cells {
                match cell {
                    Some(ScalarValue::Int32(v)) => builder.append_value(*v),
                    None => builder.append_null(),
                    Some(other) => {
                        return Err(Error::UnsupportedValue(format!(
                            "{other:?} in an int32 column"
                        )))
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => {
            if cells.iter().all(Option::is_none) {
                Ok(new_null_array(other, cells.len()))
            } else {
                Err(Error::UnsupportedValue(format!(
                    "no value representation for {other} columns"
                )))
            }
        }
    }
}

impl MemStatement {
    fn resolve(&self, expr: &ValueExpr) -> Result<Option<ScalarValue>> {
        match expr {
            ValueExpr::Literal(v) => Ok(v.clone()),
            ValueExpr::Parameter(index) => self.binds[*index].clone().map(Some).ok_or_else(|| {
                Error::InvalidArgument(format!("parameter {} is not bound", index + 1))
            }),
        }
    }
}

impl Statement for MemStatement {
    fn result_schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn parameter_count(&self) -> usize {
        self.binds.len()
    }

    fn parameter_name(&self, _index: usize) -> Option<String> {
        None
    }

    fn bind(&mut self, index: usize, value: ScalarValue) -> Result<()> {
        if index >= self.binds.len() {
            return Err(Error::InvalidArgument(format!(
                "parameter index {} out of range, statement has {}",
                index + 1,
                self.binds.len()
            )));
        }
        self.binds[index] = Some(value);
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Vec<RecordBatch>> {
        match &self.plan {
            Plan::SelectItems(items) => {
                let mut columns = Vec::with_capacity(items.len());
                for (item, field) in items.iter().zip(self.schema.fields()) {
                    let cell = coerce(self.resolve(&item.expr)?, field.data_type())?;
                    columns.push(build_column(field.data_type(), &[cell])?);
                }
                Ok(vec![RecordBatch::try_new(self.schema.clone(), columns)?])
            }
            Plan::SelectAll(table) => {
                let tables = self.tables.read().unwrap();
                let table = tables
                    .iter()
                    .find(|t| t.name == *table)
                    .ok_or_else(|| Error::NotFound(format!("table {table}")))?;
                let mut columns = Vec::with_capacity(table.columns.len());
                for (index, field) in self.schema.fields().iter().enumerate() {
                    let cells: Vec<Option<ScalarValue>> =
                        table.rows.iter().map(|row| row[index].clone()).collect();
                    columns.push(build_column(field.data_type(), &cells)?);
                }
                Ok(vec![RecordBatch::try_new_with_options(
                    self.schema.clone(),
                    columns,
                    &arrow_array::RecordBatchOptions::new().with_row_count(Some(table.rows.len())),
                )?])
            }
            Plan::Insert { .. } | Plan::DeleteAll(_) => Err(Error::InvalidQuery(
                "statement does not produce a result set".into(),
            )),
        }
    }

    fn execute_update(&mut self) -> Result<i64> {
        match &self.plan {
            Plan::Insert { table, values } => {
                let resolved: Vec<Option<ScalarValue>> = values
                    .iter()
                    .map(|e| self.resolve(e))
                    .collect::<Result<_>>()?;
                let mut tables = self.tables.write().unwrap();
                let table = tables
                    .iter_mut()
                    .find(|t| t.name == *table)
                    .ok_or_else(|| Error::NotFound(format!("table {table}")))?;
                let schema = table.arrow_schema();
                let mut row = Vec::with_capacity(resolved.len());
                for (cell, field) in resolved.into_iter().zip(schema.fields()) {
                    row.push(coerce(cell, field.data_type())?);
                }
                table.rows.push(row);
                Ok(1)
            }
            Plan::DeleteAll(table) => {
                let mut tables = self.tables.write().unwrap();
                let table = tables
                    .iter_mut()
                    .find(|t| t.name == *table)
                    .ok_or_else(|| Error::NotFound(format!("table {table}")))?;
                let removed = table.rows.len() as i64;
                table.rows.clear();
                Ok(removed)
            }
            Plan::SelectItems(_) | Plan::SelectAll(_) => {
                Err(Error::InvalidQuery("statement does not modify data".into()))
            }
        }
    }
}

impl SqlEngine for MemEngine {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let plan = parse(sql)?;
        let tables = self.tables.read().unwrap();

        let schema: SchemaRef = match &plan {
            Plan::SelectItems(items) => Arc::new(Schema::new(
                items
                    .iter()
                    .map(|item| Field::new(&item.label, expr_type(&item.expr), true))
                    .collect::<Vec<_>>(),
            )),
            Plan::SelectAll(name) => tables
                .iter()
                .find(|t| t.name == *name)
                .ok_or_else(|| Error::InvalidQuery(format!("no such table: {name}")))?
                .arrow_schema(),
            Plan::Insert { table, values } => {
                let table = tables
                    .iter()
                    .find(|t| t.name == *table)
                    .ok_or_else(|| Error::InvalidQuery(format!("no such table: {table}")))?;
                if values.len() != table.columns.len() {
                    return Err(Error::InvalidQuery(format!(
                        "{} values for {} columns of {}",
                        values.len(),
                        table.columns.len(),
                        table.name
                    )));
                }
                Arc::new(Schema::empty())
            }
            Plan::DeleteAll(name) => {
                if !tables.iter().any(|t| t.name == *name) {
                    return Err(Error::InvalidQuery(format!("no such table: {name}")));
                }
                Arc::new(Schema::empty())
            }
        };

        let binds = vec![None; parameter_count(&plan)];
        Ok(Box::new(MemStatement {
            tables: self.tables.clone(),
            plan,
            schema,
            binds,
        }))
    }

    fn catalogs(&self) -> Vec<String> {
        let tables = self.tables.read().unwrap();
        let set: BTreeSet<String> = tables.iter().filter_map(|t| t.catalog.clone()).collect();
        set.into_iter().collect()
    }

    fn db_schemas(&self, catalog: Option<&str>, pattern: Option<&str>) -> Vec<SchemaEntry> {
        let tables = self.tables.read().unwrap();
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for table in tables.iter() {
            if !matches_exact(catalog, table.catalog.as_deref())
                || !matches_pattern(pattern, table.db_schema.as_deref())
            {
                continue;
            }
            let key = (table.catalog.clone(), table.db_schema.clone());
            if seen.insert(key.clone()) {
                entries.push(SchemaEntry {
                    catalog: key.0,
                    db_schema: key.1,
                });
            }
        }
        entries.sort_by(|a, b| {
            (&a.catalog, &a.db_schema).cmp(&(&b.catalog, &b.db_schema))
        });
        entries
    }

    fn tables(
        &self,
        catalog: Option<&str>,
        db_schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        table_types: &[String],
    ) -> Vec<TableEntry> {
        let tables = self.tables.read().unwrap();
        let mut entries: Vec<TableEntry> = tables
            .iter()
            .filter(|t| {
                matches_exact(catalog, t.catalog.as_deref())
                    && matches_pattern(db_schema_pattern, t.db_schema.as_deref())
                    && matches_pattern(table_name_pattern, Some(&t.name))
                    && (table_types.is_empty() || table_types.contains(&t.table_type))
            })
            .map(|t| TableEntry {
                catalog: t.catalog.clone(),
                db_schema: t.db_schema.clone(),
                name: t.name.clone(),
                table_type: t.table_type.clone(),
                schema: t.arrow_schema(),
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.catalog, &a.db_schema, &a.name).cmp(&(&b.catalog, &b.db_schema, &b.name))
        });
        entries
    }

    fn table_types(&self) -> Vec<String> {
        let tables = self.tables.read().unwrap();
        let set: BTreeSet<String> = tables.iter().map(|t| t.table_type.clone()).collect();
        set.into_iter().collect()
    }

    fn primary_keys(&self, table: &TableRef) -> Vec<PrimaryKeyEntry> {
        let tables = self.tables.read().unwrap();
        let mut keys: Vec<PrimaryKeyEntry> = tables
            .iter()
            .filter(|t| {
                t.name == table.table
                    && matches_exact(table.catalog.as_deref(), t.catalog.as_deref())
                    && matches_exact(table.db_schema.as_deref(), t.db_schema.as_deref())
            })
            .flat_map(|t| t.primary_keys.iter().cloned())
            .collect();
        keys.sort_by_key(|k| k.key_sequence);
        keys
    }

    fn foreign_keys(&self, pk_table: &TableRef, fk_table: &TableRef) -> Vec<ForeignKeyEntry> {
        let tables = self.tables.read().unwrap();
        let mut keys: Vec<ForeignKeyEntry> = tables
            .iter()
            .flat_map(|t| t.foreign_keys.iter())
            .filter(|k| {
                k.pk_table == pk_table.table
                    && matches_exact(pk_table.catalog.as_deref(), k.pk_catalog.as_deref())
                    && matches_exact(pk_table.db_schema.as_deref(), k.pk_db_schema.as_deref())
                    && k.fk_table == fk_table.table
                    && matches_exact(fk_table.catalog.as_deref(), k.fk_catalog.as_deref())
                    && matches_exact(fk_table.db_schema.as_deref(), k.fk_db_schema.as_deref())
            })
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.key_sequence);
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Array, Int64Array, StringArray};

    #[test]
    fn test_select_literals() {
        let engine = MemEngine::new();
        let mut stmt = engine.prepare("SELECT 1, 'two', true").unwrap();
        assert_eq!(stmt.parameter_count(), 0);
        let schema = stmt.result_schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Boolean);

        let batches = stmt.execute_query().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 1);
        let ints = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ints.value(0), 1);
    }

    #[test]
    fn test_select_parameter_requires_bind() {
        let engine = MemEngine::new();
        let mut stmt = engine.prepare("SELECT ?").unwrap();
        assert_eq!(stmt.parameter_count(), 1);
        assert!(matches!(
            stmt.execute_query(),
            Err(Error::InvalidArgument(_))
        ));

        stmt.bind(0, ScalarValue::Utf8("bound".into())).unwrap();
        let batches = stmt.execute_query().unwrap();
        let values = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(values.value(0), "bound");
    }

    #[test]
    fn test_bind_out_of_range() {
        let engine = MemEngine::new();
        let mut stmt = engine.prepare("SELECT ?").unwrap();
        assert!(matches!(
            stmt.bind(1, ScalarValue::Int64(9)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_select_all_from_table() {
        let engine = MemEngine::with_demo_data();
        let mut stmt = engine.prepare("SELECT * FROM int_table").unwrap();
        let batches = stmt.execute_query().unwrap();
        assert_eq!(batches[0].num_rows(), 3);
        assert_eq!(batches[0].num_columns(), 4);
        let names = batches[0]
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "one");
        assert!(names.is_null(2));
    }

    #[test]
    fn test_insert_and_delete_counts() {
        let engine = MemEngine::with_demo_data();
        let mut insert = engine
            .prepare("INSERT INTO foreign_table VALUES (3, 'keyThree', 7)")
            .unwrap();
        assert_eq!(insert.execute_update().unwrap(), 1);

        let mut delete = engine.prepare("DELETE FROM foreign_table").unwrap();
        assert_eq!(delete.execute_update().unwrap(), 3);
        assert_eq!(delete.execute_update().unwrap(), 0);
    }

    #[test]
    fn test_insert_with_parameters() {
        let engine = MemEngine::with_demo_data();
        let mut stmt = engine
            .prepare("INSERT INTO int_table VALUES (?, ?, ?, ?)")
            .unwrap();
        assert_eq!(stmt.parameter_count(), 4);
        stmt.bind(0, ScalarValue::Int64(4)).unwrap();
        stmt.bind(1, ScalarValue::Utf8("four".into())).unwrap();
        stmt.bind(2, ScalarValue::Int32(40)).unwrap();
        stmt.bind(3, ScalarValue::Int64(2)).unwrap();
        assert_eq!(stmt.execute_update().unwrap(), 1);

        let mut all = engine.prepare("SELECT * FROM int_table").unwrap();
        assert_eq!(all.execute_query().unwrap()[0].num_rows(), 4);
    }

    #[test]
    fn test_unsupported_statement_is_invalid_query() {
        let engine = MemEngine::with_demo_data();
        assert!(matches!(
            engine.prepare("UPDATE int_table SET value = 0"),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(
            engine.prepare("SELECT * FROM missing_table"),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(
            engine.prepare("INSERT INTO int_table VALUES (1)"),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_query_update_mismatch() {
        let engine = MemEngine::with_demo_data();
        let mut query = engine.prepare("SELECT 1").unwrap();
        assert!(matches!(
            query.execute_update(),
            Err(Error::InvalidQuery(_))
        ));
        let mut update = engine.prepare("DELETE FROM int_table").unwrap();
        assert!(matches!(
            update.execute_query(),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_catalog_metadata() {
        let engine = MemEngine::with_demo_data();
        assert_eq!(engine.catalogs(), vec!["main".to_string()]);
        assert_eq!(engine.table_types(), vec!["table".to_string(), "view".to_string()]);

        let schemas = engine.db_schemas(Some("main"), None);
        assert_eq!(schemas.len(), 2);
        let public_only = engine.db_schemas(None, Some("PUB%"));
        assert_eq!(public_only.len(), 1);
        assert_eq!(public_only[0].db_schema.as_deref(), Some("PUBLIC"));
    }

    #[test]
    fn test_table_filters_narrow() {
        let engine = MemEngine::with_demo_data();
        assert_eq!(engine.tables(None, None, None, &[]).len(), 3);
        assert_eq!(engine.tables(None, Some("PUBLIC"), None, &[]).len(), 2);
        assert_eq!(engine.tables(None, None, Some("int%"), &[]).len(), 1);
        assert_eq!(
            engine.tables(None, None, None, &["view".to_string()]).len(),
            1
        );
        assert!(engine.tables(Some("other_catalog"), None, None, &[]).is_empty());
    }

    #[test]
    fn test_key_metadata() {
        let engine = MemEngine::with_demo_data();
        let pk = engine.primary_keys(&TableRef {
            catalog: None,
            db_schema: None,
            table: "foreign_table".into(),
        });
        assert_eq!(pk.len(), 1);
        assert_eq!(pk[0].column, "id");
        assert_eq!(pk[0].key_sequence, 1);

        let fks = engine.foreign_keys(
            &TableRef {
                catalog: None,
                db_schema: None,
                table: "foreign_table".into(),
            },
            &TableRef {
                catalog: None,
                db_schema: None,
                table: "int_table".into(),
            },
        );
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].fk_column, "foreign_id");
        assert_eq!(fks[0].update_rule, skylark_protocol::keys::RULE_NO_ACTION);
    }
}
