//! Closed-set variant values encoded as Arrow dense unions.
//!
//! The protocol uses one tagged-union device in two places: the `value`
//! column of `GetSqlInfo` results and the type of every prepared-statement
//! bind parameter. Each value carries an explicit discriminant selecting the
//! child slot that holds its payload. The discriminant order is wire
//! contract, shared with every other implementation of the protocol:
//!
//! | id | slot                    |
//! |----|-------------------------|
//! | 0  | string                  |
//! | 1  | bool                    |
//! | 2  | int64                   |
//! | 3  | int32 bitmask           |
//! | 4  | list<utf8>              |
//! | 5  | map<int32, list<int32>> |
//!
//! Parameters use the scalar subset (ids 0..=3); SQL info values use all six.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::builder::{
    BooleanBuilder, Int32Builder, Int64Builder, ListBuilder, MapBuilder, StringBuilder,
};
use arrow_array::cast::AsArray;
use arrow_array::types::{Int32Type, Int64Type};
use arrow_array::{Array, ArrayRef, UnionArray};
use arrow_buffer::ScalarBuffer;
use arrow_schema::{DataType, Field, Fields, UnionFields, UnionMode};

use crate::error::{Error, Result};

pub const STRING_VALUE_ID: i8 = 0;
pub const BOOL_VALUE_ID: i8 = 1;
pub const BIGINT_VALUE_ID: i8 = 2;
pub const INT32_BITMASK_ID: i8 = 3;
pub const STRING_LIST_ID: i8 = 4;
pub const INT32_TO_INT32_LIST_MAP_ID: i8 = 5;

fn string_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

fn int32_to_int32_list_map_type() -> DataType {
    let entries = Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![
            Field::new("keys", DataType::Int32, false),
            Field::new(
                "values",
                DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
                true,
            ),
        ])),
        false,
    );
    DataType::Map(Arc::new(entries), false)
}

fn scalar_slot_fields() -> Vec<Field> {
    vec![
        Field::new("string_value", DataType::Utf8, true),
        Field::new("bool_value", DataType::Boolean, true),
        Field::new("bigint_value", DataType::Int64, true),
        Field::new("int32_bitmask", DataType::Int32, true),
    ]
}

/// The 4-slot dense union typing every prepared-statement parameter field.
/// The query text alone cannot determine parameter types, so every parameter
/// accepts any supported scalar kind.
pub fn parameter_type() -> DataType {
    DataType::Union(
        UnionFields::new(
            [STRING_VALUE_ID, BOOL_VALUE_ID, BIGINT_VALUE_ID, INT32_BITMASK_ID],
            scalar_slot_fields(),
        ),
        UnionMode::Dense,
    )
}

fn sql_info_union_fields() -> UnionFields {
    let mut fields = scalar_slot_fields();
    fields.push(Field::new("string_list", string_list_type(), true));
    fields.push(Field::new(
        "int32_to_int32_list_map",
        int32_to_int32_list_map_type(),
        true,
    ));
    UnionFields::new(
        [
            STRING_VALUE_ID,
            BOOL_VALUE_ID,
            BIGINT_VALUE_ID,
            INT32_BITMASK_ID,
            STRING_LIST_ID,
            INT32_TO_INT32_LIST_MAP_ID,
        ],
        fields,
    )
}

/// The 6-slot dense union typing the `GetSqlInfo` value column.
pub fn sql_info_value_type() -> DataType {
    DataType::Union(sql_info_union_fields(), UnionMode::Dense)
}

/// A scalar from the supported bind-parameter set.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Utf8(String),
    Boolean(bool),
    Int64(i64),
    Int32(i32),
}

impl ScalarValue {
    /// Reads the scalar at `row` out of a column. Dense-union columns are
    /// unwrapped through their discriminant; bare columns of the supported
    /// scalar types are accepted directly. Anything else is an
    /// [`Error::UnsupportedValue`].
    pub fn try_from_array(array: &dyn Array, row: usize) -> Result<Self> {
        match array.data_type() {
            DataType::Union(_, UnionMode::Dense) => {
                let union = array.as_any().downcast_ref::<UnionArray>().ok_or_else(|| {
                    Error::UnsupportedValue("union column failed to downcast".into())
                })?;
                let type_id = union.type_id(row);
                let offset = union.value_offset(row);
                Self::try_from_array(union.child(type_id).as_ref(), offset)
            }
            DataType::Utf8 => Ok(ScalarValue::Utf8(
                array.as_string::<i32>().value(row).to_string(),
            )),
            DataType::Boolean => Ok(ScalarValue::Boolean(array.as_boolean().value(row))),
            DataType::Int64 => Ok(ScalarValue::Int64(
                array.as_primitive::<Int64Type>().value(row),
            )),
            DataType::Int32 => Ok(ScalarValue::Int32(
                array.as_primitive::<Int32Type>().value(row),
            )),
            other => Err(Error::UnsupportedValue(format!(
                "no scalar slot for {other}"
            ))),
        }
    }
}

/// A value of the `GetSqlInfo` union: the scalar set plus the two collection
/// slots.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlInfoValue {
    String(String),
    Bool(bool),
    Bigint(i64),
    Int32Bitmask(i32),
    StringList(Vec<String>),
    Int32ToInt32ListMap(BTreeMap<i32, Vec<i32>>),
}

impl From<&str> for SqlInfoValue {
    fn from(value: &str) -> Self {
        SqlInfoValue::String(value.to_string())
    }
}

impl From<bool> for SqlInfoValue {
    fn from(value: bool) -> Self {
        SqlInfoValue::Bool(value)
    }
}

impl From<i64> for SqlInfoValue {
    fn from(value: i64) -> Self {
        SqlInfoValue::Bigint(value)
    }
}

impl From<i32> for SqlInfoValue {
    fn from(value: i32) -> Self {
        SqlInfoValue::Int32Bitmask(value)
    }
}

impl From<Vec<String>> for SqlInfoValue {
    fn from(value: Vec<String>) -> Self {
        SqlInfoValue::StringList(value)
    }
}

/// Appends [`SqlInfoValue`]s into a dense [`UnionArray`], one child builder
/// per discriminant. The finished array's type matches
/// [`sql_info_value_type`] by construction.
pub struct SqlInfoUnionBuilder {
    type_ids: Vec<i8>,
    offsets: Vec<i32>,
    slot_lengths: [i32; 6],
    strings: StringBuilder,
    bools: BooleanBuilder,
    bigints: Int64Builder,
    bitmasks: Int32Builder,
    string_lists: ListBuilder<StringBuilder>,
    int32_maps: MapBuilder<Int32Builder, ListBuilder<Int32Builder>>,
}

impl Default for SqlInfoUnionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlInfoUnionBuilder {
    pub fn new() -> Self {
        Self {
            type_ids: Vec::new(),
            offsets: Vec::new(),
            slot_lengths: [0; 6],
            strings: StringBuilder::new(),
            bools: BooleanBuilder::new(),
            bigints: Int64Builder::new(),
            bitmasks: Int32Builder::new(),
            string_lists: ListBuilder::new(StringBuilder::new()),
            int32_maps: MapBuilder::new(None, Int32Builder::new(), ListBuilder::new(Int32Builder::new())),
        }
    }

    fn select(&mut self, type_id: i8) {
        let slot = type_id as usize;
        self.type_ids.push(type_id);
        self.offsets.push(self.slot_lengths[slot]);
        self.slot_lengths[slot] += 1;
    }

    pub fn append(&mut self, value: &SqlInfoValue) -> Result<()> {
        match value {
            SqlInfoValue::String(v) => {
                self.select(STRING_VALUE_ID);
                self.strings.append_value(v);
            }
            SqlInfoValue::Bool(v) => {
                self.select(BOOL_VALUE_ID);
                self.bools.append_value(*v);
            }
            SqlInfoValue::Bigint(v) => {
                self.select(BIGINT_VALUE_ID);
                self.bigints.append_value(*v);
            }
            SqlInfoValue::Int32Bitmask(v) => {
                self.select(INT32_BITMASK_ID);
                self.bitmasks.append_value(*v);
            }
            SqlInfoValue::StringList(items) => {
                self.select(STRING_LIST_ID);
                for item in items {
                    self.string_lists.values().append_value(item);
                }
                self.string_lists.append(true);
            }
            SqlInfoValue::Int32ToInt32ListMap(map) => {
                self.select(INT32_TO_INT32_LIST_MAP_ID);
                for (key, values) in map {
                    self.int32_maps.keys().append_value(*key);
                    for v in values {
                        self.int32_maps.values().values().append_value(*v);
                    }
                    self.int32_maps.values().append(true);
                }
                self.int32_maps.append(true)?;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<UnionArray> {
        let children: Vec<ArrayRef> = vec![
            Arc::new(self.strings.finish()),
            Arc::new(self.bools.finish()),
            Arc::new(self.bigints.finish()),
            Arc::new(self.bitmasks.finish()),
            Arc::new(self.string_lists.finish()),
            Arc::new(self.int32_maps.finish()),
        ];
        let array = UnionArray::try_new(
            sql_info_union_fields(),
            ScalarBuffer::from(self.type_ids),
            Some(ScalarBuffer::from(self.offsets)),
            children,
        )?;
        Ok(array)
    }
}

/// Appends [`ScalarValue`]s into a 4-slot dense union under
/// [`parameter_type`]. Servers only read parameter columns; this builder
/// exists for clients and tests producing bind batches.
pub struct ScalarUnionBuilder {
    type_ids: Vec<i8>,
    offsets: Vec<i32>,
    slot_lengths: [i32; 4],
    strings: StringBuilder,
    bools: BooleanBuilder,
    bigints: Int64Builder,
    bitmasks: Int32Builder,
}

impl Default for ScalarUnionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarUnionBuilder {
    pub fn new() -> Self {
        Self {
            type_ids: Vec::new(),
            offsets: Vec::new(),
            slot_lengths: [0; 4],
            strings: StringBuilder::new(),
            bools: BooleanBuilder::new(),
            bigints: Int64Builder::new(),
            bitmasks: Int32Builder::new(),
        }
    }

    pub fn append(&mut self, value: &ScalarValue) {
        let type_id = match value {
            ScalarValue::Utf8(v) => {
                self.strings.append_value(v);
                STRING_VALUE_ID
            }
            ScalarValue::Boolean(v) => {
                self.bools.append_value(*v);
                BOOL_VALUE_ID
            }
            ScalarValue::Int64(v) => {
                self.bigints.append_value(*v);
                BIGINT_VALUE_ID
            }
            ScalarValue::Int32(v) => {
                self.bitmasks.append_value(*v);
                INT32_BITMASK_ID
            }
        };
        let slot = type_id as usize;
        self.type_ids.push(type_id);
        self.offsets.push(self.slot_lengths[slot]);
        self.slot_lengths[slot] += 1;
    }

    pub fn finish(mut self) -> Result<UnionArray> {
        let children: Vec<ArrayRef> = vec![
            Arc::new(self.strings.finish()),
            Arc::new(self.bools.finish()),
            Arc::new(self.bigints.finish()),
            Arc::new(self.bitmasks.finish()),
        ];
        let array = UnionArray::try_new(
            UnionFields::new(
                [STRING_VALUE_ID, BOOL_VALUE_ID, BIGINT_VALUE_ID, INT32_BITMASK_ID],
                scalar_slot_fields(),
            ),
            ScalarBuffer::from(self.type_ids),
            Some(ScalarBuffer::from(self.offsets)),
            children,
        )?;
        Ok(array)
    }
}
