use std::sync::Arc;

use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::SchemaError;
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous memory
/// allocation (columnar storage).
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Vector of 64-bit integers.
    Int(Vec<i64>),
    /// Vector of 64-bit floats.
    Float(Vec<f64>),
    /// Vector of thread-safe atomic reference-counted strings.
    Text(Vec<Arc<str>>),
    /// Compact bit-vector for boolean values.
    Bool(BitVec),
}

/// The values of one attribute of a relation.
/// It combines metadata (name, type) with actual data and a nullability tracker.
///
/// A column is append-only while its relation is being built and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The logical data type of the column.
    pub data_type: DataType,
    /// The actual values stored in the column.
    data: ColumnData,
    /// A bitmap where a `true` bit indicates that the value at that index is `NULL`.
    null_bitmap: BitVec,
}

impl Column {
    /// Creates a new, empty column with the specified name and data type.
    /// The underlying data storage is initialized according to the data type.
    pub fn new(name: String, data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Int => ColumnData::Int(vec![]),
            DataType::Float => ColumnData::Float(vec![]),
            DataType::Bool => ColumnData::Bool(bitvec!()),
            DataType::Text => ColumnData::Text(vec![]),
        };
        Self {
            name,
            data_type,
            data,
            null_bitmap: bitvec!(),
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns [SchemaError::ColumnType] if the value's type does not match the column's data type.
    ///
    /// # Behavior
    /// - If the value is `Null`, a default "dummy" value is pushed to the data vector
    ///   to maintain index alignment with the `null_bitmap`.
    /// - If the value is not `Null`, it is added to the data vector and the bitmap is updated.
    ///
    /// # Example
    /// ```
    /// # use reldb::column::Column;
    /// # use reldb::data_type::DataType;
    /// # use reldb::value::Value;
    /// let mut col = Column::new("age".into(), DataType::Int);
    /// col.push(Value::Int(30)).unwrap();
    /// col.push(Value::Null).unwrap();
    ///
    /// assert_eq!(col.len(), 2);
    /// assert!(col.get(1).unwrap().is_null());
    /// ```
    pub fn push(&mut self, value: Value) -> Result<(), SchemaError> {
        let is_null = value.is_null();
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Null) => col.push(0),
            (ColumnData::Float(col), Value::Null) => col.push(0.0),
            (ColumnData::Text(col), Value::Null) => col.push(Arc::from("")),
            (ColumnData::Bool(col), Value::Null) => col.push(false),
            (ColumnData::Int(col), Value::Int(v)) => col.push(v),
            (ColumnData::Float(col), Value::Float(v)) => col.push(v),
            (ColumnData::Text(col), Value::Text(v)) => col.push(v),
            (ColumnData::Bool(col), Value::Bool(v)) => col.push(v),
            (_, value) => {
                return Err(SchemaError::ColumnType {
                    column: self.name.clone(),
                    expected: self.data_type,
                    // only NULL has no type, and NULL matches every arm above
                    found: value.data_type().unwrap_or(self.data_type),
                });
            }
        }
        // Add the bit only after the data vector accepted the value, so a rejected
        // value leaves the column untouched
        self.null_bitmap.push(is_null);
        Ok(())
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        self.null_bitmap.len()
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `Some(Value)` if the index is valid, or `None` if it is out of bounds.
    /// If the `null_bitmap` indicates a null at the index, `Some(Value::Null)` is returned.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        if row_idx >= self.len() {
            return None;
        }
        if self.null_bitmap[row_idx] {
            return Some(Value::Null);
        }
        match &self.data {
            ColumnData::Int(col) => Some(Value::Int(col[row_idx])),
            ColumnData::Text(col) => Some(Value::Text(col[row_idx].clone())),
            ColumnData::Float(col) => Some(Value::Float(col[row_idx])),
            ColumnData::Bool(col) => Some(Value::Bool(col[row_idx])),
        }
    }

    /// Returns `true` if the value at `row_idx` is `NULL` (or out of bounds).
    pub fn is_null(&self, row_idx: usize) -> bool {
        self.null_bitmap.get(row_idx).is_none_or(|bit| *bit)
    }

    /// Number of `NULL` entries in the column.
    pub fn null_count(&self) -> usize {
        self.null_bitmap.count_ones()
    }

    /// Builds a new column holding the values at `positions`, in that order.
    /// Positions may repeat.
    ///
    /// # Panics
    /// Panics if a position is out of bounds.
    pub fn gather(&self, positions: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Int(col) => ColumnData::Int(positions.iter().map(|&p| col[p]).collect()),
            ColumnData::Float(col) => {
                ColumnData::Float(positions.iter().map(|&p| col[p]).collect())
            }
            ColumnData::Text(col) => {
                ColumnData::Text(positions.iter().map(|&p| Arc::clone(&col[p])).collect())
            }
            ColumnData::Bool(col) => ColumnData::Bool(positions.iter().map(|&p| col[p]).collect()),
        };
        Self {
            name: self.name.clone(),
            data_type: self.data_type,
            data,
            null_bitmap: positions.iter().map(|&p| self.null_bitmap[p]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::value::Value;

    // ─────────────────────────────────────────────────────────────
    // Test 1 : Creation
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_column_new() {
        let col = Column::new("age".into(), DataType::Int);

        assert_eq!(col.name, "age");
        assert_eq!(col.data_type, DataType::Int);
        assert_eq!(col.len(), 0);
        assert!(col.is_empty());
    }

    // ─────────────────────────────────────────────────────────────
    // Test 2 : NULL
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_null_handling() {
        let mut col = Column::new("nullable".into(), DataType::Int);

        col.push(Value::Int(10)).unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Int(20)).unwrap();

        assert_eq!(col.len(), 3);
        assert_eq!(col.get(0), Some(Value::Int(10)));
        assert_eq!(col.get(1), Some(Value::Null));
        assert_eq!(col.get(2), Some(Value::Int(20)));

        assert!(!col.is_null(0));
        assert!(col.is_null(1));
        assert_eq!(col.null_count(), 1);
    }

    // ─────────────────────────────────────────────────────────────
    // Test 3 : Type mismatch
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_type_mismatch() {
        let mut col = Column::new("int_col".into(), DataType::Int);

        let result = col.push(Value::Text("hello".into()));

        assert_eq!(
            result,
            Err(SchemaError::ColumnType {
                column: "int_col".into(),
                expected: DataType::Int,
                found: DataType::Text,
            })
        );
        assert_eq!(col.len(), 0);
    }

    // ─────────────────────────────────────────────────────────────
    // Test 4 : Out of bounds
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_out_of_bounds() {
        let col = Column::new("test".into(), DataType::Int);

        assert_eq!(col.get(0), None);
        assert_eq!(col.get(100), None);
        assert!(col.is_null(0));
    }

    // ─────────────────────────────────────────────────────────────
    // Test 5 : every type round-trips through its storage
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_all_types() {
        let cases = [
            (DataType::Float, Value::Float(2.5)),
            (DataType::Text, Value::Text("x".into())),
            (DataType::Bool, Value::Bool(true)),
        ];
        for (data_type, value) in cases {
            let mut col = Column::new("c".into(), data_type);
            col.push(Value::Null).unwrap();
            col.push(value.clone()).unwrap();
            assert_eq!(col.get(0), Some(Value::Null));
            assert_eq!(col.get(1), Some(value));
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Test 6 : gather keeps nulls aligned
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_gather() {
        let mut col = Column::new("flag".into(), DataType::Bool);
        col.push(Value::Bool(true)).unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Bool(false)).unwrap();

        let gathered = col.gather(&[2, 1, 0, 0]);
        assert_eq!(gathered.len(), 4);
        assert_eq!(gathered.get(0), Some(Value::Bool(false)));
        assert_eq!(gathered.get(1), Some(Value::Null));
        assert_eq!(gathered.get(3), Some(Value::Bool(true)));
        assert_eq!(col.gather(&[]).len(), 0);
    }

    // ─────────────────────────────────────────────────────────────
    // Test 7: Large Column
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_large_column() {
        let mut col = Column::new("big".into(), DataType::Int);

        for i in 0..10_000 {
            col.push(Value::Int(i)).unwrap();
        }

        assert_eq!(col.len(), 10_000);
        assert_eq!(col.get(5_000), Some(Value::Int(5_000)));
        assert_eq!(col.get(9_999), Some(Value::Int(9_999)));
    }
}
