use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{self, AtomicU64};

use crate::column::Column;
use crate::error::{Result, SchemaError};
use crate::predicate::Predicate;
use crate::schema::{ColumnRef, Schema};
use crate::value::Value;

/// One record of a relation, positionally aligned with its schema.
pub type Row = Vec<Value>;

static NEXT_RELATION_ID: AtomicU64 = AtomicU64::new(0);

/// An immutable table: a schema plus an ordered sequence of rows, stored by column.
///
/// Relations are only filled through a [RelationBuilder]; every transformation
/// (projection, filtering, joining, sorting) returns a new relation, so a
/// relation can be read from several threads without locking.
#[derive(Debug, Clone)]
pub struct Relation {
    /// Identifies the row storage: shared by clones and renamed copies only.
    id: u64,
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Relation {
    /// An empty relation with the given schema.
    pub fn empty(name: impl Into<String>, schema: Schema) -> Self {
        RelationBuilder::new(name, schema).build()
    }

    /// Builds a relation from rows, validating arity and types of every row.
    ///
    /// # Example
    /// ```
    /// use reldb::{ColumnDef, DataType, Relation, Schema, Value};
    ///
    /// let schema = Schema::new(vec![
    ///     ColumnDef::new("id", DataType::Int),
    ///     ColumnDef::new("name", DataType::Text),
    /// ])
    /// .unwrap();
    /// let users = Relation::from_rows(
    ///     "users",
    ///     schema,
    ///     vec![vec![Value::Int(1), Value::from("Alice")], vec![Value::Int(2), Value::Null]],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(users.row_count(), 2);
    /// assert_eq!(users.schema().columns()[0].qualified_name(), "users.id");
    /// ```
    pub fn from_rows(
        name: impl Into<String>,
        schema: Schema,
        rows: impl IntoIterator<Item = Row>,
    ) -> Result<Self, SchemaError> {
        let mut builder = RelationBuilder::new(name, schema);
        for row in rows {
            builder.push_row(row)?;
        }
        Ok(builder.build())
    }

    /// Assembles a relation from columns of equal length. The schema must
    /// already be qualified the way the caller wants it.
    pub(crate) fn from_columns(name: String, schema: Schema, columns: Vec<Column>) -> Self {
        let row_count = columns.first().map_or(0, Column::len);
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        debug_assert_eq!(columns.len(), schema.len());
        Self {
            id: NEXT_RELATION_ID.fetch_add(1, atomic::Ordering::Relaxed),
            name,
            schema,
            columns,
            row_count,
        }
    }

    /// Identity of the rows this relation holds. Indexes are only valid for
    /// relations with the id they were built over.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The value at (`row_idx`, `col_idx`), `None` if out of bounds.
    pub fn value(&self, row_idx: usize, col_idx: usize) -> Option<Value> {
        self.columns.get(col_idx)?.get(row_idx)
    }

    pub fn row(&self, row_idx: usize) -> Option<Row> {
        if self.row_count <= row_idx {
            return None;
        }
        self.columns.iter().map(|col| col.get(row_idx)).collect()
    }

    /// All rows, in order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count).filter_map(|idx| self.row(idx))
    }

    /// The values of `columns` at `row_idx`, or `None` if any of them is `NULL`.
    /// `NULL` keys never take part in lookups or joins.
    pub(crate) fn key(&self, row_idx: usize, columns: &[usize]) -> Option<Vec<Value>> {
        columns
            .iter()
            .map(|&c| {
                let column = &self.columns[c];
                if column.is_null(row_idx) {
                    None
                } else {
                    column.get(row_idx)
                }
            })
            .collect()
    }

    /// The same rows, with every column qualified by `alias`.
    pub fn renamed(&self, alias: &str) -> Result<Relation, SchemaError> {
        Ok(Self {
            id: self.id,
            name: alias.to_string(),
            schema: self.schema.qualified(alias)?,
            columns: self.columns.clone(),
            row_count: self.row_count,
        })
    }

    /// Restricts the relation to `columns` (in that order), preserving row order.
    /// A column may be listed more than once.
    ///
    /// # Errors
    /// [SchemaError::UnknownColumn] / [SchemaError::AmbiguousColumn] for unresolvable
    /// references.
    pub fn project(&self, columns: &[ColumnRef]) -> Result<Relation, SchemaError> {
        let indices = self.schema.resolve_all(columns)?;
        Ok(Self::from_columns(
            self.name.clone(),
            self.schema.select(&indices),
            indices.iter().map(|&i| self.columns[i].clone()).collect(),
        ))
    }

    /// Keeps the rows for which `predicate` is true. Rows where it is false
    /// or unknown (a `NULL` took part in a comparison) are dropped.
    ///
    /// # Errors
    /// Schema errors from binding the predicate, type errors from evaluating it.
    /// No partial relation is returned on failure.
    pub fn filter(&self, predicate: &Predicate) -> Result<Relation> {
        let bound = predicate.bind(&self.schema)?;
        let mut positions = Vec::new();
        for (idx, row) in self.rows().enumerate() {
            if bound.eval(&row)?.is_true() {
                positions.push(idx);
            }
        }
        log::trace!(
            "filter on {}: kept {} of {} rows",
            self.name,
            positions.len(),
            self.row_count
        );
        Ok(self.gather(&positions))
    }

    /// A relation holding the rows at `positions`, in that order.
    ///
    /// # Panics
    /// Panics if a position is out of bounds.
    pub fn gather(&self, positions: &[usize]) -> Relation {
        Self::from_columns(
            self.name.clone(),
            self.schema.clone(),
            self.columns.iter().map(|c| c.gather(positions)).collect(),
        )
    }

    /// Sorts rows by the given columns; `true` marks a descending key.
    ///
    /// The sort is stable and uses the structural value order (`NULL` first).
    pub fn sorted_by(&self, keys: &[(ColumnRef, bool)]) -> Result<Relation, SchemaError> {
        let sort = keys
            .iter()
            .map(|(column, descending)| Ok((self.schema.resolve(column)?, *descending)))
            .collect::<Result<Vec<(usize, bool)>, SchemaError>>()?;
        let key_columns: Vec<usize> = sort.iter().map(|(idx, _)| *idx).collect();
        let sort_keys: Vec<Row> = (0..self.row_count)
            .map(|row| {
                key_columns
                    .iter()
                    .map(|&col| self.columns[col].get(row).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let mut positions: Vec<usize> = (0..self.row_count).collect();
        positions.sort_by(|&a, &b| {
            sort.iter()
                .enumerate()
                .map(|(k, (_, descending))| {
                    let ord = sort_keys[a][k].cmp(&sort_keys[b][k]);
                    if *descending { ord.reverse() } else { ord }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(self.gather(&positions))
    }

    /// Removes duplicate rows, keeping the first occurrence of each.
    pub fn distinct(&self) -> Relation {
        let mut seen = HashSet::with_capacity(self.row_count);
        let positions: Vec<usize> = self
            .rows()
            .enumerate()
            .filter_map(|(idx, row)| seen.insert(row).then_some(idx))
            .collect();
        self.gather(&positions)
    }
}

/// Two relations are equal when they have the same schema and the same rows in the same order.
impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.row_count == other.row_count
            && self.rows().eq(other.rows())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self
            .schema
            .columns()
            .iter()
            .map(|c| c.qualified_name())
            .collect();
        let body: Vec<Vec<String>> = self
            .rows()
            .map(|row| row.iter().map(Value::to_string).collect())
            .collect();
        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| body.iter().map(|r| r[i].len()).fold(h.len(), usize::max))
            .collect();

        let write_line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (cell, &width) in cells.iter().zip(&widths) {
                write!(f, "{cell:<width$} ")?;
            }
            writeln!(f)
        };
        write_line(f, &header)?;
        writeln!(f, "{}", "-".repeat(widths.iter().map(|w| w + 1).sum()))?;
        for row in &body {
            write_line(f, row)?;
        }
        Ok(())
    }
}

/// Accumulates rows for a new [Relation].
///
/// The schema is qualified with the relation name unless its columns already
/// carry a qualifier.
pub struct RelationBuilder {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
}

impl RelationBuilder {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        let schema = if schema.columns().iter().all(|c| c.qualifier.is_none()) {
            // names were unique unqualified, so they stay unique qualified
            schema.qualified(&name).unwrap_or(schema)
        } else {
            schema
        };
        let columns = schema
            .columns()
            .iter()
            .map(|column| Column::new(column.name.clone(), column.data_type))
            .collect();
        Self {
            name,
            schema,
            columns,
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    /// [SchemaError::ArityMismatch] or [SchemaError::ColumnType]; the builder is
    /// unchanged on error.
    pub fn push_row(&mut self, row: Row) -> Result<(), SchemaError> {
        if row.len() != self.columns.len() {
            return Err(SchemaError::ArityMismatch {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        for (value, column) in row.iter().zip(&self.columns) {
            if let Some(found) = value.data_type().filter(|t| *t != column.data_type) {
                return Err(SchemaError::ColumnType {
                    column: column.name.clone(),
                    expected: column.data_type,
                    found,
                });
            }
        }
        for (value, column) in row.into_iter().zip(&mut self.columns) {
            column.push(value)?;
        }
        Ok(())
    }

    pub fn build(self) -> Relation {
        Relation::from_columns(self.name, self.schema, self.columns)
    }
}
