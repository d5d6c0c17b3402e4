use std::fmt;

use crate::data_type::DataType;
use crate::error::SchemaError;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Name of the relation the column comes from, if known
    pub qualifier: Option<String>,
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    /// An unqualified column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            data_type,
        }
    }

    /// `relation.column`, or just `column` when unqualified.
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{qualifier}.{}", self.name),
            None => self.name.clone(),
        }
    }

    fn matches(&self, reference: &ColumnRef) -> bool {
        self.name == reference.name
            && match &reference.qualifier {
                Some(q) => self.qualifier.as_deref() == Some(q.as_str()),
                None => true,
            }
    }
}

/// A (possibly qualified) reference to a column, as written in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Splits `table.column` at the last dot; a name without dot stays unqualified.
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once('.') {
            Some((qualifier, name)) => Self::qualified(qualifier, name),
            None => Self::new(reference),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{qualifier}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Ordered sequence of column definitions, immutable once constructed.
///
/// Qualified names (`relation.column`) are unique within a schema, except in
/// projections that list a column more than once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Builds a schema from column definitions.
    ///
    /// # Errors
    /// Returns [SchemaError::DuplicateColumn] if two columns share a qualified name.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, SchemaError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i]
                .iter()
                .any(|c| c.name == column.name && c.qualifier == column.qualifier)
            {
                return Err(SchemaError::DuplicateColumn(column.qualified_name()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnDef> {
        self.columns.get(idx)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Finds the position of the column a reference points to.
    ///
    /// An unqualified reference matches any column of that name; it must match exactly one.
    ///
    /// # Errors
    /// [SchemaError::UnknownColumn] if nothing matches, [SchemaError::AmbiguousColumn]
    /// if several columns match.
    pub fn resolve(&self, reference: &ColumnRef) -> Result<usize, SchemaError> {
        let mut matches = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.matches(reference))
            .map(|(idx, _)| idx);

        match (matches.next(), matches.next()) {
            (Some(idx), None) => Ok(idx),
            (Some(_), Some(_)) => Err(SchemaError::AmbiguousColumn(reference.to_string())),
            (None, _) => Err(SchemaError::UnknownColumn(reference.to_string())),
        }
    }

    /// Resolves every reference, in order.
    pub fn resolve_all(&self, references: &[ColumnRef]) -> Result<Vec<usize>, SchemaError> {
        references.iter().map(|r| self.resolve(r)).collect()
    }

    /// The same columns, all qualified with `qualifier`.
    pub fn qualified(&self, qualifier: &str) -> Result<Self, SchemaError> {
        Self::new(
            self.columns
                .iter()
                .map(|c| ColumnDef {
                    qualifier: Some(qualifier.to_string()),
                    ..c.clone()
                })
                .collect(),
        )
    }

    /// Concatenation of two schemas, as produced by a join.
    pub fn concat(&self, other: &Schema) -> Result<Self, SchemaError> {
        Self::new(self.columns.iter().chain(&other.columns).cloned().collect())
    }

    /// The columns at `indices`, in that order. An index may repeat; a
    /// repeated column is then ambiguous to [Schema::resolve].
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("name", DataType::Text),
        ])
        .unwrap()
        .qualified("users")
        .unwrap()
    }

    #[test]
    fn test_resolve_qualified_and_unqualified() {
        let schema = users();
        assert_eq!(schema.resolve(&"id".into()), Ok(0));
        assert_eq!(schema.resolve(&"users.name".into()), Ok(1));
        assert_eq!(
            schema.resolve(&"posts.id".into()),
            Err(SchemaError::UnknownColumn("posts.id".into()))
        );
        assert_eq!(
            schema.resolve(&"age".into()),
            Err(SchemaError::UnknownColumn("age".into()))
        );
    }

    #[test]
    fn test_concat_and_ambiguity() {
        let posts = Schema::new(vec![ColumnDef::new("id", DataType::Int)])
            .unwrap()
            .qualified("posts")
            .unwrap();
        let joined = users().concat(&posts).unwrap();

        assert_eq!(joined.len(), 3);
        assert_eq!(joined.resolve(&"posts.id".into()), Ok(2));
        assert_eq!(
            joined.resolve(&"id".into()),
            Err(SchemaError::AmbiguousColumn("id".into()))
        );
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        assert_eq!(
            users().concat(&users()),
            Err(SchemaError::DuplicateColumn("users.id".into()))
        );
    }

    #[test]
    fn test_select_repeated_column() {
        let selected = users().select(&[1, 0, 1]);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected.columns()[2].qualified_name(), "users.name");
        assert_eq!(
            selected.resolve(&"name".into()),
            Err(SchemaError::AmbiguousColumn("name".into()))
        );
        assert_eq!(selected.resolve(&"id".into()), Ok(1));
    }

    #[test]
    fn test_column_ref_parse() {
        assert_eq!(ColumnRef::parse("a.b"), ColumnRef::qualified("a", "b"));
        assert_eq!(ColumnRef::parse("b"), ColumnRef::new("b"));
        assert_eq!(ColumnRef::qualified("a", "b").to_string(), "a.b");
    }
}
