use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::index::{Index, IndexKind};
use crate::relation::Relation;
use crate::schema::ColumnRef;

/// Named relations plus the indexes built over them.
///
/// The catalog is an explicit context handed to the
/// [`Interpreter`][crate::interpreter::Interpreter]; several catalogs can
/// coexist. Relations are shared immutably, so a catalog can be read from
/// several threads once it is populated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    relations: HashMap<String, Arc<Relation>>,
    indexes: HashMap<String, Vec<Arc<Index>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `relation` under its own name. A relation registered under
    /// the same name before is replaced, and its indexes are dropped.
    pub fn register(&mut self, relation: Relation) -> Arc<Relation> {
        let name = relation.name().to_string();
        let relation = Arc::new(relation);
        if self
            .relations
            .insert(name.clone(), Arc::clone(&relation))
            .is_some()
        {
            log::debug!("replaced relation {name}, dropping its indexes");
        }
        self.indexes.remove(&name);
        relation
    }

    /// Removes a relation and its indexes.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Relation>> {
        self.indexes.remove(name);
        self.relations.remove(name)
    }

    /// # Errors
    /// [SchemaError::UnknownTable] if no relation has this name.
    pub fn get(&self, name: &str) -> Result<Arc<Relation>, SchemaError> {
        self.relations
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Names of all relations, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Builds an index over `columns` of the relation `table` and keeps it.
    pub fn create_index(
        &mut self,
        table: &str,
        columns: &[ColumnRef],
        kind: IndexKind,
    ) -> Result<Arc<Index>, SchemaError> {
        let relation = self.get(table)?;
        let index = Arc::new(Index::build(&relation, columns, kind)?);
        self.indexes
            .entry(table.to_string())
            .or_default()
            .push(Arc::clone(&index));
        Ok(index)
    }

    /// Replaces `table` by a copy sorted on `columns` and indexes the copy.
    /// Indexes built on the unsorted relation are dropped.
    pub fn cluster(
        &mut self,
        table: &str,
        columns: &[ColumnRef],
        kind: IndexKind,
    ) -> Result<Arc<Index>, SchemaError> {
        let relation = self.get(table)?;
        let (sorted, index) = Index::build_clustered(&relation, columns, kind)?;
        self.register(sorted);
        let index = Arc::new(index);
        self.indexes
            .insert(table.to_string(), vec![Arc::clone(&index)]);
        Ok(index)
    }

    /// All indexes over `table`, in creation order.
    pub fn indexes(&self, table: &str) -> &[Arc<Index>] {
        self.indexes.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first index over exactly `columns` of `table`, optionally of a given kind.
    pub fn find_index(&self, table: &str, columns: &[usize], kind: Option<IndexKind>) -> Option<&Index> {
        self.indexes(table)
            .iter()
            .map(|index| &**index)
            .find(|index| {
                index.key_columns() == columns && kind.is_none_or(|kind| index.kind() == kind)
            })
    }
}
