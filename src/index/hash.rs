use std::collections::HashMap;

use allocative::Allocative;

use super::KeyInfo;
use crate::error::SchemaError;
use crate::relation::Relation;
use crate::schema::ColumnRef;
use crate::value::Value;

/// Hash index: key tuple -> positions of the rows holding it.
///
/// Positions within a bucket are ascending, since rows are inserted in order.
#[derive(Debug, Clone, Allocative)]
pub struct HashIndex {
    pub(super) info: KeyInfo,
    buckets: HashMap<Vec<Value>, Vec<usize>>,
    entry_count: usize,
}

impl HashIndex {
    pub fn build(relation: &Relation, columns: &[ColumnRef]) -> Result<Self, SchemaError> {
        let info = KeyInfo::new(relation, columns)?;
        let entries = info.entries(relation);
        let entry_count = entries.len();

        let mut buckets: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (key, row) in entries {
            buckets.entry(key).or_default().push(row);
        }
        log::trace!(
            "hash index on {}: {} buckets",
            relation.name(),
            buckets.len()
        );

        Ok(Self {
            info,
            buckets,
            entry_count,
        })
    }

    /// Positions for `key`, without type checks.
    pub(crate) fn get(&self, key: &[Value]) -> &[usize] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn distinct_keys(&self) -> usize {
        self.buckets.len()
    }
}
