use std::borrow::Cow;

use super::{EquiKeys, JoinContext};
use crate::error::Result;
use crate::index::{Index, IndexKind};
use crate::schema::ColumnRef;

/// Probes a hash index on the right relation once per left row.
///
/// A prebuilt hash index is reused when it covers the right key columns;
/// otherwise one is built for this join only.
pub(super) fn hash_join(ctx: &JoinContext<'_>, keys: &EquiKeys) -> Result<Vec<(usize, usize)>> {
    let index = match ctx.right_index {
        Some(index) if index.kind() == IndexKind::Hash && index.covers(ctx.right, &keys.right) => {
            log::trace!("hash join: reusing index on {}", ctx.right.name());
            Cow::Borrowed(index)
        }
        _ => {
            let columns: Vec<ColumnRef> = keys
                .right
                .iter()
                .map(|&i| {
                    let column = &ctx.right.schema().columns()[i];
                    ColumnRef {
                        qualifier: column.qualifier.clone(),
                        name: column.name.clone(),
                    }
                })
                .collect();
            Cow::Owned(Index::build(ctx.right, &columns, IndexKind::Hash)?)
        }
    };

    let mut pairs = Vec::new();
    for l in 0..ctx.left.row_count() {
        let Some(key) = ctx.left.key(l, &keys.left) else {
            continue;
        };
        pairs.extend(index.lookup(&key)?.iter().map(|&r| (l, r)));
    }
    Ok(pairs)
}
