use crate::error::{EngineError, Result};
use std::collections::BTreeSet;
use triz_taxonomy::{Catalog, Principle};

/// Look up the inventive principles the matrix recommends for every ordered
/// (improving, preserving) pair.
///
/// The union over the full Cartesian product is deliberate: the matrix is
/// sparse, and a multi-effect contradiction should surface every principle
/// that any pair captures. Self-pairs are skipped (a parameter cannot
/// contradict itself), as are pairs falling outside the matrix bounds, which
/// simply contribute no recommendation. The result is sorted by ascending
/// principle ID and mapped to full records.
pub fn resolve(
    catalog: &Catalog,
    improving: &[i64],
    preserving: &[i64],
) -> Result<Vec<Principle>> {
    for &id in improving.iter().chain(preserving.iter()) {
        if id <= 0 {
            return Err(EngineError::InvalidParameterId(id));
        }
    }

    let matrix = catalog.matrix();
    let mut principle_ids: BTreeSet<u32> = BTreeSet::new();

    for &improve in improving {
        for &preserve in preserving {
            if improve == preserve {
                continue;
            }
            let row = (improve - 1) as usize;
            let col = (preserve - 1) as usize;
            if let Some(cell) = matrix.cell(row, col) {
                principle_ids.extend(cell.iter().copied());
            }
        }
    }

    let mut principles = Vec::with_capacity(principle_ids.len());
    for id in principle_ids {
        match catalog.principle_by_id(id) {
            Ok(principle) => principles.push(principle.clone()),
            Err(_) => log::warn!("Matrix references unknown principle id {id}"),
        }
    }

    log::debug!(
        "Matrix lookup: improving={improving:?} preserving={preserving:?} -> {} principles",
        principles.len()
    );

    Ok(principles)
}
