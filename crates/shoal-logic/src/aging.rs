//! Aging: every cohort moves up one bin.

use crate::pool::{AbundanceMatrix, AbundancePool};

/// Shift each subdivision one bin up. The last bin is a plus group that
/// keeps its own fish and receives the bin below; bin 0 empties.
pub fn age_matrix(matrix: &mut AbundanceMatrix) {
    let bins = matrix.bins();
    if bins < 2 {
        return;
    }
    for sub in 0..matrix.subdivisions() {
        let row = matrix.row_mut(sub);
        let plus = row[bins - 1] + row[bins - 2];
        row.copy_within(0..bins - 2, 1);
        row[bins - 1] = plus;
        row[0] = 0.0;
    }
}

/// Age every species in a pool.
pub fn age_pool(pool: &mut AbundancePool) {
    let species = pool.matrices().len();
    for idx in 0..species {
        age_matrix(pool.matrix_mut(idx));
    }
}
