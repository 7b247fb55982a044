//! Exclusion: remove one pool's content from another without going negative.

use crate::aggregate::aggregate;
use crate::pool::Pool;
use crate::species::SpeciesSet;

/// Element-wise `max(0, aggregate - to_exclude)`.
pub fn exclude<P: Pool>(aggregate: &P, to_exclude: &P) -> P {
    let mut remaining = aggregate.clone();
    remaining.subtract_floored(to_exclude);
    remaining
}

/// Exclude the summed content of `to_exclude`. With nothing to exclude the
/// aggregate comes back unchanged.
pub fn exclude_all<P: Pool>(species: &SpeciesSet, aggregate_pool: P, to_exclude: &[P]) -> P {
    if to_exclude.is_empty() {
        return aggregate_pool;
    }
    let excluded: P = aggregate(species, to_exclude);
    let mut remaining = aggregate_pool;
    remaining.subtract_floored(&excluded);
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{AbundanceMatrix, AbundancePool, BiomassPool};
    use crate::species::Species;

    fn set() -> SpeciesSet {
        SpeciesSet::new(vec![Species::biomass("A"), Species::biomass("B")])
    }

    #[test]
    fn test_exclude_subtracts() {
        let total = BiomassPool::new(vec![10.0, 5.0]);
        let held = BiomassPool::new(vec![4.0, 1.0]);
        assert_eq!(exclude(&total, &held).values(), &[6.0, 4.0]);
    }

    #[test]
    fn test_exclude_floors_at_zero() {
        let total = BiomassPool::new(vec![0.1 + 0.2, 1.0]);
        let held = BiomassPool::new(vec![0.3, 2.0]);
        let out = exclude(&total, &held);
        assert!(out.get(0) >= 0.0);
        assert_eq!(out.get(1), 0.0);
        assert!(out.is_physical());
    }

    #[test]
    fn test_exclude_all_empty_is_noop() {
        let total = BiomassPool::new(vec![10.0, 5.0]);
        let out = exclude_all(&set(), total.clone(), &[]);
        assert_eq!(out, total);
    }

    #[test]
    fn test_exclude_all_sums_first() {
        let total = BiomassPool::new(vec![10.0, 5.0]);
        let held = vec![BiomassPool::new(vec![2.0, 1.0]), BiomassPool::new(vec![3.0, 9.0])];
        let out = exclude_all(&set(), total, &held);
        assert_eq!(out.values(), &[5.0, 0.0]);
    }

    #[test]
    fn test_exclude_abundance_floors_each_bin() {
        let total = AbundancePool::new(vec![AbundanceMatrix::from_rows(vec![vec![5.0, 1.0]])]);
        let held = AbundancePool::new(vec![AbundanceMatrix::from_rows(vec![vec![1.0, 1.5]])]);
        let out = exclude(&total, &held);
        assert_eq!(out.matrix(0).row(0), &[4.0, 0.0]);
    }
}
