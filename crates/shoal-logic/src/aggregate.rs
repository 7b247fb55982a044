//! Aggregation: sum many pools into one.

use crate::pool::Pool;
use crate::species::SpeciesSet;

/// Sum `pools` element-wise. An empty input gives an all-zero pool for
/// `species`.
pub fn aggregate<'a, P, I>(species: &SpeciesSet, pools: I) -> P
where
    P: Pool,
    I: IntoIterator<Item = &'a P>,
{
    pools.into_iter().fold(P::zeroed(species), |mut total, pool| {
        total.accumulate(pool);
        total
    })
}
