//! Dated allocation grids and the periodic lookup over them.
//!
//! A [`GridTimeSeries`] holds one [`AllocationGridSet`] per day offset,
//! sorted, immutable once built, and always starting at offset 0. Lookups
//! map the absolute simulated day onto the period (365 days by default) so
//! one year of grids is reused year after year.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extent::MapExtent;
use crate::grid::Grid;
use crate::input::GridRecord;

/// Default period: grids repeat yearly.
pub const DEFAULT_PERIOD: u32 = 365;

/// Grouping key of a grid: a species, optionally narrowed to a size class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridKey {
    pub species: String,
    pub size_class: Option<String>,
}

impl GridKey {
    pub fn species(species: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            size_class: None,
        }
    }

    pub fn sized(species: impl Into<String>, size_class: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            size_class: Some(size_class.into()),
        }
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.size_class {
            Some(class) => write!(f, "{}/{}", self.species, class),
            None => write!(f, "{}", self.species),
        }
    }
}

/// All grids for one day offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationGridSet {
    offset: u32,
    grids: BTreeMap<GridKey, Grid>,
}

impl AllocationGridSet {
    pub fn new(offset: u32, grids: BTreeMap<GridKey, Grid>) -> Self {
        Self { offset, grids }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn get(&self, key: &GridKey) -> Option<&Grid> {
        self.grids.get(key)
    }

    /// Like [`get`](Self::get), but a missing key is a `MissingGrid` error.
    pub fn require(&self, key: &GridKey) -> Result<&Grid, ConfigError> {
        self.grids.get(key).ok_or_else(|| ConfigError::MissingGrid {
            key: key.to_string(),
            offset: self.offset,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &GridKey> {
        self.grids.keys()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

/// Maps an absolute simulated day onto a day offset, wrapping every period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodicStepMapper {
    period: u32,
}

impl PeriodicStepMapper {
    pub fn new(period: u32) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    #[inline]
    pub fn offset(&self, step: u32) -> u32 {
        step % self.period
    }
}

impl Default for PeriodicStepMapper {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
        }
    }
}

/// Sorted, immutable collection of allocation grid sets.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTimeSeries {
    /// Sorted by offset; the first entry is always offset 0.
    sets: Vec<AllocationGridSet>,
    mapper: PeriodicStepMapper,
    /// Calendar date of offset 0, when the series came from dated rows.
    anchor: Option<NaiveDate>,
}

impl GridTimeSeries {
    /// Assemble a series from ready-made grid sets.
    pub fn from_sets(
        sets: impl IntoIterator<Item = AllocationGridSet>,
        period: u32,
    ) -> Result<Self, ConfigError> {
        let mapper = PeriodicStepMapper::new(period)?;
        let mut by_offset: BTreeMap<u32, AllocationGridSet> = BTreeMap::new();
        for set in sets {
            by_offset.insert(set.offset, set);
        }
        if !by_offset.contains_key(&0) {
            return Err(ConfigError::UnscheduledOffset { offset: 0 });
        }
        if let Some(last) = by_offset.keys().next_back().filter(|o| **o >= period) {
            log::warn!(
                "grid series reaches day offset {last} but the period is {period}; later grids are never used"
            );
        }
        Ok(Self {
            sets: by_offset.into_values().collect(),
            mapper,
            anchor: None,
        })
    }

    /// Build a series from dated point samples.
    ///
    /// Rows are grouped by date, then by key. The anchor (`start`, or the
    /// earliest date when `start` is `None`) becomes offset 0 and later dates
    /// become day-count offsets from it. Rows outside `[start, end]` are
    /// discarded. Samples that project outside `extent` are dropped.
    pub fn from_records(
        records: &[GridRecord],
        extent: MapExtent,
        period: u32,
        normalize: bool,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, ConfigError> {
        let in_window = |date: NaiveDate| {
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        };

        let mut by_date: BTreeMap<NaiveDate, BTreeMap<GridKey, Vec<&GridRecord>>> =
            BTreeMap::new();
        for record in records.iter().filter(|r| in_window(r.date)) {
            let key = GridKey {
                species: record.species.clone(),
                size_class: record.size_class.clone(),
            };
            by_date
                .entry(record.date)
                .or_default()
                .entry(key)
                .or_default()
                .push(record);
        }

        let Some(earliest) = by_date.keys().next().copied() else {
            return Err(ConfigError::EmptySource {
                input: "grid records".to_string(),
            });
        };
        let anchor = start.unwrap_or(earliest);
        if earliest != anchor {
            return Err(ConfigError::MissingAnchor { date: anchor });
        }

        let mut dropped = 0usize;
        let mut sets = Vec::with_capacity(by_date.len());
        for (date, groups) in by_date {
            let offset = (date - anchor).num_days() as u32;
            let mut grids = BTreeMap::new();
            for (key, samples) in groups {
                let mut grid = Grid::new(extent.width, extent.height);
                for sample in samples {
                    // Out-of-bounds samples are dropped by policy.
                    match extent.cell_of(sample.lon, sample.lat) {
                        Some((x, y)) => grid.set(x, y, sample.value),
                        None => dropped += 1,
                    }
                }
                if normalize && !grid.normalize() {
                    return Err(ConfigError::ZeroSumGrid {
                        key: key.to_string(),
                        offset,
                    });
                }
                grids.insert(key, grid);
            }
            sets.push(AllocationGridSet::new(offset, grids));
        }
        if dropped > 0 {
            log::trace!("dropped {dropped} grid samples outside the map extent");
        }

        let mut series = Self::from_sets(sets, period)?;
        series.anchor = Some(anchor);
        log::info!(
            "built grid series: {} day offsets, period {}, anchored at {}",
            series.sets.len(),
            period,
            anchor
        );
        Ok(series)
    }

    /// The grid set whose offset is the greatest one `<= step mod period`.
    pub fn at_or_before_step(&self, step: u32) -> &AllocationGridSet {
        let offset = self.mapper.offset(step);
        // sets[0] is offset 0, so at least one entry qualifies.
        let idx = self.sets.partition_point(|s| s.offset <= offset);
        &self.sets[idx.saturating_sub(1)]
    }

    /// The grid set at exactly this offset.
    pub fn at_offset(&self, offset: u32) -> Option<&AllocationGridSet> {
        self.sets
            .binary_search_by_key(&offset, |s| s.offset)
            .ok()
            .map(|idx| &self.sets[idx])
    }

    pub fn contains_offset(&self, offset: u32) -> bool {
        self.at_offset(offset).is_some()
    }

    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.sets.iter().map(|s| s.offset)
    }

    pub fn step_mapper(&self) -> PeriodicStepMapper {
        self.mapper
    }

    pub fn period(&self) -> u32 {
        self.mapper.period()
    }

    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(d: NaiveDate, species: &str, lon: f64, lat: f64, value: f64) -> GridRecord {
        GridRecord {
            date: d,
            species: species.to_string(),
            size_class: None,
            lon,
            lat,
            value,
        }
    }

    fn extent() -> MapExtent {
        MapExtent::new(0.0, 4.0, 0.0, 4.0, 4, 4)
    }

    #[test]
    fn test_offsets_from_earliest_date() {
        let rows = vec![
            record(date(2017, 1, 11), "A", 0.5, 3.5, 1.0),
            record(date(2017, 1, 1), "A", 1.5, 3.5, 1.0),
            record(date(2017, 2, 1), "A", 2.5, 3.5, 1.0),
        ];
        let series = GridTimeSeries::from_records(&rows, extent(), 365, true, None, None).unwrap();
        assert_eq!(series.offsets().collect::<Vec<_>>(), vec![0, 10, 31]);
        assert_eq!(series.anchor(), Some(date(2017, 1, 1)));
    }

    #[test]
    fn test_normalized_grids_sum_to_one() {
        let d = date(2017, 1, 1);
        let rows = vec![
            record(d, "A", 0.5, 3.5, 3.0),
            record(d, "A", 1.5, 3.5, 1.0),
            record(d, "B", 1.5, 1.5, 9.0),
        ];
        let series = GridTimeSeries::from_records(&rows, extent(), 365, true, None, None).unwrap();
        let set = series.at_or_before_step(0);
        let a = set.require(&GridKey::species("A")).unwrap();
        assert!((a.sum() - 1.0).abs() < 1e-12);
        assert!((a.get(0, 0) - 0.75).abs() < 1e-12);
        assert!((set.require(&GridKey::species("B")).unwrap().get(1, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unnormalized_keeps_raw_values() {
        let rows = vec![record(date(2017, 1, 1), "A", 0.5, 3.5, 3.0)];
        let series = GridTimeSeries::from_records(&rows, extent(), 365, false, None, None).unwrap();
        let grid = series.at_or_before_step(0).require(&GridKey::species("A")).unwrap();
        assert_eq!(grid.get(0, 0), 3.0);
    }

    #[test]
    fn test_out_of_bounds_samples_dropped() {
        let d = date(2017, 1, 1);
        let rows = vec![record(d, "A", 0.5, 3.5, 1.0), record(d, "A", 99.0, 3.5, 5.0)];
        let series = GridTimeSeries::from_records(&rows, extent(), 365, false, None, None).unwrap();
        let grid = series.at_or_before_step(0).require(&GridKey::species("A")).unwrap();
        assert_eq!(grid.sum(), 1.0);
    }

    #[test]
    fn test_zero_sum_grid_cannot_normalize() {
        let rows = vec![record(date(2017, 1, 1), "A", 99.0, 99.0, 1.0)];
        let err =
            GridTimeSeries::from_records(&rows, extent(), 365, true, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSumGrid { offset: 0, .. }));
    }

    #[test]
    fn test_empty_records_rejected() {
        let err = GridTimeSeries::from_records(&[], extent(), 365, true, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySource { .. }));
    }

    #[test]
    fn test_window_anchor_must_have_rows() {
        let rows = vec![
            record(date(2016, 12, 1), "A", 0.5, 3.5, 1.0),
            record(date(2017, 1, 5), "A", 0.5, 3.5, 1.0),
        ];
        let err = GridTimeSeries::from_records(
            &rows,
            extent(),
            365,
            true,
            Some(date(2017, 1, 1)),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingAnchor { .. }));
    }

    #[test]
    fn test_window_filters_rows() {
        let rows = vec![
            record(date(2016, 12, 1), "A", 0.5, 3.5, 1.0),
            record(date(2017, 1, 1), "A", 0.5, 3.5, 1.0),
            record(date(2017, 6, 1), "A", 0.5, 3.5, 1.0),
            record(date(2018, 1, 1), "A", 0.5, 3.5, 1.0),
        ];
        let series = GridTimeSeries::from_records(
            &rows,
            extent(),
            365,
            true,
            Some(date(2017, 1, 1)),
            Some(date(2017, 12, 31)),
        )
        .unwrap();
        assert_eq!(series.offsets().collect::<Vec<_>>(), vec![0, 151]);
    }

    #[test]
    fn test_from_sets_requires_offset_zero() {
        let set = AllocationGridSet::new(5, BTreeMap::new());
        assert!(GridTimeSeries::from_sets([set], 365).is_err());
    }

    #[test]
    fn test_zero_period_rejected() {
        let set = AllocationGridSet::new(0, BTreeMap::new());
        let err = GridTimeSeries::from_sets([set], 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPeriod));
    }

    #[test]
    fn test_periodic_lookup() {
        let sets = [0, 90, 180].map(|o| AllocationGridSet::new(o, BTreeMap::new()));
        let series = GridTimeSeries::from_sets(sets, 365).unwrap();
        for k in 0..4u32 {
            for r in [0u32, 45, 90, 179, 180, 364] {
                assert_eq!(
                    series.at_or_before_step(365 * k + r).offset(),
                    series.at_or_before_step(r).offset()
                );
            }
        }
        assert_eq!(series.at_or_before_step(89).offset(), 0);
        assert_eq!(series.at_or_before_step(90).offset(), 90);
        assert_eq!(series.at_or_before_step(364).offset(), 180);
    }

    #[test]
    fn test_missing_key_is_error() {
        let set = AllocationGridSet::new(7, BTreeMap::new());
        let err = set.require(&GridKey::sized("A", "large")).unwrap_err();
        match err {
            ConfigError::MissingGrid { key, offset } => {
                assert_eq!(key, "A/large");
                assert_eq!(offset, 7);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
