//! Run configuration.
//!
//! Both structs deserialize from JSON with every field but the grid source
//! optional. Validation happens where the values are used: the period when
//! a series or schedule is built, the process dates when they are turned
//! into day offsets.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::GridSeriesKey;
use crate::calendar::MonthDay;
use crate::error::ConfigError;
use crate::extent::MapExtent;
use crate::series::{PeriodicStepMapper, DEFAULT_PERIOD};

fn default_period() -> u32 {
    DEFAULT_PERIOD
}

fn default_true() -> bool {
    true
}

/// When the biological chain runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Days before the grid series repeats.
    #[serde(default = "default_period")]
    pub period: u32,
    /// Days receiving mortality, aging and recruitment before reallocation.
    /// Every other grid offset only reallocates.
    #[serde(default)]
    pub process_dates: Vec<MonthDay>,
    /// Calendar date of day offset 0. Defaults to the grid series anchor.
    #[serde(default)]
    pub anchor_date: Option<NaiveDate>,
    /// Relative amplitude of uniform noise applied to recruits.
    #[serde(default)]
    pub recruitment_noise: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            process_dates: Vec::new(),
            anchor_date: None,
            recruitment_noise: 0.0,
        }
    }
}

impl ScheduleConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_process_dates(mut self, dates: Vec<MonthDay>) -> Self {
        self.process_dates = dates;
        self
    }

    pub fn with_recruitment_noise(mut self, amplitude: f64) -> Self {
        self.recruitment_noise = amplitude;
        self
    }

    /// Day offsets of the process dates, sorted and deduplicated.
    ///
    /// `fallback_anchor` is used when no anchor date is configured.
    pub fn process_offsets(
        &self,
        fallback_anchor: Option<NaiveDate>,
    ) -> Result<Vec<u32>, ConfigError> {
        let mapper = PeriodicStepMapper::new(self.period)?;
        if self.process_dates.is_empty() {
            return Ok(Vec::new());
        }
        let anchor = self.anchor_date.or(fallback_anchor).ok_or_else(|| {
            ConfigError::InvalidParameter {
                name: "anchor_date",
                reason: "process dates need an anchor date".to_string(),
            }
        })?;
        let mut offsets = self
            .process_dates
            .iter()
            .map(|date| date.offset_from(anchor).map(|days| mapper.offset(days)))
            .collect::<Result<Vec<_>, _>>()?;
        offsets.sort_unstable();
        offsets.dedup();
        Ok(offsets)
    }
}

/// Where allocation grids come from and how they are shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSeriesConfig {
    pub source: PathBuf,
    pub extent: MapExtent,
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl GridSeriesConfig {
    pub fn new(source: impl Into<PathBuf>, extent: MapExtent) -> Self {
        Self {
            source: source.into(),
            extent,
            period: DEFAULT_PERIOD,
            normalize: true,
            start_date: None,
            end_date: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The cache key identifying the series this configuration loads.
    pub fn key(&self) -> GridSeriesKey {
        GridSeriesKey::new(self.source.clone(), self.extent, self.period, self.normalize)
            .with_window(self.start_date, self.end_date)
    }
}
