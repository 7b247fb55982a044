//! Death event observers.
//!
//! The mortality stage reports every removal as a [`DeathEvent`]. Reporting
//! collaborators implement [`DeathObserver`] and subscribe through the
//! engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Fish removed from one cohort by one mortality source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathEvent<'a> {
    pub day: u32,
    pub species: &'a str,
    pub source: &'a str,
    pub subdivision: usize,
    pub bin: usize,
    pub count: f64,
}

pub trait DeathObserver: Send {
    fn on_death(&mut self, event: &DeathEvent<'_>);
}

/// Fans every event out to all subscribers, in subscription order.
#[derive(Default)]
pub struct DeathObservers {
    observers: Vec<Box<dyn DeathObserver>>,
}

impl DeathObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn DeathObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl DeathObserver for DeathObservers {
    fn on_death(&mut self, event: &DeathEvent<'_>) {
        for observer in &mut self.observers {
            observer.on_death(event);
        }
    }
}

/// Running totals of deaths per (species, source).
///
/// Clones share one tally, so a caller can keep a handle after handing a
/// clone to the engine.
#[derive(Debug, Clone, Default)]
pub struct DeathTally {
    totals: Arc<Mutex<HashMap<(String, String), f64>>>,
}

impl DeathTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self, species: &str, source: &str) -> f64 {
        let totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals
            .get(&(species.to_string(), source.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Deaths of a species from every source.
    pub fn species_total(&self, species: &str) -> f64 {
        let totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals
            .iter()
            .filter(|((s, _), _)| s == species)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn reset(&self) {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DeathObserver for DeathTally {
    fn on_death(&mut self, event: &DeathEvent<'_>) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        *totals
            .entry((event.species.to_string(), event.source.to_string()))
            .or_insert(0.0) += event.count;
    }
}
