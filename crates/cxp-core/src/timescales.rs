//! Period ordering and timepoint membership.
//!
//! [`PeriodOrder`] sorts investment periods by start year and answers the
//! accumulation-window question: which periods' builds are in service during
//! period `p`? Because builds are never retired, the window of `p` is simply
//! every period whose start is at or before `p`'s start, which is a prefix of
//! the sorted order.

use std::collections::{BTreeMap, HashMap};

use crate::{CxpError, CxpResult, Period, PeriodId, Timepoint, TimepointId};

/// Investment periods sorted by start year.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOrder {
    periods: Vec<Period>,
    position: HashMap<PeriodId, usize>,
}

impl PeriodOrder {
    /// Sort the periods by start year.
    ///
    /// Duplicate ids, duplicate start years and periods that end before they
    /// start are configuration errors: any of them would make the ordering
    /// ambiguous.
    pub fn new(mut periods: Vec<Period>) -> CxpResult<Self> {
        periods.sort_by_key(|p| p.start_year);

        let mut position = HashMap::with_capacity(periods.len());
        for (idx, period) in periods.iter().enumerate() {
            if period.end_year < period.start_year {
                return Err(CxpError::Config(format!(
                    "period {} ends ({}) before it starts ({})",
                    period.id, period.end_year, period.start_year
                )));
            }
            if idx > 0 && periods[idx - 1].start_year == period.start_year {
                return Err(CxpError::Config(format!(
                    "periods {} and {} share start year {}",
                    periods[idx - 1].id,
                    period.id,
                    period.start_year
                )));
            }
            if position.insert(period.id.clone(), idx).is_some() {
                return Err(CxpError::Config(format!(
                    "period {} declared more than once",
                    period.id
                )));
            }
        }

        Ok(Self { periods, position })
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn ids(&self) -> impl Iterator<Item = &PeriodId> {
        self.periods.iter().map(|p| &p.id)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn contains(&self, period: &PeriodId) -> bool {
        self.position.contains_key(period)
    }

    /// Index of `period` in start-year order.
    pub fn position(&self, period: &PeriodId) -> CxpResult<usize> {
        self.position
            .get(period)
            .copied()
            .ok_or_else(|| CxpError::Lookup(format!("unknown period {}", period)))
    }

    pub fn get(&self, period: &PeriodId) -> CxpResult<&Period> {
        Ok(&self.periods[self.position(period)?])
    }

    /// Periods whose builds are in service during `period` (start year at or
    /// before `period`'s start, `period` itself included), in order.
    pub fn window(&self, period: &PeriodId) -> CxpResult<&[Period]> {
        let idx = self.position(period)?;
        Ok(&self.periods[..=idx])
    }
}

/// Timepoints grouped by the period they belong to.
#[derive(Debug, Clone)]
pub struct Timescales {
    timepoints: Vec<Timepoint>,
    period_of: HashMap<TimepointId, PeriodId>,
    by_period: BTreeMap<PeriodId, Vec<TimepointId>>,
}

impl Timescales {
    /// Index timepoints against the period order. A timepoint naming an
    /// unknown period or repeating an id is a configuration error.
    pub fn new(periods: &PeriodOrder, timepoints: Vec<Timepoint>) -> CxpResult<Self> {
        let mut period_of = HashMap::with_capacity(timepoints.len());
        let mut by_period: BTreeMap<PeriodId, Vec<TimepointId>> = BTreeMap::new();

        for tp in &timepoints {
            if !periods.contains(&tp.period) {
                return Err(CxpError::Config(format!(
                    "timepoint {} references unknown period {}",
                    tp.id, tp.period
                )));
            }
            if tp.weight_hours < 0.0 || !tp.weight_hours.is_finite() {
                return Err(CxpError::Config(format!(
                    "timepoint {} has invalid weight {}",
                    tp.id, tp.weight_hours
                )));
            }
            if period_of.insert(tp.id.clone(), tp.period.clone()).is_some() {
                return Err(CxpError::Config(format!(
                    "timepoint {} declared more than once",
                    tp.id
                )));
            }
            by_period
                .entry(tp.period.clone())
                .or_default()
                .push(tp.id.clone());
        }

        Ok(Self {
            timepoints,
            period_of,
            by_period,
        })
    }

    pub fn timepoints(&self) -> &[Timepoint] {
        &self.timepoints
    }

    pub fn ids(&self) -> impl Iterator<Item = &TimepointId> {
        self.timepoints.iter().map(|t| &t.id)
    }

    pub fn period_of(&self, timepoint: &TimepointId) -> CxpResult<&PeriodId> {
        self.period_of
            .get(timepoint)
            .ok_or_else(|| CxpError::Lookup(format!("unknown timepoint {}", timepoint)))
    }

    /// Timepoints of `period` in declaration order (empty if none).
    pub fn timepoints_in(&self, period: &PeriodId) -> &[TimepointId] {
        self.by_period
            .get(period)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
