//! Cost accumulator.
//!
//! Annualizes capital costs with a capital recovery factor and collects named
//! cost components, indexed either by period or by timepoint. The model
//! assembler turns the component lists into one objective:
//!
//! ```text
//! Σ_p years(p) · Σ_c period_cost[c][p]  +  Σ_t weight(t) · Σ_c timepoint_cost[c][t]
//! ```
//!
//! Two amortization rules coexist:
//!
//! - transmission is charged on the **incremental build of each period only**
//!   ([`incremental_fixed_cost`]);
//! - local T&D is charged on **total installed capacity**, existing capacity
//!   included, which is treated as rebuilt at end of life
//!   ([`capacity_fixed_cost`]).

use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::{Add, Mul};

use cxp_core::{
    CxpError, CxpResult, PeriodId, PeriodOrder, Timescales, TimepointId, TransmissionLine,
    TransmissionParams,
};

use crate::ledger::CapacityLedger;

/// Capital recovery factor: `r / (1 - (1 + r)^-L)`, or `1 / L` when `r` is 0.
pub fn capital_recovery_factor(interest_rate: f64, lifetime_yrs: f64) -> f64 {
    if interest_rate.abs() < 1e-10 {
        // No discounting
        1.0 / lifetime_yrs
    } else {
        interest_rate / (1.0 - (1.0 + interest_rate).powf(-lifetime_yrs))
    }
}

/// Annual cost of one MW of a line ($/MW-yr).
pub fn annual_unit_cost(
    capital_cost_per_mw_km: f64,
    terrain_multiplier: f64,
    length_km: f64,
    crf: f64,
    fixed_om_fraction: f64,
) -> f64 {
    capital_cost_per_mw_km * terrain_multiplier * length_km * (crf + fixed_om_fraction)
}

/// Annual cost of one MW of `line` under the system-wide parameters.
pub fn transmission_annual_cost(
    line: &TransmissionLine,
    params: &TransmissionParams,
    interest_rate: f64,
) -> f64 {
    let crf = capital_recovery_factor(interest_rate, params.lifetime_yrs);
    annual_unit_cost(
        params.capital_cost_per_mw_km,
        line.terrain_multiplier,
        line.length.value(),
        crf,
        params.fixed_om_fraction,
    )
}

/// Σ_asset build(asset, period) · unit_cost(asset), counting only builds
/// recorded at exactly `period`.
pub fn incremental_fixed_cost<'a, A, Q, L>(
    ledger: &CapacityLedger<A, Q>,
    period: &PeriodId,
    unit_costs: impl IntoIterator<Item = (&'a A, f64)>,
) -> CxpResult<L>
where
    A: Ord + Clone + Display + 'a,
    Q: Clone + Mul<f64, Output = L>,
    L: From<f64> + Add<L, Output = L>,
{
    let mut total = L::from(0.0);
    for (asset, unit_cost) in unit_costs {
        if let Some(build) = ledger.build_in(asset, period)? {
            total = total + build.clone() * unit_cost;
        }
    }
    Ok(total)
}

/// Σ_asset available(asset, period) · unit_cost(asset), existing capacity
/// included.
pub fn capacity_fixed_cost<'a, A, Q, L>(
    ledger: &CapacityLedger<A, Q>,
    period: &PeriodId,
    unit_costs: impl IntoIterator<Item = (&'a A, f64)>,
) -> CxpResult<L>
where
    A: Ord + Clone + Display + 'a,
    Q: Clone,
    L: From<f64>
        + Add<Q, Output = L>
        + Add<f64, Output = L>
        + Add<L, Output = L>
        + Mul<f64, Output = L>,
{
    let mut total = L::from(0.0);
    for (asset, unit_cost) in unit_costs {
        let available: L = ledger.available_capacity(asset, period)?;
        total = total + available * unit_cost;
    }
    Ok(total)
}

/// Named cost components, one list per period and one per timepoint.
#[derive(Debug, Clone)]
pub struct CostComponents<T> {
    per_period: BTreeMap<String, BTreeMap<PeriodId, T>>,
    per_timepoint: BTreeMap<String, BTreeMap<TimepointId, T>>,
}

impl<T> Default for CostComponents<T> {
    fn default() -> Self {
        Self {
            per_period: BTreeMap::new(),
            per_timepoint: BTreeMap::new(),
        }
    }
}

impl<T> CostComponents<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a per-period component. Names are unique across both lists.
    pub fn add_period_component(
        &mut self,
        name: impl Into<String>,
        values: BTreeMap<PeriodId, T>,
    ) -> CxpResult<()> {
        let name = self.check_new(name.into())?;
        self.per_period.insert(name, values);
        Ok(())
    }

    /// Append a per-timepoint component.
    pub fn add_timepoint_component(
        &mut self,
        name: impl Into<String>,
        values: BTreeMap<TimepointId, T>,
    ) -> CxpResult<()> {
        let name = self.check_new(name.into())?;
        self.per_timepoint.insert(name, values);
        Ok(())
    }

    pub fn period_component_names(&self) -> impl Iterator<Item = &str> {
        self.per_period.keys().map(String::as_str)
    }

    pub fn timepoint_component_names(&self) -> impl Iterator<Item = &str> {
        self.per_timepoint.keys().map(String::as_str)
    }

    pub fn period_component(&self, name: &str) -> Option<&BTreeMap<PeriodId, T>> {
        self.per_period.get(name)
    }

    pub fn timepoint_component(&self, name: &str) -> Option<&BTreeMap<TimepointId, T>> {
        self.per_timepoint.get(name)
    }

    fn check_new(&self, name: String) -> CxpResult<String> {
        if self.per_period.contains_key(&name) || self.per_timepoint.contains_key(&name) {
            return Err(CxpError::Registration(format!(
                "cost component {name} registered twice"
            )));
        }
        Ok(name)
    }
}

impl<T> CostComponents<T>
where
    T: Clone + Mul<f64, Output = T>,
{
    /// Weighted total: each period cost times the period's length in years,
    /// each timepoint cost times the timepoint's hours per year.
    pub fn total<L>(&self, periods: &PeriodOrder, timescales: &Timescales) -> CxpResult<L>
    where
        L: From<f64> + Add<T, Output = L>,
    {
        let mut total = L::from(0.0);
        for values in self.per_period.values() {
            for (period, cost) in values {
                let years = periods.get(period)?.years();
                total = total + cost.clone() * years;
            }
        }

        let weights: BTreeMap<&TimepointId, f64> = timescales
            .timepoints()
            .iter()
            .map(|tp| (&tp.id, tp.weight_hours))
            .collect();
        for values in self.per_timepoint.values() {
            for (timepoint, cost) in values {
                let weight = weights.get(timepoint).copied().ok_or_else(|| {
                    CxpError::Lookup(format!("unknown timepoint {timepoint}"))
                })?;
                total = total + cost.clone() * weight;
            }
        }
        Ok(total)
    }
}
