//! Capacity ledger.
//!
//! Tracks, per asset, the capacity in service before the first period and the
//! incremental builds recorded at each period. Builds are never retired, so
//! the capacity available in period `p` is the existing capacity plus every
//! build whose year falls in `p`'s accumulation window.
//!
//! The ledger is generic over the build quantity `Q`. With `Q = f64` it
//! evaluates fixed or solved capacities; with `Q = good_lp::Variable` the same
//! queries yield `good_lp::Expression`s for the optimization model.
//!
//! ```
//! use cxp_algo::ledger::CapacityLedger;
//! use cxp_core::{BuildYear, Period, PeriodId, PeriodOrder, LineId};
//!
//! let periods = PeriodOrder::new(vec![
//!     Period::new("p1", 2020, 2029),
//!     Period::new("p2", 2030, 2039),
//! ]).unwrap();
//! let line = LineId::new("A-B");
//!
//! let mut ledger = CapacityLedger::<LineId, f64>::new(periods);
//! ledger.add_asset(line.clone(), 50.0, 1.0, true).unwrap();
//! ledger.record_build(&line, BuildYear::Period(PeriodId::new("p1")), 10.0).unwrap();
//! ledger.record_build(&line, BuildYear::Period(PeriodId::new("p2")), 5.0).unwrap();
//!
//! let p2 = PeriodId::new("p2");
//! assert_eq!(ledger.available_capacity::<f64>(&line, &p2).unwrap(), 65.0);
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::{Add, Mul};

use cxp_core::{BuildYear, CxpError, CxpResult, PeriodId, PeriodOrder};

#[derive(Debug, Clone)]
struct AssetEntry<Q> {
    existing: f64,
    derating: f64,
    buildable: bool,
    builds: BTreeMap<BuildYear, Q>,
}

/// Accumulates builds per asset across ordered periods.
#[derive(Debug, Clone)]
pub struct CapacityLedger<A, Q> {
    periods: PeriodOrder,
    assets: BTreeMap<A, AssetEntry<Q>>,
}

impl<A, Q> CapacityLedger<A, Q>
where
    A: Ord + Clone + Display,
    Q: Clone,
{
    pub fn new(periods: PeriodOrder) -> Self {
        Self {
            periods,
            assets: BTreeMap::new(),
        }
    }

    pub fn periods(&self) -> &PeriodOrder {
        &self.periods
    }

    /// Register an asset with its pre-existing capacity and derating factor.
    ///
    /// Non-buildable assets only ever carry their existing capacity (plus
    /// legacy builds).
    pub fn add_asset(
        &mut self,
        asset: A,
        existing: f64,
        derating: f64,
        buildable: bool,
    ) -> CxpResult<()> {
        if self.assets.contains_key(&asset) {
            return Err(CxpError::Config(format!(
                "asset {} registered in the capacity ledger twice",
                asset
            )));
        }
        self.assets.insert(
            asset,
            AssetEntry {
                existing,
                derating,
                buildable,
                builds: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Record an incremental build.
    ///
    /// Fails for unknown assets or periods, for a second record at the same
    /// build year, and for a period build on a non-buildable asset.
    pub fn record_build(&mut self, asset: &A, year: BuildYear, quantity: Q) -> CxpResult<()> {
        if let BuildYear::Period(period) = &year {
            self.periods.position(period)?;
        }
        let entry = self.entry_mut(asset)?;
        if matches!(year, BuildYear::Period(_)) && !entry.buildable {
            return Err(CxpError::Config(format!(
                "asset {} does not allow new builds",
                asset
            )));
        }
        if entry.builds.contains_key(&year) {
            return Err(CxpError::Config(format!(
                "build of asset {} at {:?} recorded twice",
                asset, year
            )));
        }
        entry.builds.insert(year, quantity);
        Ok(())
    }

    pub fn contains(&self, asset: &A) -> bool {
        self.assets.contains_key(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &A> {
        self.assets.keys()
    }

    pub fn is_buildable(&self, asset: &A) -> CxpResult<bool> {
        Ok(self.entry(asset)?.buildable)
    }

    pub fn existing(&self, asset: &A) -> CxpResult<f64> {
        Ok(self.entry(asset)?.existing)
    }

    pub fn derating(&self, asset: &A) -> CxpResult<f64> {
        Ok(self.entry(asset)?.derating)
    }

    /// The build recorded for `asset` at exactly `period`, if any.
    pub fn build_in(&self, asset: &A, period: &PeriodId) -> CxpResult<Option<&Q>> {
        self.periods.position(period)?;
        Ok(self
            .entry(asset)?
            .builds
            .get(&BuildYear::Period(period.clone())))
    }

    /// Sum of builds in service during `period` (window order, legacy first).
    /// A missing record contributes exactly zero.
    pub fn new_capacity<L>(&self, asset: &A, period: &PeriodId) -> CxpResult<L>
    where
        L: From<f64> + Add<Q, Output = L>,
    {
        let entry = self.entry(asset)?;
        let window = self.periods.window(period)?;

        let legacy = entry.builds.get(&BuildYear::Legacy).cloned();
        let in_window = window
            .iter()
            .filter_map(|p| entry.builds.get(&BuildYear::Period(p.id.clone())).cloned());

        Ok(legacy
            .into_iter()
            .chain(in_window)
            .fold(L::from(0.0), |acc, q| acc + q))
    }

    /// Existing capacity plus all builds in `period`'s window.
    pub fn available_capacity<L>(&self, asset: &A, period: &PeriodId) -> CxpResult<L>
    where
        L: From<f64> + Add<Q, Output = L> + Add<f64, Output = L>,
    {
        let existing = self.existing(asset)?;
        let built: L = self.new_capacity(asset, period)?;
        Ok(built + existing)
    }

    /// Available capacity scaled by the asset's derating factor.
    pub fn available_derated_capacity<L>(&self, asset: &A, period: &PeriodId) -> CxpResult<L>
    where
        L: From<f64> + Add<Q, Output = L> + Add<f64, Output = L> + Mul<f64, Output = L>,
    {
        let derating = self.derating(asset)?;
        let available: L = self.available_capacity(asset, period)?;
        Ok(available * derating)
    }

    fn entry(&self, asset: &A) -> CxpResult<&AssetEntry<Q>> {
        self.assets.get(asset).ok_or_else(|| {
            CxpError::Lookup(format!("asset {} is not in the capacity ledger", asset))
        })
    }

    fn entry_mut(&mut self, asset: &A) -> CxpResult<&mut AssetEntry<Q>> {
        self.assets.get_mut(asset).ok_or_else(|| {
            CxpError::Lookup(format!("asset {} is not in the capacity ledger", asset))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxp_core::{LineId, Period, ZoneId};
    use good_lp::{variable, variables, Expression};
    use proptest::prelude::*;

    fn periods() -> PeriodOrder {
        PeriodOrder::new(vec![
            Period::new("p3", 2040, 2049),
            Period::new("p1", 2020, 2029),
            Period::new("p2", 2030, 2039),
        ])
        .unwrap()
    }

    fn pid(id: &str) -> PeriodId {
        PeriodId::new(id)
    }

    #[test]
    fn test_accumulation_scenario() {
        let line = LineId::new("A-B");
        let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
        ledger.add_asset(line.clone(), 50.0, 1.0, true).unwrap();
        ledger
            .record_build(&line, BuildYear::Period(pid("p2")), 10.0)
            .unwrap();
        ledger
            .record_build(&line, BuildYear::Period(pid("p3")), 5.0)
            .unwrap();

        assert_eq!(ledger.available_capacity::<f64>(&line, &pid("p1")).unwrap(), 50.0);
        assert_eq!(ledger.available_capacity::<f64>(&line, &pid("p2")).unwrap(), 60.0);
        assert_eq!(ledger.available_capacity::<f64>(&line, &pid("p3")).unwrap(), 65.0);
    }

    #[test]
    fn test_missing_record_is_zero() {
        let line = LineId::new("L");
        let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
        ledger.add_asset(line.clone(), 0.0, 1.0, true).unwrap();
        assert_eq!(ledger.new_capacity::<f64>(&line, &pid("p3")).unwrap(), 0.0);
        assert!(ledger.build_in(&line, &pid("p1")).unwrap().is_none());
    }

    #[test]
    fn test_derated_capacity() {
        let line = LineId::new("L");
        let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
        ledger.add_asset(line.clone(), 100.0, 0.9, true).unwrap();
        ledger
            .record_build(&line, BuildYear::Period(pid("p1")), 20.0)
            .unwrap();
        let derated: f64 = ledger.available_derated_capacity(&line, &pid("p1")).unwrap();
        assert!((derated - 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_buildable_asset() {
        let line = LineId::new("L");
        let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
        ledger.add_asset(line.clone(), 40.0, 1.0, false).unwrap();

        let err = ledger
            .record_build(&line, BuildYear::Period(pid("p1")), 1.0)
            .unwrap_err();
        assert!(matches!(err, CxpError::Config(_)));

        ledger.record_build(&line, BuildYear::Legacy, 5.0).unwrap();
        assert_eq!(ledger.available_capacity::<f64>(&line, &pid("p1")).unwrap(), 45.0);
    }

    #[test]
    fn test_lookup_errors() {
        let mut ledger = CapacityLedger::<ZoneId, f64>::new(periods());
        let zone = ZoneId::new("Z");
        assert!(matches!(
            ledger.available_capacity::<f64>(&zone, &pid("p1")),
            Err(CxpError::Lookup(_))
        ));

        ledger.add_asset(zone.clone(), 0.0, 1.0, true).unwrap();
        assert!(matches!(
            ledger.record_build(&zone, BuildYear::Period(pid("p9")), 1.0),
            Err(CxpError::Lookup(_))
        ));
        assert!(matches!(
            ledger.add_asset(zone, 0.0, 1.0, true),
            Err(CxpError::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_build_rejected() {
        let line = LineId::new("L");
        let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
        ledger.add_asset(line.clone(), 0.0, 1.0, true).unwrap();
        ledger
            .record_build(&line, BuildYear::Period(pid("p1")), 1.0)
            .unwrap();
        assert!(ledger
            .record_build(&line, BuildYear::Period(pid("p1")), 2.0)
            .is_err());
    }

    #[test]
    fn test_variable_quantities_build_expressions() {
        let mut vars = variables!();
        let b1 = vars.add(variable().min(0.0));
        let b2 = vars.add(variable().min(0.0));

        let line = LineId::new("L");
        let mut ledger = CapacityLedger::<LineId, good_lp::Variable>::new(periods());
        ledger.add_asset(line.clone(), 50.0, 0.5, true).unwrap();
        ledger.record_build(&line, BuildYear::Period(pid("p1")), b1).unwrap();
        ledger.record_build(&line, BuildYear::Period(pid("p2")), b2).unwrap();

        let expr: Expression = ledger.available_derated_capacity(&line, &pid("p2")).unwrap();
        let values: std::collections::HashMap<good_lp::Variable, f64> =
            [(b1, 10.0), (b2, 4.0)].into_iter().collect();
        assert!((expr.eval_with(&values) - 32.0).abs() < 1e-9);

        let p1: Expression = ledger.available_capacity(&line, &pid("p1")).unwrap();
        assert!((p1.eval_with(&values) - 60.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_available_is_non_decreasing(
            existing in 0.0f64..1000.0,
            builds in proptest::collection::vec(proptest::option::of(0.0f64..500.0), 3),
        ) {
            let line = LineId::new("L");
            let mut ledger = CapacityLedger::<LineId, f64>::new(periods());
            ledger.add_asset(line.clone(), existing, 1.0, true).unwrap();
            for (period, build) in ["p1", "p2", "p3"].iter().zip(&builds) {
                if let Some(q) = build {
                    ledger.record_build(&line, BuildYear::Period(pid(period)), *q).unwrap();
                }
            }

            let mut previous = f64::NEG_INFINITY;
            for period in ["p1", "p2", "p3"] {
                let available: f64 = ledger.available_capacity(&line, &pid(period)).unwrap();
                prop_assert!(available >= previous);
                prop_assert!(available >= existing);
                previous = available;
            }
        }
    }
}
