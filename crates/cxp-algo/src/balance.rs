//! Balance registry.
//!
//! Independent model components contribute to a shared conservation
//! constraint per (node, timepoint) by registering named injection and
//! withdrawal terms. Each term is a pure resolver `(node, timepoint) ->
//! contribution` that returns zero where it does not apply.
//!
//! Terms are stored in id order, so the compiled equations do not depend on
//! the order in which components registered. After [`BalanceRegistry::finalize`]
//! the registry is frozen: further registration is a
//! [`CxpError::Registration`] error, and compilation before finalization is
//! one too.
//!
//! ```
//! use cxp_algo::balance::BalanceRegistry;
//! use cxp_core::{TimepointId, ZoneId};
//!
//! let mut registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
//! registry.register_injection("Generation", |_, _| 10.0).unwrap();
//! registry.register_injection("Imports", |_, _| 5.0).unwrap();
//! registry.register_withdrawal("Demand", |_, _| 15.0).unwrap();
//! registry.finalize();
//!
//! let equations = registry
//!     .build_balance_constraints(&[ZoneId::new("A")], &[TimepointId::new("t1")])
//!     .unwrap();
//! assert!(equations[0].holds(1e-9));
//! ```

use std::collections::BTreeMap;
use std::ops::Add;

use cxp_core::{CxpError, CxpResult, TimepointId, ZoneId};
use good_lp::{constraint, Constraint, Expression};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

/// A pure `(node, timepoint) -> contribution` resolver.
pub type Resolver<T> = Box<dyn Fn(&ZoneId, &TimepointId) -> T + Send + Sync>;

/// Named injection and withdrawal terms for one family of nodes.
pub struct BalanceRegistry<T> {
    name: String,
    injections: BTreeMap<String, Resolver<T>>,
    withdrawals: BTreeMap<String, Resolver<T>>,
    finalized: bool,
}

impl<T> std::fmt::Debug for BalanceRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceRegistry")
            .field("name", &self.name)
            .field("injections", &self.injections.keys().collect::<Vec<_>>())
            .field("withdrawals", &self.withdrawals.keys().collect::<Vec<_>>())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl<T> BalanceRegistry<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            injections: BTreeMap::new(),
            withdrawals: BTreeMap::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_injection<F>(
        &mut self,
        term_id: impl Into<String>,
        resolver: F,
    ) -> CxpResult<()>
    where
        F: Fn(&ZoneId, &TimepointId) -> T + Send + Sync + 'static,
    {
        let term_id = self.check_open(term_id.into())?;
        self.injections.insert(term_id, Box::new(resolver));
        Ok(())
    }

    pub fn register_withdrawal<F>(
        &mut self,
        term_id: impl Into<String>,
        resolver: F,
    ) -> CxpResult<()>
    where
        F: Fn(&ZoneId, &TimepointId) -> T + Send + Sync + 'static,
    {
        let term_id = self.check_open(term_id.into())?;
        self.withdrawals.insert(term_id, Box::new(resolver));
        Ok(())
    }

    /// Freeze the registry. Idempotent.
    pub fn finalize(&mut self) {
        if !self.finalized {
            debug!(
                registry = %self.name,
                injections = self.injections.len(),
                withdrawals = self.withdrawals.len(),
                "finalized balance registry"
            );
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn injection_ids(&self) -> impl Iterator<Item = &str> {
        self.injections.keys().map(String::as_str)
    }

    pub fn withdrawal_ids(&self) -> impl Iterator<Item = &str> {
        self.withdrawals.keys().map(String::as_str)
    }

    fn check_open(&self, term_id: String) -> CxpResult<String> {
        if self.finalized {
            return Err(CxpError::Registration(format!(
                "cannot register {} on {}: registry already finalized",
                term_id, self.name
            )));
        }
        if self.injections.contains_key(&term_id) || self.withdrawals.contains_key(&term_id) {
            return Err(CxpError::Registration(format!(
                "term {} registered twice on {}",
                term_id, self.name
            )));
        }
        Ok(term_id)
    }
}

impl<T> BalanceRegistry<T>
where
    T: From<f64> + Add<T, Output = T> + Send,
{
    /// One equation per (node, timepoint), node-major.
    pub fn build_balance_constraints(
        &self,
        nodes: &[ZoneId],
        timepoints: &[TimepointId],
    ) -> CxpResult<Vec<BalanceEquation<T>>> {
        if !self.finalized {
            return Err(CxpError::Registration(format!(
                "{} must be finalized before compiling balance constraints",
                self.name
            )));
        }

        let index: Vec<(&ZoneId, &TimepointId)> = nodes
            .iter()
            .flat_map(|z| timepoints.iter().map(move |t| (z, t)))
            .collect();

        #[cfg(feature = "parallel")]
        let equations = index
            .par_iter()
            .map(|(zone, tp)| self.equation(zone, tp))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let equations = index
            .iter()
            .map(|(zone, tp)| self.equation(zone, tp))
            .collect();

        Ok(equations)
    }

    fn equation(&self, zone: &ZoneId, timepoint: &TimepointId) -> BalanceEquation<T> {
        let sum = |terms: &BTreeMap<String, Resolver<T>>| {
            terms
                .values()
                .fold(T::from(0.0), |acc, resolve| acc + resolve(zone, timepoint))
        };
        BalanceEquation {
            zone: zone.clone(),
            timepoint: timepoint.clone(),
            injections: sum(&self.injections),
            withdrawals: sum(&self.withdrawals),
        }
    }
}

/// Σ injections = Σ withdrawals at one node and timepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceEquation<T> {
    pub zone: ZoneId,
    pub timepoint: TimepointId,
    pub injections: T,
    pub withdrawals: T,
}

impl BalanceEquation<f64> {
    pub fn imbalance(&self) -> f64 {
        self.injections - self.withdrawals
    }

    pub fn holds(&self, tolerance: f64) -> bool {
        self.imbalance().abs() <= tolerance
    }
}

impl<T> BalanceEquation<T> {
    /// `<registry>[<zone>,<timepoint>]`
    pub fn constraint_name(&self, registry: &str) -> String {
        format!("{}[{},{}]", registry, self.zone, self.timepoint)
    }
}

impl BalanceEquation<Expression> {
    /// Named equality constraint for the optimization model.
    pub fn into_constraint(self, registry: &str) -> Constraint {
        let name = self.constraint_name(registry);
        constraint::eq(self.injections, self.withdrawals).set_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<ZoneId> {
        vec![ZoneId::new("A"), ZoneId::new("B")]
    }

    fn timepoints() -> Vec<TimepointId> {
        vec![TimepointId::new("t1"), TimepointId::new("t2")]
    }

    #[test]
    fn test_scenario_balance_holds() {
        let mut registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
        registry.register_injection("Gen", |_, _| 10.0).unwrap();
        registry.register_injection("Import", |_, _| 5.0).unwrap();
        registry.register_withdrawal("Load", |_, _| 15.0).unwrap();
        registry.finalize();

        let equations = registry
            .build_balance_constraints(&zones(), &timepoints())
            .unwrap();
        assert_eq!(equations.len(), 4);
        assert!(equations.iter().all(|eq| eq.holds(1e-12)));
        assert_eq!(equations[1].zone.as_str(), "A");
        assert_eq!(equations[1].timepoint.as_str(), "t2");
    }

    #[test]
    fn test_registration_order_irrelevant() {
        let build = |order: &[&str]| {
            let mut registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
            for term in order {
                match *term {
                    "Gen" => registry
                        .register_injection("Gen", |z, _| {
                            if z.as_str() == "A" {
                                10.0
                            } else {
                                1.0
                            }
                        })
                        .unwrap(),
                    "Import" => registry.register_injection("Import", |_, _| 5.0).unwrap(),
                    "Load" => registry.register_withdrawal("Load", |_, _| 15.0).unwrap(),
                    _ => unreachable!(),
                }
            }
            registry.finalize();
            registry
                .build_balance_constraints(&zones(), &timepoints())
                .unwrap()
        };

        let forward = build(&["Gen", "Import", "Load"]);
        let reverse = build(&["Load", "Import", "Gen"]);
        assert_eq!(forward, reverse);
        assert!(forward[0].holds(1e-12));
        assert!(!forward[2].holds(1e-12));
    }

    #[test]
    fn test_register_after_finalize() {
        let mut registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
        registry.finalize();
        let err = registry.register_injection("Late", |_, _| 1.0).unwrap_err();
        assert!(matches!(err, CxpError::Registration(_)));
    }

    #[test]
    fn test_duplicate_term_rejected() {
        let mut registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
        registry.register_injection("X", |_, _| 1.0).unwrap();
        let err = registry.register_withdrawal("X", |_, _| 1.0).unwrap_err();
        assert!(matches!(err, CxpError::Registration(_)));
    }

    #[test]
    fn test_compile_requires_finalize() {
        let registry = BalanceRegistry::<f64>::new("Zone_Energy_Balance");
        let err = registry
            .build_balance_constraints(&zones(), &timepoints())
            .unwrap_err();
        assert!(matches!(err, CxpError::Registration(_)));
    }

    #[test]
    fn test_empty_registry_balances_trivially() {
        let mut registry = BalanceRegistry::<f64>::new("Distributed_Energy_Balance");
        registry.finalize();
        let equations = registry
            .build_balance_constraints(&zones(), &timepoints())
            .unwrap();
        assert!(equations.iter().all(|eq| eq.imbalance() == 0.0));
    }

    #[test]
    fn test_expression_equation_names_constraint() {
        let mut vars = good_lp::variables!();
        let x = vars.add(good_lp::variable().min(0.0));

        let mut registry = BalanceRegistry::<Expression>::new("Zone_Energy_Balance");
        registry
            .register_injection("X", move |_, _| Expression::from(x))
            .unwrap();
        registry
            .register_withdrawal("Load", |_, _| Expression::from(3.0))
            .unwrap();
        registry.finalize();

        let mut equations = registry
            .build_balance_constraints(&[ZoneId::new("A")], &[TimepointId::new("t1")])
            .unwrap();
        let equation = equations.remove(0);
        assert_eq!(
            equation.constraint_name(registry.name()),
            "Zone_Energy_Balance[A,t1]"
        );
        let constraint = equation.into_constraint(registry.name());
        assert!(format!("{:?}", constraint).contains(" = "));
    }
}
