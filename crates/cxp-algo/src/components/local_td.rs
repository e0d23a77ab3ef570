//! Local transmission & distribution.
//!
//! Every load zone gets a distributed twin node. Power reaches it only
//! through `WithdrawFromCentralGrid`, a one-directional, lossy pathway:
//!
//! ```text
//! central node ──W──▶ distributed node        inject = W · (1 - loss)
//! ```
//!
//! There is no reverse injection. The pathway is bounded by the zone's local
//! T&D capacity, which follows the capacity ledger and must cover the
//! expected peak demand net of losses in every period. Local T&D is charged
//! on total installed capacity.

use std::collections::{BTreeMap, HashMap};
use std::ops::Mul;

use cxp_core::{BuildYear, CxpResult, PeriodId, TimepointId, ZoneId};
use good_lp::{constraint, variable, Expression};
use tracing::debug;

use super::{indexed_term, BuildContext, ModelComponent};
use crate::cost::capacity_fixed_cost;
use crate::ledger::CapacityLedger;

/// Power arriving at the distributed node for a central withdrawal.
pub fn inject_into_distributed<W, O>(withdrawal: W, loss_rate: f64) -> O
where
    W: Mul<f64, Output = O>,
{
    withdrawal * (1.0 - loss_rate)
}

#[derive(Debug, Default)]
pub struct LocalTd;

impl ModelComponent for LocalTd {
    fn id(&self) -> &str {
        "local_td"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let loss = inputs.params.distribution_loss_rate;
        // Fails early when distributed nodes are disabled.
        ctx.distributed_balance_mut()?;

        let mut ledger = CapacityLedger::new(inputs.periods.clone());
        for zone in &inputs.zones {
            ledger.add_asset(zone.id.clone(), zone.existing_local_td.value(), 1.0, true)?;
            for period in inputs.periods.ids() {
                let build = ctx.variables.add(
                    variable()
                        .min(0.0)
                        .name(format!("BuildLocalTD[{},{}]", zone.id, period)),
                );
                ledger.record_build(&zone.id, BuildYear::Period(period.clone()), build)?;
                ctx.handles
                    .build_local_td
                    .insert((zone.id.clone(), period.clone()), build);
            }
        }

        for zone in &inputs.zones {
            for period in inputs.periods.ids() {
                let capacity: Expression = ledger.available_capacity(&zone.id, period)?;
                let peak = inputs.peak_demand(&zone.id, period);
                ctx.add_constraint(
                    format!("Meet_Local_TD[{},{}]", zone.id, period),
                    constraint!(capacity * (1.0 - loss) >= peak),
                );
            }
        }

        let mut withdrawals: HashMap<(ZoneId, TimepointId), Expression> = HashMap::new();
        let mut injections: HashMap<(ZoneId, TimepointId), Expression> = HashMap::new();
        for zone in &inputs.zones {
            for timepoint in inputs.timescales.ids() {
                let period = inputs.timescales.period_of(timepoint)?;
                let withdraw = ctx.variables.add(
                    variable()
                        .min(0.0)
                        .name(format!("WithdrawFromCentralGrid[{},{}]", zone.id, timepoint)),
                );
                ctx.handles
                    .withdraw_from_central
                    .insert((zone.id.clone(), timepoint.clone()), withdraw);

                let capacity: Expression = ledger.available_derated_capacity(&zone.id, period)?;
                ctx.add_constraint(
                    format!("Maximum_WithdrawFromCentralGrid[{},{}]", zone.id, timepoint),
                    constraint!(withdraw <= capacity),
                );

                let key = (zone.id.clone(), timepoint.clone());
                withdrawals.insert(key.clone(), Expression::from(withdraw));
                injections.insert(key, inject_into_distributed(withdraw, loss));
            }
        }

        ctx.zone_balance
            .register_withdrawal("WithdrawFromCentralGrid", indexed_term(withdrawals))?;
        ctx.distributed_balance_mut()?
            .register_injection("InjectIntoDistributedGrid", indexed_term(injections))?;

        let unit_costs: Vec<_> = inputs
            .zones
            .iter()
            .map(|zone| (&zone.id, zone.local_td_annual_cost_per_mw))
            .collect();
        let mut fixed_costs: BTreeMap<PeriodId, Expression> = BTreeMap::new();
        for period in inputs.periods.ids() {
            let cost: Expression =
                capacity_fixed_cost(&ledger, period, unit_costs.iter().copied())?;
            fixed_costs.insert(period.clone(), cost);
        }
        ctx.costs.add_period_component("LocalTDFixedCosts", fixed_costs)?;

        debug!(
            zones = inputs.zones.len(),
            loss_rate = loss,
            "defined local T&D coupling"
        );
        ctx.local_td_ledger = Some(ledger);
        Ok(())
    }
}
