//! Transmission capacity expansion.
//!
//! Declares `BuildTx[line, period] >= 0` for every line that may be expanded,
//! records the builds in the transmission ledger and charges
//! `TxFixedCosts[period]` on the incremental builds of each period.

use std::collections::BTreeMap;

use cxp_core::{BuildYear, CxpResult, PeriodId};
use good_lp::{variable, Expression};
use tracing::debug;

use super::{BuildContext, ModelComponent};
use crate::cost::{incremental_fixed_cost, transmission_annual_cost};
use crate::ledger::CapacityLedger;

#[derive(Debug, Default)]
pub struct TransmissionBuild;

impl ModelComponent for TransmissionBuild {
    fn id(&self) -> &str {
        "transmission_build"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let params = &inputs.params;
        let mut ledger = CapacityLedger::new(inputs.periods.clone());

        for line in &inputs.lines {
            let buildable = line.new_build_allowed && params.allows_new_builds();
            ledger.add_asset(
                line.id.clone(),
                line.existing_capacity.value(),
                line.derating_factor,
                buildable,
            )?;
            if !buildable {
                continue;
            }
            for period in inputs.periods.ids() {
                let build = ctx
                    .variables
                    .add(variable().min(0.0).name(format!("BuildTx[{},{}]", line.id, period)));
                ledger.record_build(&line.id, BuildYear::Period(period.clone()), build)?;
                ctx.handles
                    .build_tx
                    .insert((line.id.clone(), period.clone()), build);
            }
        }

        let unit_costs: Vec<_> = inputs
            .lines
            .iter()
            .map(|line| {
                (
                    &line.id,
                    transmission_annual_cost(line, params, ctx.config.interest_rate),
                )
            })
            .collect();

        let mut fixed_costs: BTreeMap<PeriodId, Expression> = BTreeMap::new();
        for period in inputs.periods.ids() {
            let cost: Expression =
                incremental_fixed_cost(&ledger, period, unit_costs.iter().copied())?;
            fixed_costs.insert(period.clone(), cost);
        }
        ctx.costs.add_period_component("TxFixedCosts", fixed_costs)?;

        debug!(
            lines = inputs.lines.len(),
            build_variables = ctx.handles.build_tx.len(),
            "defined transmission builds"
        );
        ctx.tx_ledger = Some(ledger);
        Ok(())
    }
}
