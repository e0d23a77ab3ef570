//! Unserved load slack.
//!
//! `UnservedLoad[zone, timepoint] >= 0` is injected into the zone balance and
//! priced at the lost-load penalty through the per-timepoint cost
//! `UnservedLoadPenalty`.

use std::collections::{BTreeMap, HashMap};

use cxp_core::{CxpResult, TimepointId};
use good_lp::{variable, Expression};

use super::{indexed_term, BuildContext, ModelComponent};

#[derive(Debug, Default)]
pub struct UnservedLoad;

impl ModelComponent for UnservedLoad {
    fn id(&self) -> &str {
        "unserved_load"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let penalty = inputs.unserved_load_penalty;

        let mut injections = HashMap::new();
        let mut penalties: BTreeMap<TimepointId, Expression> = BTreeMap::new();
        for zone in inputs.zone_ids() {
            for timepoint in inputs.timescales.ids() {
                let unserved = ctx.variables.add(
                    variable()
                        .min(0.0)
                        .name(format!("UnservedLoad[{},{}]", zone, timepoint)),
                );
                ctx.handles
                    .unserved_load
                    .insert((zone.clone(), timepoint.clone()), unserved);
                injections.insert((zone.clone(), timepoint.clone()), Expression::from(unserved));
                *penalties.entry(timepoint.clone()).or_default() += unserved * penalty;
            }
        }

        ctx.zone_balance
            .register_injection("UnservedLoad", indexed_term(injections))?;
        ctx.costs
            .add_timepoint_component("UnservedLoadPenalty", penalties)
    }
}
