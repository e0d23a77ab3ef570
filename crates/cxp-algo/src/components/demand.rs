//! Zone demand as a balance withdrawal.
//!
//! With distributed nodes active the demand sits on the distributed node, so
//! it must be served through local T&D; otherwise it is withdrawn directly
//! from the zone.

use std::collections::HashMap;

use cxp_core::CxpResult;
use good_lp::Expression;

use super::{indexed_term, BuildContext, ModelComponent};

#[derive(Debug, Default)]
pub struct ZoneDemand;

impl ModelComponent for ZoneDemand {
    fn id(&self) -> &str {
        "zone_demand"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let mut demand = HashMap::new();
        for zone in inputs.zone_ids() {
            for timepoint in inputs.timescales.ids() {
                let mw = inputs.demand(zone, timepoint);
                if mw != 0.0 {
                    demand.insert((zone.clone(), timepoint.clone()), Expression::from(mw));
                }
            }
        }

        let registry = match ctx.distributed_balance.as_mut() {
            Some(distributed) => distributed,
            None => &mut ctx.zone_balance,
        };
        registry.register_withdrawal("zone_demand_mw", indexed_term(demand))
    }
}
