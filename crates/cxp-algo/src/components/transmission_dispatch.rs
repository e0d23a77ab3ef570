//! Transmission dispatch.
//!
//! Every directional pair carries a non-negative flow per timepoint, bounded
//! by the derated capacity of its line in the timepoint's period. The sending
//! zone withdraws the full flow (`TxPowerSent`); the receiving zone is
//! credited the flow times the line efficiency (`TxPowerReceived`), so losses
//! are always paid and no power is created in transit.

use std::collections::HashMap;

use cxp_core::{CxpError, CxpResult, DirectionalPair, TimepointId, ZoneId};
use good_lp::{constraint, variable, Expression};
use tracing::debug;

use super::{indexed_term, BuildContext, ModelComponent};

#[derive(Debug, Default)]
pub struct TransmissionDispatch;

impl ModelComponent for TransmissionDispatch {
    fn id(&self) -> &str {
        "transmission_dispatch"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let topology = ctx.topology;

        for pair in topology.directional_pairs() {
            let line = inputs.line(topology.line_for_pair(pair)?)?;
            for timepoint in inputs.timescales.ids() {
                let period = inputs.timescales.period_of(timepoint)?;
                let dispatch = ctx.variables.add(
                    variable()
                        .min(0.0)
                        .name(format!("DispatchTx[{},{},{}]", pair.from, pair.to, timepoint)),
                );
                ctx.handles
                    .dispatch_tx
                    .insert((pair.clone(), timepoint.clone()), dispatch);

                let capacity: Expression = ctx
                    .tx_ledger()?
                    .available_derated_capacity(&line.id, period)?;
                ctx.add_constraint(
                    format!("Maximum_DispatchTx[{},{},{}]", pair.from, pair.to, timepoint),
                    constraint!(dispatch <= capacity),
                );
            }
        }

        let handles = &ctx.handles;
        let dispatch_of = |pair: &DirectionalPair, timepoint: &TimepointId| {
            handles
                .dispatch_tx
                .get(&(pair.clone(), timepoint.clone()))
                .copied()
                .ok_or_else(|| {
                    CxpError::Lookup(format!("no dispatch variable for {} at {}", pair, timepoint))
                })
        };

        let mut sent: HashMap<(ZoneId, TimepointId), Expression> = HashMap::new();
        let mut received: HashMap<(ZoneId, TimepointId), Expression> = HashMap::new();
        for zone in inputs.zone_ids() {
            for timepoint in inputs.timescales.ids() {
                let mut outgoing = Expression::default();
                for pair in topology.pairs_from(zone) {
                    outgoing += dispatch_of(pair, timepoint)?;
                }
                let mut incoming = Expression::default();
                for pair in topology.pairs_into(zone) {
                    let line = inputs.line(topology.line_for_pair(pair)?)?;
                    incoming += dispatch_of(pair, timepoint)? * line.efficiency;
                }
                sent.insert((zone.clone(), timepoint.clone()), outgoing);
                received.insert((zone.clone(), timepoint.clone()), incoming);
            }
        }

        ctx.zone_balance
            .register_withdrawal("TxPowerSent", indexed_term(sent))?;
        ctx.zone_balance
            .register_injection("TxPowerReceived", indexed_term(received))?;

        debug!(
            directional_pairs = topology.directional_pairs().len(),
            dispatch_variables = ctx.handles.dispatch_tx.len(),
            "defined transmission dispatch"
        );
        Ok(())
    }
}
