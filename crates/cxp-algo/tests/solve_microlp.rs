//! End-to-end solves with the bundled microlp backend.
//!
//! Two zones joined by one lossy line. Supply exists only in zone A (a
//! plug-in component priced per MWh), demand only in zone B, so every
//! delivered MW has to cross the line and, with local T&D active, the
//! zone's distribution pathway.

#![cfg(feature = "solver-microlp")]

use std::collections::BTreeMap;

use cxp_algo::components::{BuildContext, ModelComponent};
use cxp_algo::cost::transmission_annual_cost;
use cxp_algo::model::ModelBuilder;
use cxp_core::tables::ReportValue;
use cxp_core::{
    CxpResult, DirectionalPair, Kilometers, LineId, LoadZone, Megawatts, ModelConfig, ModelInputs,
    Period, PeriodId, Timepoint, TimepointId, TransmissionLine, TransmissionParams, ZoneId,
};
use good_lp::{variable, Expression};

const TOL: f64 = 1e-6;
const SUPPLY_PRICE: f64 = 20.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn two_zone_inputs(demand_b: f64) -> ModelInputs {
    ModelInputs::new(
        vec![
            LoadZone::new("A").with_local_td(Megawatts(0.0), 10.0),
            LoadZone::new("B").with_local_td(Megawatts(5.0), 10.0),
        ],
        vec![TransmissionLine::new("A-B", "A", "B")
            .with_length(Kilometers(100.0))
            .with_efficiency(0.9)
            .with_existing_capacity(Megawatts(10.0))],
        vec![Period::new("p1", 2020, 2029)],
        vec![Timepoint::new("t1", "p1", 8760.0)],
    )
    .unwrap()
    .with_demand("B", "t1", demand_b)
    .unwrap()
}

/// Unlimited supply in one zone at a flat price.
struct FlatSupply {
    zone: &'static str,
}

impl ModelComponent for FlatSupply {
    fn id(&self) -> &str {
        "flat_supply"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let mut supply = BTreeMap::new();
        for timepoint in inputs.timescales.ids() {
            let var = ctx
                .variables
                .add(variable().min(0.0).name(format!("Supply[{},{}]", self.zone, timepoint)));
            supply.insert(timepoint.clone(), var);
        }

        let costs: BTreeMap<TimepointId, Expression> = supply
            .iter()
            .map(|(tp, var)| (tp.clone(), *var * SUPPLY_PRICE))
            .collect();
        let zone = self.zone;
        ctx.zone_balance.register_injection("Supply", move |z, t| {
            match supply.get(t) {
                Some(var) if z.as_str() == zone => Expression::from(*var),
                _ => Expression::from(0.0),
            }
        })?;
        ctx.costs.add_timepoint_component("SupplyCost", costs)
    }
}

fn key_tx() -> (LineId, PeriodId) {
    (LineId::new("A-B"), PeriodId::new("p1"))
}

fn key_dispatch(from: &str, to: &str) -> (DirectionalPair, TimepointId) {
    (
        DirectionalPair {
            from: ZoneId::new(from),
            to: ZoneId::new(to),
        },
        TimepointId::new("t1"),
    )
}

#[test]
fn test_transmission_expansion_serves_remote_demand() {
    init_tracing();
    let inputs = two_zone_inputs(27.0);
    let mut config = ModelConfig::default();
    config.modules.local_td = false;

    let solved = ModelBuilder::new(&inputs, &config)
        .with_component(Box::new(FlatSupply { zone: "A" }))
        .build()
        .unwrap()
        .solve()
        .unwrap();
    let handles = solved.handles();

    // 27 MW delivered at 90% efficiency needs 30 MW sent; 10 MW exists.
    let dispatch = solved.value(handles.dispatch_tx[&key_dispatch("A", "B")]);
    let reverse = solved.value(handles.dispatch_tx[&key_dispatch("B", "A")]);
    let build = solved.value(handles.build_tx[&key_tx()]);
    let unserved = solved.value(handles.unserved_load[&(ZoneId::new("B"), TimepointId::new("t1"))]);
    assert!((dispatch - 30.0).abs() < TOL, "dispatch A->B was {dispatch}");
    assert!(reverse.abs() < TOL, "dispatch B->A was {reverse}");
    assert!((build - 20.0).abs() < TOL, "BuildTx was {build}");
    assert!(unserved.abs() < TOL, "unserved load was {unserved}");

    // Zone balance at B: received = demand
    assert!((dispatch * 0.9 + unserved - 27.0).abs() < TOL);

    let supplied = solved
        .timepoint_cost("SupplyCost", &TimepointId::new("t1"))
        .unwrap()
        / SUPPLY_PRICE;
    assert!((supplied - 30.0).abs() < TOL, "supply was {supplied}");

    let unit_cost =
        transmission_annual_cost(&inputs.lines[0], &inputs.params, config.interest_rate);
    let expected = 10.0 * 20.0 * unit_cost + 8760.0 * SUPPLY_PRICE * 30.0;
    assert!(
        (solved.objective_value() - expected).abs() / expected < 1e-6,
        "objective {} vs expected {}",
        solved.objective_value(),
        expected
    );

    let tx_cost = solved
        .period_cost("TxFixedCosts", &PeriodId::new("p1"))
        .unwrap();
    assert!((tx_cost - 20.0 * unit_cost).abs() < 1e-4);

    let rows = solved.transmission_report(&inputs, &config).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(matches!(row.build_tx, ReportValue::Value(v) if (v - 20.0).abs() < TOL));
    assert!((row.tx_capacity_nameplate - 30.0).abs() < TOL);
    assert!((row.tx_capacity_available - 30.0).abs() < TOL);
    assert!((row.total_annual_cost - tx_cost).abs() < 1e-4);

    assert!(solved.local_td_report(&inputs).unwrap().is_empty());
}

#[test]
fn test_local_td_sized_for_peak_net_of_losses() {
    init_tracing();
    let inputs = two_zone_inputs(19.0)
        .with_params(TransmissionParams {
            distribution_loss_rate: 0.05,
            ..TransmissionParams::default()
        })
        .unwrap();
    let config = ModelConfig::default();

    let model = ModelBuilder::new(&inputs, &config)
        .with_component(Box::new(FlatSupply { zone: "A" }))
        .build()
        .unwrap();
    assert!(model.has_constraint("Meet_Local_TD[B,p1]"));
    let solved = model.solve().unwrap();
    let handles = solved.handles();

    let zone_b = ZoneId::new("B");
    let t1 = TimepointId::new("t1");
    let p1 = PeriodId::new("p1");

    // 19 MW peak at 5% loss needs 20 MW of local T&D; 5 MW exists.
    let build_b = solved.value(handles.build_local_td[&(zone_b.clone(), p1.clone())]);
    let build_a = solved.value(handles.build_local_td[&(ZoneId::new("A"), p1.clone())]);
    assert!((build_b - 15.0).abs() < TOL, "BuildLocalTD[B] was {build_b}");
    assert!(build_a.abs() < TOL, "BuildLocalTD[A] was {build_a}");

    let withdraw = solved.value(handles.withdraw_from_central[&(zone_b.clone(), t1.clone())]);
    assert!((withdraw - 20.0).abs() < TOL, "withdrawal was {withdraw}");

    // The central node at B must import the full withdrawal over the line.
    let dispatch = solved.value(handles.dispatch_tx[&key_dispatch("A", "B")]);
    assert!((dispatch * 0.9 - 20.0).abs() < TOL, "dispatch was {dispatch}");
    let build_tx = solved.value(handles.build_tx[&key_tx()]);
    assert!((build_tx - (20.0 / 0.9 - 10.0)).abs() < TOL);

    let local_cost = solved.period_cost("LocalTDFixedCosts", &p1).unwrap();
    assert!((local_cost - 200.0).abs() < 1e-4, "local T&D cost was {local_cost}");

    let rows = solved.local_td_report(&inputs).unwrap();
    let row_b = rows.iter().find(|r| r.zone == "B").unwrap();
    assert!((row_b.build_local_td - 15.0).abs() < TOL);
    assert!((row_b.local_td_capacity - 20.0).abs() < TOL);
    assert!((row_b.local_td_fixed_costs - 200.0).abs() < 1e-4);
}

#[test]
fn test_unserved_load_covers_isolated_demand() {
    init_tracing();
    let inputs = two_zone_inputs(27.0);
    let mut config = ModelConfig::default();
    config.modules.local_td = false;

    let solved = ModelBuilder::new(&inputs, &config)
        .build()
        .unwrap()
        .solve()
        .unwrap();

    let unserved = solved.value(
        solved.handles().unserved_load[&(ZoneId::new("B"), TimepointId::new("t1"))],
    );
    assert!((unserved - 27.0).abs() < TOL, "unserved load was {unserved}");

    let expected = 8760.0 * inputs.unserved_load_penalty * 27.0;
    assert!((solved.objective_value() - expected).abs() / expected < 1e-6);
}

/// Fixed surplus at zone A's distributed node with free curtailment, plus a
/// central load at A that only the distributed surplus could cover.
struct DistributedSurplus {
    surplus: f64,
}

impl ModelComponent for DistributedSurplus {
    fn id(&self) -> &str {
        "distributed_surplus"
    }

    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
        let inputs = ctx.inputs;
        let mut curtail = BTreeMap::new();
        for zone in inputs.zone_ids() {
            for timepoint in inputs.timescales.ids() {
                let var = ctx
                    .variables
                    .add(variable().min(0.0).name(format!("Curtail[{},{}]", zone, timepoint)));
                curtail.insert((zone.clone(), timepoint.clone()), var);
            }
        }

        let surplus = self.surplus;
        let distributed = ctx.distributed_balance_mut()?;
        distributed.register_injection("DistributedSurplus", move |z, _| {
            Expression::from(if z.as_str() == "A" { surplus } else { 0.0 })
        })?;
        distributed.register_withdrawal("Curtailment", move |z, t| {
            match curtail.get(&(z.clone(), t.clone())) {
                Some(var) => Expression::from(*var),
                None => Expression::from(0.0),
            }
        })?;
        ctx.zone_balance.register_withdrawal("CentralLoad", move |z, _| {
            Expression::from(if z.as_str() == "A" { surplus } else { 0.0 })
        })
    }
}

#[test]
fn test_distributed_surplus_never_flows_back_to_central_node() {
    init_tracing();
    let inputs = two_zone_inputs(0.0)
        .with_params(TransmissionParams {
            distribution_loss_rate: 0.0,
            ..TransmissionParams::default()
        })
        .unwrap();
    let config = ModelConfig::default();

    let model = ModelBuilder::new(&inputs, &config)
        .with_component(Box::new(DistributedSurplus { surplus: 10.0 }))
        .build()
        .unwrap();
    assert!(model.has_constraint("Distributed_Energy_Balance[A,t1]"));
    let solved = model.solve().unwrap();
    let handles = solved.handles();

    let key = (ZoneId::new("A"), TimepointId::new("t1"));
    let withdraw = solved.value(handles.withdraw_from_central[&key]);
    let unserved = solved.value(handles.unserved_load[&key]);
    assert!(withdraw.abs() < TOL, "withdrawal was {withdraw}");
    assert!((unserved - 10.0).abs() < TOL, "unserved load was {unserved}");

    let penalty = solved
        .timepoint_cost("UnservedLoadPenalty", &TimepointId::new("t1"))
        .unwrap();
    assert!((penalty - inputs.unserved_load_penalty * 10.0).abs() < 1e-4);
}
