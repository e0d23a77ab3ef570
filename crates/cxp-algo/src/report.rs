//! Post-solve reports.
//!
//! Solved build quantities are read back into an `f64` capacity ledger so the
//! reported capacities follow exactly the accumulation rules used by the
//! model.

use cxp_core::tables::{LocalTdReportRow, ReportValue, TransmissionReportRow};
use cxp_core::{BuildYear, CxpResult, LineId, ModelConfig, ModelInputs, ZoneId};
use good_lp::Solution;

use crate::components::DecisionHandles;
use crate::cost::transmission_annual_cost;
use crate::ledger::CapacityLedger;

/// One row per line and period.
///
/// `BuildTx` is `.` for lines that may not be expanded; `TotalAnnualCost` is
/// the cost charged for the period's incremental build.
pub fn transmission_report<S: Solution>(
    inputs: &ModelInputs,
    config: &ModelConfig,
    handles: &DecisionHandles,
    solution: &S,
) -> CxpResult<Vec<TransmissionReportRow>> {
    let mut ledger = CapacityLedger::<LineId, f64>::new(inputs.periods.clone());
    for line in &inputs.lines {
        let buildable = line.new_build_allowed && inputs.params.allows_new_builds();
        ledger.add_asset(
            line.id.clone(),
            line.existing_capacity.value(),
            line.derating_factor,
            buildable,
        )?;
    }
    for ((line, period), variable) in &handles.build_tx {
        ledger.record_build(line, BuildYear::Period(period.clone()), solution.value(*variable))?;
    }

    let mut rows = Vec::with_capacity(inputs.lines.len() * inputs.periods.len());
    for line in &inputs.lines {
        let unit_cost = transmission_annual_cost(line, &inputs.params, config.interest_rate);
        let buildable = ledger.is_buildable(&line.id)?;
        for period in inputs.periods.ids() {
            let build = ledger.build_in(&line.id, period)?.copied().unwrap_or(0.0);
            rows.push(TransmissionReportRow {
                line: line.id.to_string(),
                period: period.to_string(),
                trans_lz1: line.zone_a.to_string(),
                trans_lz2: line.zone_b.to_string(),
                trans_dbid: line.external_id.clone(),
                trans_length_km: line.length.value(),
                trans_efficiency: line.efficiency,
                trans_derating_factor: line.derating_factor,
                existing_trans_cap: line.existing_capacity.value(),
                build_tx: if buildable {
                    ReportValue::Value(build)
                } else {
                    ReportValue::NotApplicable
                },
                tx_capacity_nameplate: ledger.available_capacity(&line.id, period)?,
                tx_capacity_available: ledger.available_derated_capacity(&line.id, period)?,
                total_annual_cost: build * unit_cost,
            });
        }
    }
    Ok(rows)
}

/// One row per zone and period. Empty when local T&D was not modelled.
pub fn local_td_report<S: Solution>(
    inputs: &ModelInputs,
    handles: &DecisionHandles,
    solution: &S,
) -> CxpResult<Vec<LocalTdReportRow>> {
    if handles.build_local_td.is_empty() {
        return Ok(Vec::new());
    }

    let mut ledger = CapacityLedger::<ZoneId, f64>::new(inputs.periods.clone());
    for zone in &inputs.zones {
        ledger.add_asset(zone.id.clone(), zone.existing_local_td.value(), 1.0, true)?;
    }
    for ((zone, period), variable) in &handles.build_local_td {
        ledger.record_build(zone, BuildYear::Period(period.clone()), solution.value(*variable))?;
    }

    let mut rows = Vec::with_capacity(inputs.zones.len() * inputs.periods.len());
    for zone in &inputs.zones {
        for period in inputs.periods.ids() {
            let capacity: f64 = ledger.available_capacity(&zone.id, period)?;
            rows.push(LocalTdReportRow {
                zone: zone.id.to_string(),
                period: period.to_string(),
                build_local_td: ledger.build_in(&zone.id, period)?.copied().unwrap_or(0.0),
                local_td_capacity: capacity,
                local_td_fixed_costs: capacity * zone.local_td_annual_cost_per_mw,
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxp_core::{
        Kilometers, LoadZone, Megawatts, Period, PeriodId, Timepoint, TransmissionLine,
    };
    use good_lp::{variable, variables, Variable};
    use std::collections::HashMap;

    fn inputs() -> ModelInputs {
        ModelInputs::new(
            vec![
                LoadZone::new("A").with_local_td(Megawatts(10.0), 100.0),
                LoadZone::new("B").with_local_td(Megawatts(0.0), 100.0),
            ],
            vec![TransmissionLine::new("A-B", "A", "B")
                .with_length(Kilometers(100.0))
                .with_existing_capacity(Megawatts(50.0))
                .with_derating(0.9)],
            vec![Period::new("p1", 2020, 2029), Period::new("p2", 2030, 2039)],
            vec![Timepoint::new("t1", "p1", 8760.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_transmission_report_accumulates_builds() {
        let inputs = inputs();
        let mut vars = variables!();
        let b1 = vars.add(variable().min(0.0));
        let b2 = vars.add(variable().min(0.0));

        let mut handles = DecisionHandles::default();
        handles
            .build_tx
            .insert((LineId::new("A-B"), PeriodId::new("p1")), b1);
        handles
            .build_tx
            .insert((LineId::new("A-B"), PeriodId::new("p2")), b2);
        let solution: HashMap<Variable, f64> = [(b1, 10.0), (b2, 5.0)].into_iter().collect();

        let rows =
            transmission_report(&inputs, &ModelConfig::default(), &handles, &solution).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tx_capacity_nameplate, 60.0);
        assert_eq!(rows[1].tx_capacity_nameplate, 65.0);
        assert!((rows[1].tx_capacity_available - 58.5).abs() < 1e-9);
        assert_eq!(rows[0].build_tx, ReportValue::Value(10.0));
        assert!(rows[0].total_annual_cost > rows[1].total_annual_cost);
    }

    #[test]
    fn test_non_buildable_line_reports_sentinel() {
        let mut inputs = inputs();
        inputs.lines[0].new_build_allowed = false;
        let rows = transmission_report(
            &inputs,
            &ModelConfig::default(),
            &DecisionHandles::default(),
            &HashMap::<Variable, f64>::new(),
        )
        .unwrap();
        assert!(rows.iter().all(|r| r.build_tx == ReportValue::NotApplicable));
        assert!(rows.iter().all(|r| r.tx_capacity_nameplate == 50.0));
        assert!(rows.iter().all(|r| r.total_annual_cost == 0.0));
    }

    #[test]
    fn test_local_td_report_charges_total_capacity() {
        let inputs = inputs();
        let mut vars = variables!();
        let build = vars.add(variable().min(0.0));
        let unused = vars.add(variable().min(0.0));

        let mut handles = DecisionHandles::default();
        handles
            .build_local_td
            .insert((ZoneId::new("A"), PeriodId::new("p1")), build);
        handles
            .build_local_td
            .insert((ZoneId::new("B"), PeriodId::new("p2")), unused);
        let solution: HashMap<Variable, f64> = [(build, 5.0), (unused, 0.0)].into_iter().collect();

        let rows = local_td_report(&inputs, &handles, &solution).unwrap();
        assert_eq!(rows.len(), 4);
        let a_p2 = rows
            .iter()
            .find(|r| r.zone == "A" && r.period == "p2")
            .unwrap();
        assert_eq!(a_p2.build_local_td, 0.0);
        assert_eq!(a_p2.local_td_capacity, 15.0);
        assert_eq!(a_p2.local_td_fixed_costs, 1500.0);
    }

    #[test]
    fn test_local_td_report_empty_without_module() {
        let rows = local_td_report(
            &inputs(),
            &DecisionHandles::default(),
            &HashMap::<Variable, f64>::new(),
        )
        .unwrap();
        assert!(rows.is_empty());
    }
}
