//! Validation of tabular rows into model inputs.
//!
//! [`ModelInputs::from_tables`] is the single entry point from decoded rows to
//! a model-ready data set. It applies column defaults, rejects invalid or
//! inconsistent data with [`CxpError`], and reports advisory findings through
//! [`Diagnostics`]:
//!
//! | finding                                   | outcome                 |
//! |-------------------------------------------|-------------------------|
//! | efficiency outside [0, 1]                 | `Config` error          |
//! | negative length, capacity or demand       | `Config` error          |
//! | unknown zone, period or timepoint         | `Config` error          |
//! | line flagged as DC                        | `Unsupported` error     |
//! | derating outside [0, 1]                   | `validation` warning    |
//! | terrain multiplier outside [0.5, 3]       | `validation` warning    |
//! | magnitude below `epsilon`                 | floored, `numerical` note |

use std::collections::HashMap;

use tracing::{info, warn};

use crate::tables::{
    LoadZoneRow, LostLoadCostRow, PeakDemandRow, PeriodRow, TimepointRow, TransParamsRow,
    TransmissionLineRow, ZoneDemandRow,
};
use crate::{
    CxpError, CxpResult, Diagnostics, Kilometers, LineId, LoadZone, Megawatts, ModelConfig,
    Period, PeriodId, PeriodOrder, Timepoint, TimepointId, Timescales, Topology,
    TransmissionLine, ZoneId,
};

const DEFAULT_CAPITAL_COST_PER_MW_KM: f64 = 1000.0;
const DEFAULT_LIFETIME_YRS: f64 = 20.0;
const DEFAULT_FIXED_OM_FRACTION: f64 = 0.03;
const DEFAULT_DISTRIBUTION_LOSS_RATE: f64 = 0.053;
const DEFAULT_UNSERVED_LOAD_PENALTY: f64 = 500.0;

const DERATING_RANGE: (f64, f64) = (0.0, 1.0);
const TERRAIN_RANGE: (f64, f64) = (0.5, 3.0);

/// Decoded input tables, one field per table.
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub transmission_lines: Vec<TransmissionLineRow>,
    pub trans_params: Option<TransParamsRow>,
    pub load_zones: Vec<LoadZoneRow>,
    pub lost_load_cost: Option<LostLoadCostRow>,
    pub periods: Vec<PeriodRow>,
    pub timepoints: Vec<TimepointRow>,
    pub zone_demand: Vec<ZoneDemandRow>,
    pub peak_demand: Vec<PeakDemandRow>,
}

/// System-wide transmission and distribution economics.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionParams {
    /// Overnight capital cost ($/MW/km); infinite disables new builds
    pub capital_cost_per_mw_km: f64,
    pub lifetime_yrs: f64,
    /// Annual fixed O&M as a fraction of capital cost
    pub fixed_om_fraction: f64,
    /// Fraction of power lost between the central and distributed node
    pub distribution_loss_rate: f64,
}

impl Default for TransmissionParams {
    fn default() -> Self {
        Self {
            capital_cost_per_mw_km: DEFAULT_CAPITAL_COST_PER_MW_KM,
            lifetime_yrs: DEFAULT_LIFETIME_YRS,
            fixed_om_fraction: DEFAULT_FIXED_OM_FRACTION,
            distribution_loss_rate: DEFAULT_DISTRIBUTION_LOSS_RATE,
        }
    }
}

impl TransmissionParams {
    /// An infinite capital cost means no new transmission may be built.
    pub fn allows_new_builds(&self) -> bool {
        self.capital_cost_per_mw_km.is_finite()
    }

    fn validate(&self) -> CxpResult<()> {
        if self.capital_cost_per_mw_km.is_nan() || self.capital_cost_per_mw_km < 0.0 {
            return Err(CxpError::Config(format!(
                "trans_capital_cost_per_mw_km must be non-negative, got {}",
                self.capital_cost_per_mw_km
            )));
        }
        if !(self.lifetime_yrs > 0.0 && self.lifetime_yrs.is_finite()) {
            return Err(CxpError::Config(format!(
                "trans_lifetime_yrs must be positive, got {}",
                self.lifetime_yrs
            )));
        }
        if !(self.fixed_om_fraction >= 0.0 && self.fixed_om_fraction.is_finite()) {
            return Err(CxpError::Config(format!(
                "trans_fixed_om_fraction must be non-negative, got {}",
                self.fixed_om_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.distribution_loss_rate) {
            return Err(CxpError::Config(format!(
                "distribution_loss_rate must lie in [0, 1), got {}",
                self.distribution_loss_rate
            )));
        }
        Ok(())
    }
}

/// Validated, model-ready inputs.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub zones: Vec<LoadZone>,
    pub lines: Vec<TransmissionLine>,
    pub params: TransmissionParams,
    /// $/MWh charged for unserved load
    pub unserved_load_penalty: f64,
    pub periods: PeriodOrder,
    pub timescales: Timescales,
    demand: HashMap<(ZoneId, TimepointId), f64>,
    peak_demand: HashMap<(ZoneId, PeriodId), f64>,
}

impl ModelInputs {
    /// Assemble inputs from already-typed records.
    ///
    /// Lines and zones are checked for domain errors and the line set must
    /// load into a [`Topology`]. Demand and peak demand can be attached
    /// afterwards with [`ModelInputs::with_demand`] and
    /// [`ModelInputs::with_peak_demand`].
    pub fn new(
        zones: Vec<LoadZone>,
        lines: Vec<TransmissionLine>,
        periods: Vec<Period>,
        timepoints: Vec<Timepoint>,
    ) -> CxpResult<Self> {
        for zone in &zones {
            check_non_negative(zone.existing_local_td.value(), "existing_local_td", &zone.id)?;
            check_non_negative(
                zone.local_td_annual_cost_per_mw,
                "local_td_annual_cost_per_mw",
                &zone.id,
            )?;
        }
        for line in &lines {
            validate_line(line)?;
        }
        Topology::build(&zones, &lines)?;

        let periods = PeriodOrder::new(periods)?;
        let timescales = Timescales::new(&periods, timepoints)?;

        Ok(Self {
            zones,
            lines,
            params: TransmissionParams::default(),
            unserved_load_penalty: DEFAULT_UNSERVED_LOAD_PENALTY,
            periods,
            timescales,
            demand: HashMap::new(),
            peak_demand: HashMap::new(),
        })
    }

    pub fn with_params(mut self, params: TransmissionParams) -> CxpResult<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn with_unserved_load_penalty(mut self, penalty: f64) -> CxpResult<Self> {
        if !(penalty >= 0.0) {
            return Err(CxpError::Config(format!(
                "unserved_load_penalty must be non-negative, got {penalty}"
            )));
        }
        self.unserved_load_penalty = penalty;
        Ok(self)
    }

    /// Set the demand of `zone` at `timepoint`.
    pub fn with_demand(
        mut self,
        zone: impl Into<String>,
        timepoint: impl Into<String>,
        mw: f64,
    ) -> CxpResult<Self> {
        let zone = ZoneId::new(zone);
        let timepoint = TimepointId::new(timepoint);
        self.check_zone(&zone)?;
        self.timescales
            .period_of(&timepoint)
            .map_err(|_| {
                CxpError::Config(format!("demand references unknown timepoint {timepoint}"))
            })?;
        check_non_negative(mw, "zone_demand_mw", &zone)?;
        self.demand.insert((zone, timepoint), mw);
        Ok(self)
    }

    /// Set the expected peak demand of `zone` in `period`.
    pub fn with_peak_demand(
        mut self,
        zone: impl Into<String>,
        period: impl Into<String>,
        mw: f64,
    ) -> CxpResult<Self> {
        let zone = ZoneId::new(zone);
        let period = PeriodId::new(period);
        self.check_zone(&zone)?;
        if !self.periods.contains(&period) {
            return Err(CxpError::Config(format!(
                "peak demand references unknown period {period}"
            )));
        }
        check_non_negative(mw, "zone_expected_coincident_peak_demand", &zone)?;
        self.peak_demand.insert((zone, period), mw);
        Ok(self)
    }

    /// Validate decoded rows against the configuration.
    pub fn from_tables(
        tables: &InputTables,
        config: &ModelConfig,
    ) -> CxpResult<(Self, Diagnostics)> {
        config.validate()?;
        let mut diagnostics = Diagnostics::new();
        let mut floored = 0usize;
        let mut floor = |value: f64| {
            let (value, hit) = config.floor(value);
            floored += usize::from(hit);
            value
        };

        let mut zones = Vec::with_capacity(tables.load_zones.len());
        for row in &tables.load_zones {
            let mut zone = LoadZone::new(row.zone.as_str());
            if config.modules.local_td {
                let existing = row
                    .existing_local_td
                    .ok_or_else(|| missing(&row.zone, "existing_local_td"))?;
                let cost = row
                    .local_td_annual_cost_per_mw
                    .ok_or_else(|| missing(&row.zone, "local_td_annual_cost_per_mw"))?;
                zone = zone.with_local_td(Megawatts(floor(existing)), cost);
            }
            zones.push(zone);
        }

        let mut lines = Vec::with_capacity(tables.transmission_lines.len());
        for (idx, row) in tables.transmission_lines.iter().enumerate() {
            let row_number = idx + 1;
            if row.is_dc_line == Some(true) {
                warn!(line = %row.line, "DC transmission lines are not supported");
                return Err(CxpError::Unsupported(format!(
                    "transmission line {} is flagged as a DC line",
                    row.line
                )));
            }

            let mut line = TransmissionLine::new(
                row.line.as_str(),
                row.trans_lz1.as_str(),
                row.trans_lz2.as_str(),
            )
                .with_length(Kilometers(row.trans_length_km))
                .with_efficiency(row.trans_efficiency)
                .with_existing_capacity(Megawatts(floor(row.existing_trans_cap)))
                .with_derating(row.trans_derating_factor.unwrap_or(1.0))
                .with_terrain(row.trans_terrain_multiplier.unwrap_or(1.0))
                .with_new_build_allowed(row.trans_new_build_allowed.unwrap_or(true));
            if let Some(dbid) = &row.trans_dbid {
                line.external_id = dbid.clone();
            }

            let entity = format!("line {}", line.id);
            if !in_range(line.derating_factor, DERATING_RANGE) {
                let message = format!(
                    "derating factor {} outside advisory range [{}, {}]",
                    line.derating_factor, DERATING_RANGE.0, DERATING_RANGE.1
                );
                warn!(line = %line.id, "{}", message);
                diagnostics.add_validation_warning(&entity, &message, row_number);
            }
            if !in_range(line.terrain_multiplier, TERRAIN_RANGE) {
                let message = format!(
                    "terrain multiplier {} outside advisory range [{}, {}]",
                    line.terrain_multiplier, TERRAIN_RANGE.0, TERRAIN_RANGE.1
                );
                warn!(line = %line.id, "{}", message);
                diagnostics.add_validation_warning(&entity, &message, row_number);
            }
            lines.push(line);
        }

        let params = match &tables.trans_params {
            Some(row) => TransmissionParams {
                capital_cost_per_mw_km: row
                    .trans_capital_cost_per_mw_km
                    .unwrap_or(DEFAULT_CAPITAL_COST_PER_MW_KM),
                lifetime_yrs: row.trans_lifetime_yrs.unwrap_or(DEFAULT_LIFETIME_YRS),
                fixed_om_fraction: row
                    .trans_fixed_om_fraction
                    .unwrap_or(DEFAULT_FIXED_OM_FRACTION),
                distribution_loss_rate: row
                    .distribution_loss_rate
                    .unwrap_or(DEFAULT_DISTRIBUTION_LOSS_RATE),
            },
            None => TransmissionParams::default(),
        };
        let penalty = tables
            .lost_load_cost
            .as_ref()
            .and_then(|row| row.unserved_load_penalty)
            .unwrap_or(DEFAULT_UNSERVED_LOAD_PENALTY);

        let periods = tables
            .periods
            .iter()
            .map(|row| Period::new(row.period.as_str(), row.period_start, row.period_end))
            .collect();
        let timepoints = tables
            .timepoints
            .iter()
            .map(|row| {
                Timepoint::new(
                    row.timepoint_id.as_str(),
                    row.tp_period.as_str(),
                    row.tp_weight_in_year,
                )
            })
            .collect();

        let mut inputs = ModelInputs::new(zones, lines, periods, timepoints)?
            .with_params(params)?
            .with_unserved_load_penalty(penalty)?;

        for row in &tables.zone_demand {
            inputs = inputs.with_demand(
                row.zone.as_str(),
                row.timepoint.as_str(),
                floor(row.zone_demand_mw),
            )?;
        }
        for row in &tables.peak_demand {
            inputs = inputs.with_peak_demand(
                row.zone.as_str(),
                row.period.as_str(),
                floor(row.zone_expected_coincident_peak_demand),
            )?;
        }

        if floored > 0 {
            diagnostics.add_info(
                "numerical",
                &format!(
                    "floored {} value{} below epsilon {} to zero",
                    floored,
                    if floored == 1 { "" } else { "s" },
                    config.epsilon
                ),
            );
        }

        info!(
            zones = inputs.zones.len(),
            lines = inputs.lines.len(),
            periods = inputs.periods.len(),
            timepoints = inputs.timescales.timepoints().len(),
            diagnostics = %diagnostics.summary(),
            "validated model inputs"
        );

        Ok((inputs, diagnostics))
    }

    pub fn zone_ids(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.iter().map(|z| &z.id)
    }

    pub fn zone(&self, id: &ZoneId) -> CxpResult<&LoadZone> {
        self.zones
            .iter()
            .find(|z| &z.id == id)
            .ok_or_else(|| CxpError::Lookup(format!("unknown load zone {id}")))
    }

    pub fn line(&self, id: &LineId) -> CxpResult<&TransmissionLine> {
        self.lines
            .iter()
            .find(|l| &l.id == id)
            .ok_or_else(|| CxpError::Lookup(format!("unknown transmission line {id}")))
    }

    /// Demand of `zone` at `timepoint`; zero when not given.
    pub fn demand(&self, zone: &ZoneId, timepoint: &TimepointId) -> f64 {
        self.demand
            .get(&(zone.clone(), timepoint.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Expected peak demand of `zone` in `period`: the given value, or the
    /// largest demand over the period's timepoints when none was given.
    pub fn peak_demand(&self, zone: &ZoneId, period: &PeriodId) -> f64 {
        if let Some(peak) = self.peak_demand.get(&(zone.clone(), period.clone())) {
            return *peak;
        }
        self.timescales
            .timepoints_in(period)
            .iter()
            .map(|tp| self.demand(zone, tp))
            .fold(0.0, f64::max)
    }

    fn check_zone(&self, zone: &ZoneId) -> CxpResult<()> {
        if self.zones.iter().any(|z| &z.id == zone) {
            Ok(())
        } else {
            Err(CxpError::Config(format!("reference to unknown load zone {zone}")))
        }
    }
}

fn validate_line(line: &TransmissionLine) -> CxpResult<()> {
    if !(0.0..=1.0).contains(&line.efficiency) {
        return Err(CxpError::Config(format!(
            "transmission line {} has efficiency {} outside [0, 1]",
            line.id, line.efficiency
        )));
    }
    if !(line.length.value() >= 0.0) || !line.length.is_finite() {
        return Err(CxpError::Config(format!(
            "transmission line {} has invalid length {}",
            line.id, line.length
        )));
    }
    if !(line.existing_capacity.value() >= 0.0) || !line.existing_capacity.is_finite() {
        return Err(CxpError::Config(format!(
            "transmission line {} has invalid existing capacity {}",
            line.id, line.existing_capacity
        )));
    }
    if !line.derating_factor.is_finite() || !line.terrain_multiplier.is_finite() {
        return Err(CxpError::Config(format!(
            "transmission line {} has a non-finite derating or terrain factor",
            line.id
        )));
    }
    Ok(())
}

fn check_non_negative(value: f64, column: &str, zone: &ZoneId) -> CxpResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CxpError::Config(format!(
            "{column} for load zone {zone} must be a non-negative number, got {value}"
        )))
    }
}

fn missing(entity: &str, column: &str) -> CxpError {
    CxpError::Config(format!("load zone {entity} is missing mandatory value {column}"))
}

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}
