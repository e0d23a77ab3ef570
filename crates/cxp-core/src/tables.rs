//! Tabular row contracts.
//!
//! Input rows are what an ETL layer decodes from its tables; this crate does
//! no file I/O. Column names follow the established input-directory
//! conventions (`TRANSMISSION_LINE`, `trans_lz1`, ...). In optional columns a
//! `.` cell means "use the default", exactly like an empty one.
//!
//! Output rows are `Serialize` so callers can write them with any serde
//! backend.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One row of `transmission_lines`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransmissionLineRow {
    #[serde(rename = "TRANSMISSION_LINE")]
    pub line: String,
    pub trans_lz1: String,
    pub trans_lz2: String,
    pub trans_length_km: f64,
    pub trans_efficiency: f64,
    pub existing_trans_cap: f64,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_dbid: Option<String>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_derating_factor: Option<f64>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_terrain_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub trans_new_build_allowed: Option<bool>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_dc_line: Option<bool>,
}

/// The single row of `trans_params`. Every column is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransParamsRow {
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_capital_cost_per_mw_km: Option<f64>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_lifetime_yrs: Option<f64>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub trans_fixed_om_fraction: Option<f64>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub distribution_loss_rate: Option<f64>,
}

/// One row of `load_zones`. The local T&D columns are mandatory only when
/// the local T&D component is active.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadZoneRow {
    #[serde(rename = "LOAD_ZONE")]
    pub zone: String,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub existing_local_td: Option<f64>,
    #[serde(default, deserialize_with = "dot_as_none")]
    pub local_td_annual_cost_per_mw: Option<f64>,
}

/// The single row of `lost_load_cost`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LostLoadCostRow {
    #[serde(default, deserialize_with = "dot_as_none")]
    pub unserved_load_penalty: Option<f64>,
}

/// One row of `periods`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeriodRow {
    #[serde(rename = "INVESTMENT_PERIOD")]
    pub period: String,
    pub period_start: i32,
    pub period_end: i32,
}

/// One row of `timepoints`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimepointRow {
    pub timepoint_id: String,
    pub tp_period: String,
    /// Hours per year represented by the timepoint
    pub tp_weight_in_year: f64,
}

/// One row of `loads`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneDemandRow {
    #[serde(rename = "LOAD_ZONE")]
    pub zone: String,
    #[serde(rename = "TIMEPOINT")]
    pub timepoint: String,
    pub zone_demand_mw: f64,
}

/// One row of `zone_coincident_peak_demand`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeakDemandRow {
    #[serde(rename = "LOAD_ZONE")]
    pub zone: String,
    #[serde(rename = "PERIOD")]
    pub period: String,
    pub zone_expected_coincident_peak_demand: f64,
}

/// A reported quantity that may not apply to a row. Serializes as the number
/// or as the `.` sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportValue {
    Value(f64),
    NotApplicable,
}

impl ReportValue {
    pub fn value(self) -> Option<f64> {
        match self {
            ReportValue::Value(v) => Some(v),
            ReportValue::NotApplicable => None,
        }
    }
}

impl Serialize for ReportValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReportValue::Value(v) => serializer.serialize_f64(*v),
            ReportValue::NotApplicable => serializer.serialize_str("."),
        }
    }
}

/// One row of the transmission report, per line and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmissionReportRow {
    #[serde(rename = "TRANSMISSION_LINE")]
    pub line: String,
    #[serde(rename = "PERIOD")]
    pub period: String,
    pub trans_lz1: String,
    pub trans_lz2: String,
    pub trans_dbid: String,
    pub trans_length_km: f64,
    pub trans_efficiency: f64,
    pub trans_derating_factor: f64,
    pub existing_trans_cap: f64,
    #[serde(rename = "BuildTx")]
    pub build_tx: ReportValue,
    #[serde(rename = "TxCapacityNameplate")]
    pub tx_capacity_nameplate: f64,
    #[serde(rename = "TxCapacityNameplateAvailable")]
    pub tx_capacity_available: f64,
    #[serde(rename = "TotalAnnualCost")]
    pub total_annual_cost: f64,
}

/// One row of the local T&D report, per zone and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalTdReportRow {
    #[serde(rename = "LOAD_ZONE")]
    pub zone: String,
    #[serde(rename = "PERIOD")]
    pub period: String,
    #[serde(rename = "BuildLocalTD")]
    pub build_local_td: f64,
    #[serde(rename = "LocalTDCapacity")]
    pub local_td_capacity: f64,
    #[serde(rename = "LocalTDFixedCosts")]
    pub local_td_fixed_costs: f64,
}

/// Deserialize an optional cell, treating `.` and empty cells as absent.
fn dot_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some(".") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional 0/1/true/false flag.
fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some(".") => Ok(None),
        Some("1") | Some("true") | Some("True") | Some("TRUE") => Ok(Some(true)),
        Some("0") | Some("false") | Some("False") | Some("FALSE") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a 0/1 flag, got {other:?}"
        ))),
    }
}
