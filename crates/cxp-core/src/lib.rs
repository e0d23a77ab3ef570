//! # cxp-core: Capacity-Expansion Data Model
//!
//! Provides the identifiers, validated input data and network topology used to
//! formulate a multi-period electricity capacity-expansion model.
//!
//! ## Design Philosophy
//!
//! The transmission network is an **undirected graph** of load zones joined by
//! transmission lines. Every line is expanded into exactly two directional
//! pairs `(from, to)` so that flows can be modelled as non-negative quantities
//! with direction-specific losses. Investment decisions are indexed by
//! **periods** (multi-year blocks totally ordered by start year); operating
//! decisions by **timepoints**, each belonging to exactly one period.
//!
//! ## Quick Start
//!
//! ```rust
//! use cxp_core::*;
//!
//! let zones = vec![LoadZone::new("A"), LoadZone::new("B")];
//! let lines = vec![TransmissionLine::new("A-B", "A", "B")
//!     .with_length(Kilometers(100.0))
//!     .with_existing_capacity(Megawatts(50.0))];
//!
//! let topology = Topology::build(&zones, &lines).unwrap();
//! assert_eq!(topology.directional_pairs().len(), 2);
//! assert_eq!(
//!     topology.line_for(&ZoneId::new("B"), &ZoneId::new("A")).unwrap(),
//!     &LineId::new("A-B")
//! );
//! ```
//!
//! ## Modules
//!
//! - [`topology`] - Directional pairs and reverse line lookup
//! - [`timescales`] - Period ordering, accumulation windows and timepoints
//! - [`tables`] - Tabular input and output row contracts
//! - [`inputs`] - Validation of rows into [`ModelInputs`]
//! - [`config`] - Resolved model configuration
//! - [`diagnostics`] - Advisory validation findings

use serde::{Deserialize, Serialize};

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod inputs;
pub mod tables;
pub mod timescales;
pub mod topology;
pub mod units;

pub use config::{ModelConfig, ModuleConfig};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{CxpError, CxpResult};
pub use inputs::{InputTables, ModelInputs, TransmissionParams};
pub use timescales::{PeriodOrder, Timescales};
pub use topology::{DirectionalPair, Topology};
pub use units::{Kilometers, Megawatts};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Load zone (network node) identifier
    ZoneId
);
string_id!(
    /// Transmission line identifier
    LineId
);
string_id!(
    /// Investment period identifier
    PeriodId
);
string_id!(
    /// Operating timepoint identifier
    TimepointId
);

/// A load zone with its local transmission & distribution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadZone {
    pub id: ZoneId,
    /// Local T&D capacity in service before the first period
    pub existing_local_td: Megawatts,
    /// Annual cost of keeping one MW of local T&D in service ($/MW-yr)
    pub local_td_annual_cost_per_mw: f64,
}

impl LoadZone {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ZoneId::new(id),
            existing_local_td: Megawatts(0.0),
            local_td_annual_cost_per_mw: 0.0,
        }
    }

    pub fn with_local_td(mut self, existing: Megawatts, annual_cost_per_mw: f64) -> Self {
        self.existing_local_td = existing;
        self.local_td_annual_cost_per_mw = annual_cost_per_mw;
        self
    }
}

/// An undirected transmission corridor between two load zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLine {
    pub id: LineId,
    pub zone_a: ZoneId,
    pub zone_b: ZoneId,
    pub length: Kilometers,
    /// Fraction of sent power that arrives, in [0, 1]
    pub efficiency: f64,
    pub existing_capacity: Megawatts,
    /// External database identifier, defaults to the line id
    pub external_id: String,
    pub derating_factor: f64,
    pub terrain_multiplier: f64,
    pub new_build_allowed: bool,
}

impl TransmissionLine {
    /// Create a line with default parameters (lossless, no existing capacity,
    /// derating 1, terrain 1, new builds allowed).
    pub fn new(
        id: impl Into<String>,
        zone_a: impl Into<String>,
        zone_b: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            external_id: id.clone(),
            id: LineId::new(id),
            zone_a: ZoneId::new(zone_a),
            zone_b: ZoneId::new(zone_b),
            length: Kilometers(0.0),
            efficiency: 1.0,
            existing_capacity: Megawatts(0.0),
            derating_factor: 1.0,
            terrain_multiplier: 1.0,
            new_build_allowed: true,
        }
    }

    pub fn with_length(mut self, length: Kilometers) -> Self {
        self.length = length;
        self
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn with_existing_capacity(mut self, capacity: Megawatts) -> Self {
        self.existing_capacity = capacity;
        self
    }

    pub fn with_derating(mut self, derating_factor: f64) -> Self {
        self.derating_factor = derating_factor;
        self
    }

    pub fn with_terrain(mut self, terrain_multiplier: f64) -> Self {
        self.terrain_multiplier = terrain_multiplier;
        self
    }

    pub fn with_new_build_allowed(mut self, allowed: bool) -> Self {
        self.new_build_allowed = allowed;
        self
    }

    /// True if this line joins `a` and `b` in either order.
    pub fn connects(&self, a: &ZoneId, b: &ZoneId) -> bool {
        (&self.zone_a == a && &self.zone_b == b) || (&self.zone_a == b && &self.zone_b == a)
    }
}

/// A multi-year investment period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub start_year: i32,
    pub end_year: i32,
}

impl Period {
    pub fn new(id: impl Into<String>, start_year: i32, end_year: i32) -> Self {
        Self {
            id: PeriodId::new(id),
            start_year,
            end_year,
        }
    }

    /// Number of calendar years covered, both endpoints inclusive.
    pub fn years(&self) -> f64 {
        f64::from(self.end_year - self.start_year + 1)
    }
}

/// A representative operating hour block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timepoint {
    pub id: TimepointId,
    pub period: PeriodId,
    /// Hours per year represented by this timepoint
    pub weight_hours: f64,
}

impl Timepoint {
    pub fn new(id: impl Into<String>, period: impl Into<String>, weight_hours: f64) -> Self {
        Self {
            id: TimepointId::new(id),
            period: PeriodId::new(period),
            weight_hours,
        }
    }
}

/// When a build record took effect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildYear {
    /// Capacity installed before the first modelled period
    Legacy,
    /// Capacity installed at the start of the given period
    Period(PeriodId),
}
