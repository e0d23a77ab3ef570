//! Model components.
//!
//! Each component owns one slice of the formulation: it declares decision
//! variables, adds its own constraints, registers balance terms and appends
//! cost components. Components never see each other directly; they meet in
//! the shared [`BuildContext`].
//!
//! # Adding a component
//!
//! ```ignore
//! struct Imports;
//!
//! impl ModelComponent for Imports {
//!     fn id(&self) -> &str { "imports" }
//!
//!     fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()> {
//!         ctx.zone_balance.register_injection("Imports", |_, _| 5.0.into())
//!     }
//! }
//!
//! let model = ModelBuilder::new(&inputs, &config)
//!     .with_component(Box::new(Imports))
//!     .build()?;
//! ```

mod demand;
mod local_td;
mod transmission_build;
mod transmission_dispatch;
mod unserved_load;

use std::collections::{BTreeMap, HashMap};

use cxp_core::{
    CxpError, CxpResult, DirectionalPair, LineId, ModelConfig, ModelInputs, PeriodId,
    TimepointId, Topology, ZoneId,
};
use good_lp::{Constraint, Expression, ProblemVariables, Variable};

use crate::balance::BalanceRegistry;
use crate::cost::CostComponents;
use crate::ledger::CapacityLedger;

pub use demand::ZoneDemand;
pub use local_td::{inject_into_distributed, LocalTd};
pub use transmission_build::TransmissionBuild;
pub use transmission_dispatch::TransmissionDispatch;
pub use unserved_load::UnservedLoad;

/// Name of the central (zone) balance registry.
pub const ZONE_BALANCE: &str = "Zone_Energy_Balance";
/// Name of the distributed-node balance registry.
pub const DISTRIBUTED_BALANCE: &str = "Distributed_Energy_Balance";

/// A pluggable slice of the expansion model.
pub trait ModelComponent: Send + Sync {
    /// Unique component identifier
    fn id(&self) -> &str;

    /// Declare variables, constraints, balance terms and costs.
    fn define(&self, ctx: &mut BuildContext<'_>) -> CxpResult<()>;
}

/// Decision variables exposed for post-solve reporting.
#[derive(Debug, Clone, Default)]
pub struct DecisionHandles {
    pub build_tx: BTreeMap<(LineId, PeriodId), Variable>,
    pub dispatch_tx: BTreeMap<(DirectionalPair, TimepointId), Variable>,
    pub build_local_td: BTreeMap<(ZoneId, PeriodId), Variable>,
    pub withdraw_from_central: BTreeMap<(ZoneId, TimepointId), Variable>,
    pub unserved_load: BTreeMap<(ZoneId, TimepointId), Variable>,
}

/// Shared state that components build the model into.
pub struct BuildContext<'a> {
    pub inputs: &'a ModelInputs,
    pub config: &'a ModelConfig,
    pub topology: &'a Topology,
    pub variables: ProblemVariables,
    pub zone_balance: BalanceRegistry<Expression>,
    /// Present when distributed sub-nodes are modelled
    pub distributed_balance: Option<BalanceRegistry<Expression>>,
    pub costs: CostComponents<Expression>,
    pub tx_ledger: Option<CapacityLedger<LineId, Variable>>,
    pub local_td_ledger: Option<CapacityLedger<ZoneId, Variable>>,
    pub handles: DecisionHandles,
    constraints: Vec<Constraint>,
    constraint_names: Vec<String>,
}

impl<'a> BuildContext<'a> {
    pub fn new(inputs: &'a ModelInputs, config: &'a ModelConfig, topology: &'a Topology) -> Self {
        Self {
            inputs,
            config,
            topology,
            variables: ProblemVariables::new(),
            zone_balance: BalanceRegistry::new(ZONE_BALANCE),
            distributed_balance: config
                .modules
                .local_td
                .then(|| BalanceRegistry::new(DISTRIBUTED_BALANCE)),
            costs: CostComponents::new(),
            tx_ledger: None,
            local_td_ledger: None,
            handles: DecisionHandles::default(),
            constraints: Vec::new(),
            constraint_names: Vec::new(),
        }
    }

    /// Add a constraint under `name`.
    pub fn add_constraint(&mut self, name: String, constraint: Constraint) {
        self.constraints.push(constraint.set_name(name.clone()));
        self.constraint_names.push(name);
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// The transmission ledger, which exists once transmission builds are
    /// defined.
    pub fn tx_ledger(&self) -> CxpResult<&CapacityLedger<LineId, Variable>> {
        self.tx_ledger.as_ref().ok_or_else(|| {
            CxpError::Config("transmission builds must be defined before they are used".into())
        })
    }

    pub fn distributed_balance_mut(&mut self) -> CxpResult<&mut BalanceRegistry<Expression>> {
        self.distributed_balance.as_mut().ok_or_else(|| {
            CxpError::Config("distributed nodes are disabled in the model configuration".into())
        })
    }

    pub(crate) fn into_parts(self) -> BuiltParts {
        BuiltParts {
            variables: self.variables,
            zone_balance: self.zone_balance,
            distributed_balance: self.distributed_balance,
            costs: self.costs,
            handles: self.handles,
            constraints: self.constraints,
            constraint_names: self.constraint_names,
        }
    }
}

/// Context contents handed back to the assembler once definition is over.
pub(crate) struct BuiltParts {
    pub variables: ProblemVariables,
    pub zone_balance: BalanceRegistry<Expression>,
    pub distributed_balance: Option<BalanceRegistry<Expression>>,
    pub costs: CostComponents<Expression>,
    pub handles: DecisionHandles,
    pub constraints: Vec<Constraint>,
    pub constraint_names: Vec<String>,
}

/// Resolver over a sparse `(zone, timepoint)` table; absent entries are zero.
pub(crate) fn indexed_term(
    values: HashMap<(ZoneId, TimepointId), Expression>,
) -> impl Fn(&ZoneId, &TimepointId) -> Expression + Send + Sync + 'static {
    move |zone, timepoint| {
        values
            .get(&(zone.clone(), timepoint.clone()))
            .cloned()
            .unwrap_or_default()
    }
}
