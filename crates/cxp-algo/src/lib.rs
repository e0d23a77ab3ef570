//! # cxp-algo: Capacity-Expansion Model Formulation
//!
//! Builds a multi-period transmission and local-distribution expansion model
//! as a linear program with [`good_lp`].
//!
//! ## Formulation
//!
//! ```text
//! minimize   Σ_p years(p) · [ TxFixedCosts(p) + LocalTDFixedCosts(p) ]
//!          + Σ_t weight(t) · UnservedLoadPenalty(t)
//!
//! subject to, for every zone z and timepoint t:
//!   Zone_Energy_Balance:         Σ injections(z,t) = Σ withdrawals(z,t)
//!   Distributed_Energy_Balance:  Σ injections(z,t) = Σ withdrawals(z,t)
//!   DispatchTx(m→n,t)            ≤ derating · TxCapacity(line(m,n), period(t))
//!   WithdrawFromCentralGrid(z,t) ≤ LocalTDCapacity(z, period(t))
//! and for every zone z and period p:
//!   Meet_Local_TD:  LocalTDCapacity(z,p) · (1 - loss) ≥ peak_demand(z,p)
//! ```
//!
//! ## Modules
//!
//! - [`ledger`] - Capacity accumulation across ordered periods
//! - [`cost`] - Capital recovery and named cost components
//! - [`balance`] - Named injection/withdrawal registry per node and timepoint
//! - [`components`] - Transmission, local T&D, demand and unserved-load slices
//! - [`model`] - Assembly and solving
//! - [`report`] - Post-solve tabular output

pub mod balance;
pub mod components;
pub mod cost;
pub mod ledger;
pub mod model;
pub mod report;

pub use balance::{BalanceEquation, BalanceRegistry};
pub use components::{BuildContext, DecisionHandles, ModelComponent};
pub use cost::{capital_recovery_factor, CostComponents};
pub use ledger::CapacityLedger;
pub use model::{ExpansionModel, ModelBuilder, ModelSummary, SolvedModel};
