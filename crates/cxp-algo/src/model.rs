//! Expansion model assembly and solving.
//!
//! [`ModelBuilder`] runs every active component against a shared
//! [`BuildContext`], freezes the balance registries, compiles one equality
//! per (zone, timepoint) and per (distributed node, timepoint), and returns
//! an [`ExpansionModel`]. The model is handed to a solver exactly once.
//!
//! ```no_run
//! use cxp_algo::model::ModelBuilder;
//! use cxp_core::{InputTables, ModelConfig, ModelInputs};
//!
//! let config = ModelConfig::default();
//! let tables = InputTables::default(); // decoded by the caller
//! let (inputs, _diagnostics) = ModelInputs::from_tables(&tables, &config)?;
//!
//! let model = ModelBuilder::new(&inputs, &config).build()?;
//! let solved = model.solve()?;
//! println!("objective: {:.2}", solved.objective_value());
//! # Ok::<(), cxp_core::CxpError>(())
//! ```

use std::collections::HashSet;

use cxp_core::{CxpError, CxpResult, ModelConfig, ModelInputs, TimepointId, Topology, ZoneId};
use good_lp::{Constraint, Expression, ProblemVariables, Solution, Solver, SolverModel, Variable};
use serde::Serialize;
use tracing::{debug, info};

use crate::components::{
    BuildContext, DecisionHandles, LocalTd, ModelComponent, TransmissionBuild,
    TransmissionDispatch, UnservedLoad, ZoneDemand,
};
use crate::cost::CostComponents;
use crate::report::{local_td_report, transmission_report};
use cxp_core::tables::{LocalTdReportRow, TransmissionReportRow};

/// Size of an assembled model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub zones: usize,
    pub lines: usize,
    pub periods: usize,
    pub timepoints: usize,
    pub variables: usize,
    pub constraints: usize,
    pub components: Vec<String>,
}

/// Collects components and assembles the model.
pub struct ModelBuilder<'a> {
    inputs: &'a ModelInputs,
    config: &'a ModelConfig,
    components: Vec<Box<dyn ModelComponent>>,
}

impl<'a> ModelBuilder<'a> {
    /// Builder with the components selected by `config.modules`.
    pub fn new(inputs: &'a ModelInputs, config: &'a ModelConfig) -> Self {
        let mut components: Vec<Box<dyn ModelComponent>> = vec![
            Box::new(TransmissionBuild),
            Box::new(TransmissionDispatch),
        ];
        if config.modules.local_td {
            components.push(Box::new(LocalTd));
        }
        components.push(Box::new(ZoneDemand));
        if config.modules.unserved_load {
            components.push(Box::new(UnservedLoad));
        }
        Self {
            inputs,
            config,
            components,
        }
    }

    /// Append a component; it runs after the built-in ones.
    pub fn with_component(mut self, component: Box<dyn ModelComponent>) -> Self {
        self.components.push(component);
        self
    }

    pub fn component_ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id()).collect()
    }

    pub fn build(self) -> CxpResult<ExpansionModel> {
        self.config.validate()?;

        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.id()) {
                return Err(CxpError::Registration(format!(
                    "model component {} added twice",
                    component.id()
                )));
            }
        }

        let inputs = self.inputs;
        let topology = Topology::build(&inputs.zones, &inputs.lines)?;
        let mut ctx = BuildContext::new(inputs, self.config, &topology);

        for component in &self.components {
            debug!(component = component.id(), "defining model component");
            component.define(&mut ctx)?;
        }

        let zones: Vec<ZoneId> = inputs.zone_ids().cloned().collect();
        let timepoints: Vec<TimepointId> = inputs.timescales.ids().cloned().collect();

        ctx.zone_balance.finalize();
        let zone_name = ctx.zone_balance.name().to_string();
        let zone_equations = ctx
            .zone_balance
            .build_balance_constraints(&zones, &timepoints)?;
        for equation in zone_equations {
            let name = equation.constraint_name(&zone_name);
            ctx.add_constraint(name, equation.into_constraint(&zone_name));
        }

        if let Some(registry) = ctx.distributed_balance.as_mut() {
            registry.finalize();
            let distributed_name = registry.name().to_string();
            let equations = registry.build_balance_constraints(&zones, &timepoints)?;
            for equation in equations {
                let name = equation.constraint_name(&distributed_name);
                ctx.add_constraint(name, equation.into_constraint(&distributed_name));
            }
        }

        let parts = ctx.into_parts();
        let objective: Expression = parts.costs.total(&inputs.periods, &inputs.timescales)?;

        let summary = ModelSummary {
            zones: topology.zone_count(),
            lines: topology.line_count(),
            periods: inputs.periods.len(),
            timepoints: timepoints.len(),
            variables: parts.variables.len(),
            constraints: parts.constraints.len(),
            components: self.components.iter().map(|c| c.id().to_string()).collect(),
        };
        info!(
            zones = summary.zones,
            lines = summary.lines,
            variables = summary.variables,
            constraints = summary.constraints,
            islands = topology.island_count(),
            "assembled capacity expansion model"
        );

        Ok(ExpansionModel {
            variables: parts.variables,
            objective,
            constraints: parts.constraints,
            constraint_names: parts.constraint_names,
            injection_terms: parts.zone_balance.injection_ids().map(String::from).collect(),
            withdrawal_terms: parts.zone_balance.withdrawal_ids().map(String::from).collect(),
            handles: parts.handles,
            costs: parts.costs,
            summary,
        })
    }
}

/// A fully assembled model, ready for one solve.
pub struct ExpansionModel {
    variables: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    constraint_names: Vec<String>,
    injection_terms: Vec<String>,
    withdrawal_terms: Vec<String>,
    handles: DecisionHandles,
    costs: CostComponents<Expression>,
    summary: ModelSummary,
}

impl ExpansionModel {
    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    pub fn handles(&self) -> &DecisionHandles {
        &self.handles
    }

    pub fn costs(&self) -> &CostComponents<Expression> {
        &self.costs
    }

    pub fn constraint_names(&self) -> &[String] {
        &self.constraint_names
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraint_names.iter().any(|n| n == name)
    }

    /// Zone balance injection term ids, in canonical order.
    pub fn zone_injection_terms(&self) -> &[String] {
        &self.injection_terms
    }

    /// Zone balance withdrawal term ids, in canonical order.
    pub fn zone_withdrawal_terms(&self) -> &[String] {
        &self.withdrawal_terms
    }

    /// Minimise total cost with `solver`.
    pub fn solve_with<S: Solver>(
        self,
        solver: S,
    ) -> CxpResult<SolvedModel<<S::Model as SolverModel>::Solution>> {
        let mut model = self.variables.minimise(self.objective.clone()).using(solver);
        for constraint in self.constraints {
            model = model.with(constraint);
        }

        let solution = model
            .solve()
            .map_err(|e| CxpError::Solver(e.to_string()))?;
        let objective_value = solution.eval(&self.objective);
        info!(objective = objective_value, "solved capacity expansion model");

        Ok(SolvedModel {
            solution,
            objective_value,
            handles: self.handles,
            costs: self.costs,
        })
    }

    /// Solve with the bundled pure-Rust LP solver.
    #[cfg(feature = "solver-microlp")]
    pub fn solve(self) -> CxpResult<SolvedModel<good_lp::solvers::microlp::MicroLpSolution>> {
        self.solve_with(good_lp::solvers::microlp::microlp)
    }
}

/// Solver output with the handles needed to read it back.
pub struct SolvedModel<S> {
    solution: S,
    objective_value: f64,
    handles: DecisionHandles,
    costs: CostComponents<Expression>,
}

impl<S: Solution> SolvedModel<S> {
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    pub fn solution(&self) -> &S {
        &self.solution
    }

    pub fn handles(&self) -> &DecisionHandles {
        &self.handles
    }

    pub fn value(&self, variable: Variable) -> f64 {
        self.solution.value(variable)
    }

    /// Evaluated per-period cost component, if both exist.
    pub fn period_cost(&self, component: &str, period: &cxp_core::PeriodId) -> Option<f64> {
        self.costs
            .period_component(component)?
            .get(period)
            .map(|expr| expr.eval_with(&self.solution))
    }

    /// Evaluated per-timepoint cost component, if both exist.
    pub fn timepoint_cost(&self, component: &str, timepoint: &TimepointId) -> Option<f64> {
        self.costs
            .timepoint_component(component)?
            .get(timepoint)
            .map(|expr| expr.eval_with(&self.solution))
    }

    pub fn transmission_report(
        &self,
        inputs: &ModelInputs,
        config: &ModelConfig,
    ) -> CxpResult<Vec<TransmissionReportRow>> {
        transmission_report(inputs, config, &self.handles, &self.solution)
    }

    pub fn local_td_report(&self, inputs: &ModelInputs) -> CxpResult<Vec<LocalTdReportRow>> {
        local_td_report(inputs, &self.handles, &self.solution)
    }
}
