//! Module for constructing and solving flux balance analysis problems

pub mod problem;
pub mod solvers;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::optimize::solvers::{default_solver, SolverError};

/// Struct representing the solution to an FBA problem
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FbaSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Flux through each reaction at the optimum,
    ///
    /// Some(IndexMap), keyed by reaction id, if the problem could be solved, None otherwise
    pub fluxes: Option<IndexMap<String, f64>>,
}

impl FbaSolution {
    /// A solution carrying only a (non-optimal) status
    pub fn failed(status: OptimizationStatus) -> Self {
        FbaSolution {
            status,
            objective_value: None,
            fluxes: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }

    /// Flux through a reaction, None if the problem wasn't solved or the
    /// reaction isn't part of it
    pub fn flux(&self, reaction_id: &str) -> Option<f64> {
        self.fluxes.as_ref()?.get(reaction_id).copied()
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has not yet attempted to be optimized
    Unoptimized,
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// An approximate solution has been found
    AlmostOptimal,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

/// Run flux balance analysis on a model with the configured default solver
///
/// The objective is the model's objective if it has one, otherwise its
/// biomass reaction with a coefficient of 1.
pub fn fba(model: &Model) -> Result<FbaSolution, SolverError> {
    let objective = default_objective(model)?;
    default_solver()?.solve(model, &objective)
}

/// The objective FBA uses for a model when the caller doesn't supply one
pub fn default_objective(model: &Model) -> Result<IndexMap<String, f64>, SolverError> {
    if !model.objective.is_empty() {
        return Ok(model.objective.clone());
    }
    let biomass = model.detect_biomass_reaction()?;
    Ok(IndexMap::from([(biomass.to_string(), 1.)]))
}
