//! Solver backends for flux balance analysis
use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::configuration::{self, Solver};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::problem::{LinearProgram, ObjectiveSense};
use crate::optimize::FbaSolution;

pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;
#[cfg(feature = "minilp")]
pub mod microlp;

/// An FBA service: builds a linear program from a model and solves it
///
/// Every call is independent, implementations must not carry state from one
/// solve to the next.
pub trait FbaSolver: Debug + Send + Sync {
    /// Short name of the backend, used in logs
    fn name(&self) -> &'static str;

    /// Solve an already assembled linear program
    fn solve_lp(&self, lp: &LinearProgram) -> Result<FbaSolution, SolverError>;

    /// Maximize `objective` (reaction id to coefficient) over the flux space of `model`
    fn solve(
        &self,
        model: &Model,
        objective: &IndexMap<String, f64>,
    ) -> Result<FbaSolution, SolverError> {
        let lp = LinearProgram::from_model(model, objective, ObjectiveSense::Maximize)?;
        self.solve_lp(&lp)
    }
}

/// Create the solver selected in the configuration
pub fn default_solver() -> Result<Arc<dyn FbaSolver>, SolverError> {
    let config = configuration::current();
    solver_for(config.solver)
}

/// Create a solver for a particular backend
pub fn solver_for(solver: Solver) -> Result<Arc<dyn FbaSolver>, SolverError> {
    match solver {
        Solver::Clarabel => Ok(Arc::new(clarabel::ClarabelSolver::from_configuration())),
        Solver::Microlp => microlp_solver(),
        Solver::Highs => highs_solver(),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "minilp")] {
        fn microlp_solver() -> Result<Arc<dyn FbaSolver>, SolverError> {
            Ok(Arc::new(microlp::MicrolpSolver))
        }
    } else {
        fn microlp_solver() -> Result<Arc<dyn FbaSolver>, SolverError> {
            Err(SolverError::BackendUnavailable("microlp", "minilp"))
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "highs")] {
        fn highs_solver() -> Result<Arc<dyn FbaSolver>, SolverError> {
            Ok(Arc::new(highs::HighsSolver))
        }
    } else {
        fn highs_solver() -> Result<Arc<dyn FbaSolver>, SolverError> {
            Err(SolverError::BackendUnavailable("highs", "highs"))
        }
    }
}

/// Errors raised while setting up or running a solve
///
/// A problem that is infeasible or unbounded is not an error, it is reported
/// through the status of the [`FbaSolution`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Error when the objective has no terms
    #[error("Tried to solve a problem with an empty objective")]
    EmptyObjective,
    /// Error when the objective includes a reaction that is not in the model
    #[error("Objective references reaction {0} which is not in the model")]
    UnknownObjectiveReaction(String),
    /// Error when the model can't provide an objective
    #[error("Unable to determine an objective: {0}")]
    Model(#[from] ModelError),
    /// Error when the requested backend was not compiled in
    #[error("The {0} solver requires the {1} feature to be enabled")]
    BackendUnavailable(&'static str, &'static str),
    /// Error raised by the backend itself while setting up the problem
    #[error("Solver backend error: {0}")]
    Backend(String),
}
