//! Provides the linear program solved for flux balance analysis
//!
//! The program is
//! ```text
//! max/min  c'v
//! s.t.     S v = 0
//!          lb <= v <= ub
//! ```
//! with one variable per reaction, and one mass balance row per
//! non-boundary metabolite.
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};

use crate::metabolic_model::model::Model;
use crate::optimize::solvers::SolverError;
use crate::optimize::{FbaSolution, OptimizationStatus};

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A flux balance linear program built from a snapshot of a [`Model`]
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// Reaction ids, in variable order
    reaction_ids: Vec<String>,
    /// Balanced metabolite ids, in row order
    metabolite_ids: Vec<String>,
    /// Stoichiometric matrix (metabolites x reactions)
    stoichiometry: CscMatrix<f64>,
    /// Lower bounds of the variables, -inf where unbounded
    lower_bounds: Vec<f64>,
    /// Upper bounds of the variables, +inf where unbounded
    upper_bounds: Vec<f64>,
    /// Objective coefficients, in variable order
    objective: Vec<f64>,
    sense: ObjectiveSense,
}

impl LinearProgram {
    /// Build the linear program for a model and objective
    ///
    /// # Parameters
    /// - `model`: model providing the stoichiometry and bounds
    /// - `objective`: map of reaction id to objective coefficient
    /// - `sense`: whether to maximize or minimize the objective
    pub fn from_model(
        model: &Model,
        objective: &IndexMap<String, f64>,
        sense: ObjectiveSense,
    ) -> Result<Self, SolverError> {
        if objective.is_empty() {
            return Err(SolverError::EmptyObjective);
        }
        let reaction_ids: Vec<String> = model.reactions.keys().cloned().collect();
        let metabolite_index: IndexMap<&str, usize> = model
            .metabolites
            .values()
            .filter(|met| !met.boundary)
            .enumerate()
            .map(|(row, met)| (met.id.as_str(), row))
            .collect();

        let mut coo = CooMatrix::new(metabolite_index.len(), reaction_ids.len());
        let mut lower_bounds = Vec::with_capacity(reaction_ids.len());
        let mut upper_bounds = Vec::with_capacity(reaction_ids.len());
        for (col, rxn) in model.reactions.values().enumerate() {
            for (met_id, coef) in &rxn.metabolites {
                if let Some(row) = metabolite_index.get(met_id.as_str()) {
                    coo.push(*row, col, *coef);
                }
            }
            lower_bounds.push(rxn.lower_bound_or_inf());
            upper_bounds.push(rxn.upper_bound_or_inf());
        }

        let mut objective_coefficients = vec![0.; reaction_ids.len()];
        for (rxn_id, coef) in objective {
            match model.reactions.get_index_of(rxn_id) {
                Some(col) => objective_coefficients[col] = *coef,
                None => return Err(SolverError::UnknownObjectiveReaction(rxn_id.clone())),
            }
        }

        Ok(LinearProgram {
            reaction_ids,
            metabolite_ids: metabolite_index.keys().map(|id| id.to_string()).collect(),
            stoichiometry: CscMatrix::from(&coo),
            lower_bounds,
            upper_bounds,
            objective: objective_coefficients,
            sense,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.reaction_ids.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.metabolite_ids.len()
    }

    pub fn reaction_ids(&self) -> &[String] {
        &self.reaction_ids
    }

    pub fn metabolite_ids(&self) -> &[String] {
        &self.metabolite_ids
    }

    /// Stoichiometric matrix in compressed column form
    pub fn stoichiometry(&self) -> &CscMatrix<f64> {
        &self.stoichiometry
    }

    /// Stoichiometric matrix in compressed row form, for row oriented backends
    pub fn stoichiometry_rows(&self) -> CsrMatrix<f64> {
        CsrMatrix::from(&self.stoichiometry)
    }

    pub fn lower_bounds(&self) -> &[f64] {
        &self.lower_bounds
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Value of the objective for a set of variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum()
    }

    /// Wrap raw variable values returned by a backend into an [`FbaSolution`]
    ///
    /// Only an optimal status carries the objective value and fluxes.
    pub fn solution(&self, status: OptimizationStatus, values: &[f64]) -> FbaSolution {
        if status != OptimizationStatus::Optimal || values.len() != self.num_variables() {
            return FbaSolution::failed(status);
        }
        FbaSolution {
            status,
            objective_value: Some(self.objective_value(values)),
            fluxes: Some(
                self.reaction_ids
                    .iter()
                    .cloned()
                    .zip(values.iter().copied())
                    .collect(),
            ),
        }
    }
}
