//! Solver interface for HiGHS
use highs::{HighsModelStatus, RowProblem, Sense};

use crate::optimize::problem::{LinearProgram, ObjectiveSense};
use crate::optimize::solvers::{FbaSolver, SolverError};
use crate::optimize::{FbaSolution, OptimizationStatus};

#[derive(Clone, Debug, Default)]
pub struct HighsSolver;

impl FbaSolver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve_lp(&self, lp: &LinearProgram) -> Result<FbaSolution, SolverError> {
        let mut problem = RowProblem::default();
        let columns: Vec<_> = lp
            .objective()
            .iter()
            .zip(lp.lower_bounds().iter().zip(lp.upper_bounds()))
            .map(|(coef, (lb, ub))| problem.add_column(*coef, *lb..=*ub))
            .collect();
        for row in lp.stoichiometry_rows().row_iter() {
            let factors: Vec<_> = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(col, coef)| (columns[*col], *coef))
                .collect();
            problem.add_row(0.0..=0.0, factors);
        }

        let sense = match lp.sense() {
            ObjectiveSense::Maximize => Sense::Maximise,
            ObjectiveSense::Minimize => Sense::Minimise,
        };
        let mut model = problem.optimise(sense);
        model.set_option("output_flag", false);
        let solved = model.solve();
        let status = match solved.status() {
            HighsModelStatus::Optimal => OptimizationStatus::Optimal,
            HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                OptimizationStatus::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                OptimizationStatus::SolverHalted
            }
            _ => OptimizationStatus::NumericalError,
        };
        if status != OptimizationStatus::Optimal {
            return Ok(FbaSolution::failed(status));
        }
        let solution = solved.get_solution();
        Ok(lp.solution(status, solution.columns()))
    }
}
