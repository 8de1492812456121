//! Solver interface for the microlp simplex solver
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use crate::optimize::problem::{LinearProgram, ObjectiveSense};
use crate::optimize::solvers::{FbaSolver, SolverError};
use crate::optimize::{FbaSolution, OptimizationStatus};

#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver;

impl FbaSolver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve_lp(&self, lp: &LinearProgram) -> Result<FbaSolution, SolverError> {
        let direction = match lp.sense() {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut problem = Problem::new(direction);
        let variables: Vec<_> = lp
            .objective()
            .iter()
            .zip(lp.lower_bounds().iter().zip(lp.upper_bounds()))
            .map(|(coef, (lb, ub))| problem.add_var(*coef, (*lb, *ub)))
            .collect();

        for row in lp.stoichiometry_rows().row_iter() {
            let mut expr = LinearExpr::empty();
            for (col, coef) in row.col_indices().iter().zip(row.values()) {
                expr.add(variables[*col], *coef);
            }
            problem.add_constraint(expr, ComparisonOp::Eq, 0.);
        }

        match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = variables.iter().map(|var| solution[*var]).collect();
                Ok(lp.solution(OptimizationStatus::Optimal, &values))
            }
            Err(microlp::Error::Infeasible) => {
                Ok(FbaSolution::failed(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(FbaSolution::failed(OptimizationStatus::Unbounded))
            }
            Err(err) => {
                log::warn!("microlp failed: {}", err);
                Ok(FbaSolution::failed(OptimizationStatus::NumericalError))
            }
        }
    }
}
