//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b`, `s in K`.
//! The mass balance rows go into a zero cone, and every finite bound adds a
//! row to a nonnegative cone.
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra_sparse::CooMatrix;

use crate::configuration;
use crate::optimize::problem::{LinearProgram, ObjectiveSense};
use crate::optimize::solvers::{FbaSolver, SolverError};
use crate::optimize::{FbaSolution, OptimizationStatus};

#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Feasibility and duality gap tolerance
    pub tolerance: f64,
    /// Maximum number of interior point iterations
    pub max_iterations: u32,
}

impl ClarabelSolver {
    pub fn from_configuration() -> Self {
        let config = configuration::current();
        ClarabelSolver {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::from_configuration()
    }
}

impl FbaSolver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve_lp(&self, lp: &LinearProgram) -> Result<FbaSolution, SolverError> {
        let n = lp.num_variables();
        let m = lp.num_constraints();

        // Linear cost, clarabel always minimizes
        let q: Vec<f64> = match lp.sense() {
            ObjectiveSense::Maximize => lp.objective().iter().map(|c| -c).collect(),
            ObjectiveSense::Minimize => lp.objective().to_vec(),
        };
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

        // Constraint rows: S v = 0, then v_j <= ub_j and -v_j <= -lb_j
        let finite_bounds = lp
            .upper_bounds()
            .iter()
            .chain(lp.lower_bounds())
            .filter(|b| b.is_finite())
            .count();
        let mut coo = CooMatrix::new(m + finite_bounds, n);
        let mut b = vec![0.; m];
        for (row, col, coef) in lp.stoichiometry().triplet_iter() {
            coo.push(row, col, *coef);
        }
        let mut row = m;
        for (col, ub) in lp.upper_bounds().iter().enumerate() {
            if ub.is_finite() {
                coo.push(row, col, 1.);
                b.push(*ub);
                row += 1;
            }
        }
        for (col, lb) in lp.lower_bounds().iter().enumerate() {
            if lb.is_finite() {
                coo.push(row, col, -1.);
                b.push(-*lb);
                row += 1;
            }
        }
        let (col_offsets, row_indices, values) =
            nalgebra_sparse::CscMatrix::from(&coo).disassemble();
        let a = CscMatrix::new(m + finite_bounds, n, col_offsets, row_indices, values);

        let mut cones = Vec::with_capacity(2);
        if m > 0 {
            cones.push(SupportedConeT::ZeroConeT(m));
        }
        if finite_bounds > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(finite_bounds));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(self.max_iterations)
            .tol_feas(self.tolerance)
            .tol_gap_abs(self.tolerance)
            .tol_gap_rel(self.tolerance)
            .build()
            .map_err(|err| SolverError::Backend(format!("{:?}", err)))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();
        let status = convert_status(&solver.solution.status);
        log::trace!(
            "clarabel finished in {} iterations with status {:?}",
            solver.solution.iterations,
            status
        );
        Ok(lp.solution(status, &solver.solution.x))
    }
}

fn convert_status(status: &SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::MaxIterations
        | SolverStatus::MaxTime
        | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
        SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
        _ => OptimizationStatus::NumericalError,
    }
}
