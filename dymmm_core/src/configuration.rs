use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Process wide defaults used when building models, solvers, and bioreactors
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Default lower flux bound for new reactions
    pub lower_bound: Option<f64>,
    /// Default upper flux bound for new reactions
    pub upper_bound: Option<f64>,
    /// Feasibility/optimality tolerance handed to the solver backends
    pub tolerance: f64,
    /// Backend used by [`crate::optimize::solvers::default_solver`]
    pub solver: Solver,
    /// Number of worker threads for the solve phase of a time step,
    /// only used when the `parallel` feature is enabled
    pub processes: u32,
    /// Iteration limit for a single solve
    pub max_iterations: u32,
    /// If true, stepping a bioreactor containing an organism without an
    /// update policy is an error, otherwise that organism keeps its bounds
    pub require_update_policy: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: Some(-1000.),
            upper_bound: Some(1000.),
            tolerance: 1e-08,
            solver: Solver::Clarabel,
            processes: 1,
            max_iterations: 200,
            require_update_policy: true,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Solver {
    /// Use the Clarabel interior point solver
    Clarabel,
    /// Use the microlp simplex solver, requires the minilp feature to be enabled
    Microlp,
    /// Use the HiGHS solver, requires the highs feature to be enabled
    Highs,
}

/// Read a copy of the current configuration, using the last written values
/// if the lock has been poisoned
pub(crate) fn current() -> Configuration {
    read_configuration(&CONFIGURATION)
}

fn read_configuration(lock: &RwLock<Configuration>) -> Configuration {
    match lock.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
