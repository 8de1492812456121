//! Dynamic multi-organism simulation
//!
//! An [`Environment`] holds an ordered list of [`Organism`]s and an ordered
//! list of tracked metabolites. A [`Bioreactor`] adds biomass and substrate
//! concentrations plus feed streams, and advances them in time by repeatedly
//! refreshing each organism's bounds, solving its FBA problem, and folding
//! the resulting rates back into the shared state.
//!
//! Every per-organism or per-metabolite vector is positionally aligned with
//! the insertion order of the corresponding environment list.

pub mod bioreactor;
pub mod environment;
pub mod kinetics;
pub mod organism;
pub mod simulation;
pub mod uptake;

pub use bioreactor::Bioreactor;
pub use environment::{Environment, EnvironmentId, HostEnvironment};
pub use kinetics::{Chemostat, FedBatch, KineticLaw};
pub use organism::{Organism, OrganismRef, UpdatePolicy};
pub use simulation::{
    Horizon, MaxSteps, OrganismStep, SteadyState, StepReport, StopCondition, Trajectory,
};
pub use uptake::{MichaelisMentenUptake, PolicyChain, SecretionOnly};

use thiserror::Error;

use crate::metabolic_model::model::ModelError;
use crate::optimize::solvers::SolverError;

/// Errors raised by organisms, environments and bioreactors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    /// Error when an organism without an update policy is asked to update
    #[error("Organism {0} has no update policy, update is not implemented")]
    UpdateNotImplemented(String),
    /// Error when a positional vector doesn't match the environment it belongs to
    #[error("{what} has length {found}, expected {expected}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Error when an index into the organism or metabolite list is out of range
    #[error("{what} index {index} is out of range for length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// Error when a time step is not a positive, finite number
    #[error("Invalid time step {0}, must be positive and finite")]
    InvalidTimeStep(f64),
    /// Error when an organism's lock was poisoned by a panic in another thread
    #[error("Organism lock poisoned")]
    PoisonedOrganism,
    /// Error raised by an update policy while editing a model
    #[error("Update policy failed: {0}")]
    Model(#[from] ModelError),
    /// Error raised while setting up a solve
    #[error("Solver failed: {0}")]
    Solver(#[from] SolverError),
    /// Error raised while building the worker pool for parallel solves
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
