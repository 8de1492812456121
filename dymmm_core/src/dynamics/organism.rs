//! Provides the Organism, a private copy of a metabolic model plus a policy
//! describing how its bounds react to the environment
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::dynamics::environment::{EnvironmentId, HostEnvironment};
use crate::dynamics::DynamicsError;
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::{FbaSolver, SolverError};
use crate::optimize::{default_objective, FbaSolution};

/// Shared handle to an organism, the same organism may be added to an
/// environment several times
pub type OrganismRef = Arc<RwLock<Organism>>;

/// Policy rewriting an organism's bounds from the state of its environment
///
/// Policies may only edit the organism they are handed. Any closure with the
/// signature of [`UpdatePolicy::update`] is a policy.
pub trait UpdatePolicy: Send + Sync {
    fn update(
        &self,
        organism: &mut Organism,
        environment: &dyn HostEnvironment,
    ) -> Result<(), DynamicsError>;

    /// Name used when logging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> UpdatePolicy for F
where
    F: Fn(&mut Organism, &dyn HostEnvironment) -> Result<(), DynamicsError> + Send + Sync,
{
    fn update(
        &self,
        organism: &mut Organism,
        environment: &dyn HostEnvironment,
    ) -> Result<(), DynamicsError> {
        self(organism, environment)
    }
}

/// An organism taking part in a dynamic simulation
#[derive(Clone)]
pub struct Organism {
    /// Private copy of the metabolic model
    model: Model,
    /// Label used in logs and trajectories
    label: String,
    /// Environment the organism currently lives in, if any
    environment: Option<EnvironmentId>,
    update_policy: Option<Arc<dyn UpdatePolicy>>,
}

impl Organism {
    /// Create a new organism from a copy of `model`
    ///
    /// The organism owns its copy, changes to its bounds are never visible
    /// through `model` and vice versa.
    pub fn new(model: &Model) -> Self {
        Organism {
            model: model.clone(),
            label: model.id.clone().unwrap_or_else(|| "organism".to_string()),
            environment: None,
            update_policy: None,
        }
    }

    /// Set the label of the organism
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Set the update policy of the organism
    pub fn with_update_policy<P: UpdatePolicy + 'static>(mut self, policy: P) -> Self {
        self.set_update_policy(policy);
        self
    }

    /// Replace the update policy of the organism
    pub fn set_update_policy<P: UpdatePolicy + 'static>(&mut self, policy: P) {
        self.update_policy = Some(Arc::new(policy));
    }

    /// Remove the update policy, after which [`Organism::update`] fails again
    pub fn clear_update_policy(&mut self) {
        self.update_policy = None;
    }

    pub fn has_update_policy(&self) -> bool {
        self.update_policy.is_some()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Id of the environment the organism has been added to
    pub fn environment(&self) -> Option<EnvironmentId> {
        self.environment
    }

    pub(crate) fn attach(&mut self, environment: EnvironmentId) {
        if let Some(previous) = self.environment.replace(environment) {
            if previous != environment {
                log::debug!(
                    "Organism {} moved from environment {} to {}",
                    self.label,
                    previous,
                    environment
                );
            }
        }
    }

    pub(crate) fn detach(&mut self, environment: EnvironmentId) {
        if self.environment == Some(environment) {
            self.environment = None;
        }
    }

    /// Refresh the bounds of the organism from the state of `environment`
    ///
    /// # Errors
    /// [`DynamicsError::UpdateNotImplemented`] if no update policy was set,
    /// otherwise whatever the policy returns.
    pub fn update(&mut self, environment: &dyn HostEnvironment) -> Result<(), DynamicsError> {
        let policy = self
            .update_policy
            .clone()
            .ok_or_else(|| DynamicsError::UpdateNotImplemented(self.label.clone()))?;
        log::trace!("Updating {} with {}", self.label, policy.name());
        policy.update(self, environment)
    }

    /// Run FBA on the current bounds, maximizing the model objective or,
    /// if it has none, the biomass reaction
    pub fn solve(&self, solver: &dyn FbaSolver) -> Result<FbaSolution, SolverError> {
        let objective = default_objective(&self.model)?;
        solver.solve(&self.model, &objective)
    }

    /// Run FBA on the current bounds with an explicit objective
    pub fn solve_with_objective(
        &self,
        solver: &dyn FbaSolver,
        objective: &IndexMap<String, f64>,
    ) -> Result<FbaSolution, SolverError> {
        solver.solve(&self.model, objective)
    }

    /// Wrap the organism in an Arc<RwLock<>> so it can be shared by environments
    pub fn wrap(self) -> OrganismRef {
        Arc::new(RwLock::new(self))
    }
}

impl Debug for Organism {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organism")
            .field("label", &self.label)
            .field("model", &self.model.id)
            .field("environment", &self.environment)
            .field(
                "update_policy",
                &self.update_policy.as_ref().map(|policy| policy.name()),
            )
            .finish()
    }
}

pub(crate) fn read_organism(
    organism: &OrganismRef,
) -> Result<RwLockReadGuard<'_, Organism>, DynamicsError> {
    organism.read().map_err(|_| DynamicsError::PoisonedOrganism)
}

pub(crate) fn write_organism(
    organism: &OrganismRef,
) -> Result<RwLockWriteGuard<'_, Organism>, DynamicsError> {
    organism.write().map_err(|_| DynamicsError::PoisonedOrganism)
}
