//! Ready made update policies for exchange reactions
use crate::dynamics::environment::HostEnvironment;
use crate::dynamics::organism::{Organism, UpdatePolicy};
use crate::dynamics::DynamicsError;

/// Saturating uptake of a tracked metabolite through an exchange reaction
///
/// Sets the exchange bounds to `(-vmax * S / (km + S), 0)`, with `S` the
/// host's concentration of `metabolite` (0 if the host doesn't track it).
#[derive(Debug, Clone, PartialEq)]
pub struct MichaelisMentenUptake {
    /// Exchange reaction in the organism's model
    pub reaction: String,
    /// Tracked metabolite in the host environment
    pub metabolite: String,
    /// Maximum uptake rate (mmol/gDW/h)
    pub vmax: f64,
    /// Half saturation constant (mmol/L)
    pub km: f64,
}

impl MichaelisMentenUptake {
    pub fn new(reaction: &str, metabolite: &str, vmax: f64, km: f64) -> Self {
        MichaelisMentenUptake {
            reaction: reaction.to_string(),
            metabolite: metabolite.to_string(),
            vmax,
            km,
        }
    }

    /// Uptake rate at a concentration, as a positive number
    pub fn uptake_rate(&self, concentration: f64) -> f64 {
        let s = concentration.max(0.);
        if self.km + s <= 0. {
            return 0.;
        }
        self.vmax * s / (self.km + s)
    }
}

impl UpdatePolicy for MichaelisMentenUptake {
    fn update(
        &self,
        organism: &mut Organism,
        environment: &dyn HostEnvironment,
    ) -> Result<(), DynamicsError> {
        let concentration = environment.concentration(&self.metabolite).unwrap_or(0.);
        let lower_bound = -self.uptake_rate(concentration);
        organism
            .model_mut()
            .set_bounds(&self.reaction, Some(lower_bound), Some(0.))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "michaelis-menten uptake"
    }
}

/// Allow unlimited secretion and no uptake through an exchange reaction
#[derive(Debug, Clone, PartialEq)]
pub struct SecretionOnly {
    pub reaction: String,
}

impl SecretionOnly {
    pub fn new(reaction: &str) -> Self {
        SecretionOnly {
            reaction: reaction.to_string(),
        }
    }
}

impl UpdatePolicy for SecretionOnly {
    fn update(
        &self,
        organism: &mut Organism,
        _environment: &dyn HostEnvironment,
    ) -> Result<(), DynamicsError> {
        organism
            .model_mut()
            .set_bounds(&self.reaction, Some(0.), None)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "secretion only"
    }
}

/// Several policies applied one after the other, in order
#[derive(Default)]
pub struct PolicyChain {
    policies: Vec<Box<dyn UpdatePolicy>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<P: UpdatePolicy + 'static>(mut self, policy: P) -> Self {
        self.policies.push(Box::new(policy));
        self
    }
}

impl UpdatePolicy for PolicyChain {
    fn update(
        &self,
        organism: &mut Organism,
        environment: &dyn HostEnvironment,
    ) -> Result<(), DynamicsError> {
        for policy in &self.policies {
            policy.update(organism, environment)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "policy chain"
    }
}
