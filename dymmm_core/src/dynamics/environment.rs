//! Provides the Environment, the ordered collection of organisms and
//! tracked metabolites shared by a simulation
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dynamics::organism::{read_organism, write_organism, OrganismRef};
use crate::dynamics::DynamicsError;

/// Identifier of an environment, used by organisms to refer back to their
/// host without owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentId(Uuid);

impl EnvironmentId {
    pub fn new() -> Self {
        EnvironmentId(Uuid::new_v4())
    }
}

impl Default for EnvironmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EnvironmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read only view of an environment handed to update policies
pub trait HostEnvironment {
    fn id(&self) -> EnvironmentId;

    /// Tracked metabolite ids, in insertion order
    fn metabolites(&self) -> &[String];

    /// Number of organisms (counting repeats)
    fn organism_count(&self) -> usize;

    /// Current concentration of a tracked metabolite, None if the metabolite
    /// isn't tracked or the environment has no shared pool
    fn concentration(&self, metabolite: &str) -> Option<f64>;

    /// Current simulation time
    fn time(&self) -> f64;

    /// Position of the first occurrence of a tracked metabolite
    fn metabolite_index(&self, metabolite: &str) -> Option<usize> {
        self.metabolites().iter().position(|met| met == metabolite)
    }
}

/// Ordered, duplicate permitting collections of organisms and metabolites
#[derive(Debug)]
pub struct Environment {
    id: EnvironmentId,
    organisms: Vec<OrganismRef>,
    metabolites: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            id: EnvironmentId::new(),
            organisms: Vec::new(),
            metabolites: Vec::new(),
        }
    }

    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    pub fn organisms(&self) -> &[OrganismRef] {
        &self.organisms
    }

    pub fn metabolites(&self) -> &[String] {
        &self.metabolites
    }

    /// Append an organism, and point its environment at this one
    ///
    /// Adding an organism that is already present appends it again.
    pub fn add_organism(&mut self, organism: OrganismRef) -> Result<(), DynamicsError> {
        write_organism(&organism)?.attach(self.id);
        self.organisms.push(organism);
        Ok(())
    }

    /// Append several organisms, in order
    pub fn add_organisms<I: IntoIterator<Item = OrganismRef>>(
        &mut self,
        organisms: I,
    ) -> Result<(), DynamicsError> {
        for organism in organisms {
            self.add_organism(organism)?;
        }
        Ok(())
    }

    /// Append a tracked metabolite, duplicates are kept
    pub fn add_metabolite<S: Into<String>>(&mut self, metabolite: S) {
        self.metabolites.push(metabolite.into());
    }

    /// Append several tracked metabolites, in order
    pub fn add_metabolites<I, S>(&mut self, metabolites: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metabolites
            .extend(metabolites.into_iter().map(Into::into));
    }

    /// Whether this exact organism (not an equal copy) is in the environment
    pub fn contains(&self, organism: &OrganismRef) -> bool {
        self.organisms.iter().any(|o| Arc::ptr_eq(o, organism))
    }

    /// Remove the organism at `index`, returning it
    ///
    /// The organism's environment is cleared once its last occurrence is gone.
    pub(crate) fn remove_organism(&mut self, index: usize) -> Result<OrganismRef, DynamicsError> {
        if index >= self.organisms.len() {
            return Err(DynamicsError::IndexOutOfRange {
                what: "organism",
                index,
                len: self.organisms.len(),
            });
        }
        let organism = self.organisms.remove(index);
        if !self.contains(&organism) {
            write_organism(&organism)?.detach(self.id);
        }
        Ok(organism)
    }

    /// Remove the tracked metabolite at `index`, returning its id
    pub(crate) fn remove_metabolite(&mut self, index: usize) -> Result<String, DynamicsError> {
        if index >= self.metabolites.len() {
            return Err(DynamicsError::IndexOutOfRange {
                what: "metabolite",
                index,
                len: self.metabolites.len(),
            });
        }
        Ok(self.metabolites.remove(index))
    }

    /// Labels of the organisms, in order
    pub fn organism_labels(&self) -> Result<Vec<String>, DynamicsError> {
        self.organisms
            .iter()
            .map(|o| Ok(read_organism(o)?.label().to_string()))
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment for Environment {
    fn id(&self) -> EnvironmentId {
        self.id
    }

    fn metabolites(&self) -> &[String] {
        &self.metabolites
    }

    fn organism_count(&self) -> usize {
        self.organisms.len()
    }

    fn concentration(&self, _metabolite: &str) -> Option<f64> {
        None
    }

    fn time(&self) -> f64 {
        0.
    }
}
