//! Module providing JSON IO for reactor setups and trajectories
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dynamics::bioreactor::Bioreactor;
use crate::dynamics::kinetics::Chemostat;
use crate::dynamics::simulation::Trajectory;
use crate::dynamics::DynamicsError;

// region Reactor Setup
/// Positional configuration of a bioreactor
///
/// Every vector follows the order of `organisms` (labels) or `metabolites`,
/// as in the bioreactor it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorSetup {
    pub organisms: Vec<String>,
    pub metabolites: Vec<String>,
    pub xfeed: Option<Vec<f64>>,
    pub sfeed: Option<Vec<f64>>,
    pub biomass: Vec<f64>,
    pub substrates: Vec<f64>,
    /// Dilution rate of a chemostat, None for other kinetic laws
    pub dilution_rate: Option<f64>,
    #[serde(default)]
    pub time: f64,
}

impl ReactorSetup {
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, JsonError> {
        let setup_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&setup_str)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Bioreactor {
    /// Snapshot of the feeds, concentrations and kinetics of the reactor
    pub fn setup(&self) -> Result<ReactorSetup, DynamicsError> {
        Ok(ReactorSetup {
            organisms: self.environment().organism_labels()?,
            metabolites: self.metabolites().to_vec(),
            xfeed: self.xfeed().map(<[f64]>::to_vec),
            sfeed: self.sfeed().map(<[f64]>::to_vec),
            biomass: self.biomass().to_vec(),
            substrates: self.substrates().to_vec(),
            dilution_rate: self.kinetics().dilution_rate(),
            time: self.time(),
        })
    }

    /// Load feeds, concentrations and time from a setup
    ///
    /// The setup's organism labels and metabolites must match the reactor's,
    /// in order. Nothing is changed unless the whole setup fits. A dilution
    /// rate replaces the kinetics with a [`Chemostat`], otherwise the current
    /// kinetics is kept.
    pub fn apply_setup(&mut self, setup: &ReactorSetup) -> Result<(), JsonError> {
        let labels = self.environment().organism_labels()?;
        if labels != setup.organisms {
            return Err(JsonError::SetupMismatch {
                what: "organisms",
                expected: labels,
                found: setup.organisms.clone(),
            });
        }
        if self.metabolites() != setup.metabolites.as_slice() {
            return Err(JsonError::SetupMismatch {
                what: "metabolites",
                expected: self.metabolites().to_vec(),
                found: setup.metabolites.clone(),
            });
        }
        let n_organisms = labels.len();
        let n_metabolites = setup.metabolites.len();
        let checks = [
            ("biomass", n_organisms, Some(setup.biomass.len())),
            ("Xfeed", n_organisms, setup.xfeed.as_ref().map(Vec::len)),
            ("substrates", n_metabolites, Some(setup.substrates.len())),
            ("Sfeed", n_metabolites, setup.sfeed.as_ref().map(Vec::len)),
        ];
        for (what, expected, found) in checks {
            if let Some(found) = found.filter(|found| *found != expected) {
                return Err(DynamicsError::Dimension {
                    what,
                    expected,
                    found,
                }
                .into());
            }
        }

        self.set_biomass(&setup.biomass)?;
        self.set_substrates(&setup.substrates)?;
        if let Some(xfeed) = &setup.xfeed {
            self.set_xfeed(xfeed)?;
        }
        if let Some(sfeed) = &setup.sfeed {
            self.set_sfeed(sfeed)?;
        }
        if let Some(dilution_rate) = setup.dilution_rate {
            self.set_kinetics(Chemostat::new(dilution_rate));
        }
        self.set_time(setup.time);
        Ok(())
    }
}
// endregion Reactor Setup

// region Trajectory
impl Trajectory {
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, JsonError> {
        let trajectory_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&trajectory_str)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// The trajectory as a JSON value, mainly for embedding in other documents
    pub fn to_json_value(&self) -> Result<Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }
}
// endregion Trajectory

/// Errors raised while reading or writing JSON files
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Serde json parse error")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to read or write file")]
    Io(#[from] std::io::Error),
    #[error("Setup doesn't fit the reactor: {0}")]
    Dynamics(#[from] DynamicsError),
    #[error("Setup {what} {found:?} don't match the reactor's {expected:?}")]
    SetupMismatch {
        what: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },
}
