//! Dynamic multi-organism flux balance analysis.
//!
//! Organisms wrap private copies of constraint based metabolic models and
//! share a pool of tracked metabolites inside an environment. A bioreactor
//! couples their FBA solutions to biomass and substrate concentrations and
//! integrates them forward in time.

pub mod configuration;
pub mod dynamics;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
