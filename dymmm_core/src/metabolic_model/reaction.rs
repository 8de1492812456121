//! This module provides a struct for representing reactions
use crate::configuration;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound, None if the reaction is unbounded below
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: Option<f64>,
    /// Upper flux bound, None if the reaction is unbounded above
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: Option<f64>,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
}

impl Reaction {
    /// Get the (lower, upper) bounds of the reaction
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.lower_bound, self.upper_bound)
    }

    /// Lower bound as a float, with an unbounded side mapped to -inf
    pub(crate) fn lower_bound_or_inf(&self) -> f64 {
        self.lower_bound.unwrap_or(f64::NEG_INFINITY)
    }

    /// Upper bound as a float, with an unbounded side mapped to +inf
    pub(crate) fn upper_bound_or_inf(&self) -> f64 {
        self.upper_bound.unwrap_or(f64::INFINITY)
    }

    /// Whether the reaction can carry flux in the reverse direction
    pub fn is_reversible(&self) -> bool {
        self.lower_bound_or_inf() < 0.
    }

    /// Whether the reaction is an exchange reaction, taken to mean that it
    /// involves a single metabolite
    pub fn is_exchange(&self) -> bool {
        self.metabolites.len() == 1
    }
}
