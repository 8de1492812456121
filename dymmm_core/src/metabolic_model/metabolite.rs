//! This module provides the metabolite struct representing a metabolite

use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Whether the metabolite is a boundary species, boundary metabolites are
    /// left out of the steady state mass balance
    #[builder(default = "false")]
    pub boundary: bool,
}

impl Metabolite {
    /// Create a new metabolite with only an id and optional compartment
    pub fn new(id: &str, compartment: Option<&str>) -> Metabolite {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: compartment.map(str::to_string),
            charge: 0,
            formula: None,
            boundary: false,
        }
    }
}
