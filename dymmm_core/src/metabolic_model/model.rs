//! This module provides the Model struct for representing an entire metabolic model
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

use indexmap::IndexMap;
use thiserror::Error;

/// Represents a constraint based metabolic model
///
/// Cloning a model is a deep copy, so a clone can have its bounds changed
/// without affecting the model it was cloned from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Id associated with the Model
    pub id: Option<String>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model::default()
    }

    /// Create a new, empty model with an id
    pub fn new(id: &str) -> Self {
        Model {
            id: Some(id.to_string()),
            ..Model::default()
        }
    }

    /// Add a metabolite to the model, replacing any metabolite with the same id
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Add several metabolites to the model, in order
    pub fn add_metabolites<I: IntoIterator<Item = Metabolite>>(&mut self, metabolites: I) {
        metabolites
            .into_iter()
            .for_each(|met| self.add_metabolite(met));
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add, all the metabolites in its stoichiometry must
    ///   already be part of the model
    ///
    /// # Examples
    /// ```rust
    /// use dymmm_core::metabolic_model::metabolite::Metabolite;
    /// use dymmm_core::metabolic_model::model::Model;
    /// use dymmm_core::metabolic_model::reaction::ReactionBuilder;
    /// use indexmap::IndexMap;
    /// let mut model = Model::new_empty();
    /// model.add_metabolite(Metabolite::new("glc_e", Some("e")));
    /// let new_reaction = ReactionBuilder::default()
    ///     .id("EX_glc_e")
    ///     .metabolites(IndexMap::from([("glc_e".to_string(), -1.0)]))
    ///     .build()
    ///     .unwrap();
    /// model.add_reaction(new_reaction).unwrap();
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), ModelError> {
        if let Some(missing) = reaction
            .metabolites
            .keys()
            .find(|met| !self.metabolites.contains_key(*met))
        {
            return Err(ModelError::UnknownMetabolite {
                metabolite: missing.clone(),
                reaction: reaction.id.clone(),
            });
        }
        check_bounds(&reaction.id, reaction.lower_bound, reaction.upper_bound)?;
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
        Ok(())
    }

    /// Get a reaction by id
    pub fn reaction(&self, id: &str) -> Result<&Reaction, ModelError> {
        self.reactions
            .get(id)
            .ok_or_else(|| ModelError::UnknownReaction(id.to_string()))
    }

    /// Set the coefficient of a reaction in the objective
    pub fn set_objective(&mut self, reaction_id: &str, coefficient: f64) -> Result<(), ModelError> {
        self.reaction(reaction_id)?;
        self.objective.insert(reaction_id.to_string(), coefficient);
        Ok(())
    }

    // region Bounds
    /// Get the (lower, upper) bounds of a reaction
    pub fn get_bounds(&self, reaction_id: &str) -> Result<(Option<f64>, Option<f64>), ModelError> {
        Ok(self.reaction(reaction_id)?.bounds())
    }

    /// Update the bounds of a reaction, `None` leaves that side unbounded
    pub fn set_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    ) -> Result<(), ModelError> {
        check_bounds(reaction_id, lower_bound, upper_bound)?;
        match self.reactions.get_mut(reaction_id) {
            Some(rxn) => {
                rxn.lower_bound = lower_bound;
                rxn.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ModelError::UnknownReaction(reaction_id.to_string())),
        }
    }

    /// Bounds of every reaction, keyed by reaction id
    pub fn bounds(&self) -> IndexMap<String, (Option<f64>, Option<f64>)> {
        self.reactions
            .iter()
            .map(|(id, rxn)| (id.clone(), rxn.bounds()))
            .collect()
    }
    // endregion Bounds

    /// Stoichiometric coefficients keyed by (metabolite id, reaction id)
    pub fn stoichiometry(&self) -> IndexMap<(String, String), f64> {
        self.reactions
            .iter()
            .flat_map(|(rxn_id, rxn)| {
                rxn.metabolites
                    .iter()
                    .map(move |(met_id, coef)| ((met_id.clone(), rxn_id.clone()), *coef))
            })
            .collect()
    }

    /// Ids of the exchange reactions in the model
    pub fn exchange_reactions(&self) -> Vec<&str> {
        self.reactions
            .values()
            .filter(|rxn| rxn.is_exchange())
            .map(|rxn| rxn.id.as_str())
            .collect()
    }

    /// Find the biomass reaction of the model
    ///
    /// If the objective contains exactly one reaction that reaction is used,
    /// otherwise the first reaction with "biomass" in its id (ignoring case).
    pub fn detect_biomass_reaction(&self) -> Result<&str, ModelError> {
        if self.objective.len() == 1 {
            if let Some((id, _)) = self.objective.first() {
                return Ok(id.as_str());
            }
        }
        self.reactions
            .keys()
            .find(|id| id.to_lowercase().contains("biomass"))
            .map(|id| id.as_str())
            .ok_or(ModelError::NoBiomassReaction)
    }
}

/// Check that a pair of bounds is consistent
fn check_bounds(
    reaction_id: &str,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
) -> Result<(), ModelError> {
    if let (Some(lb), Some(ub)) = (lower_bound, upper_bound) {
        if lb > ub {
            return Err(ModelError::InvalidBounds {
                reaction: reaction_id.to_string(),
                lower_bound: lb,
                upper_bound: ub,
            });
        }
    }
    if lower_bound.is_some_and(f64::is_nan) || upper_bound.is_some_and(f64::is_nan) {
        return Err(ModelError::NanBound(reaction_id.to_string()));
    }
    Ok(())
}

/// Errors associated with building or modifying a Model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Error when a reaction references a metabolite that isn't in the model
    #[error("Reaction {reaction} references metabolite {metabolite} which is not in the model")]
    UnknownMetabolite { metabolite: String, reaction: String },
    /// Error when trying to access a reaction that doesn't exist
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    /// Error when trying to set lower_bound > upper_bound
    #[error("Tried to set bounds of {reaction} with lower_bound ({lower_bound}) > upper_bound ({upper_bound})")]
    InvalidBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    #[error("Tried to set a NaN bound on {0}")]
    NanBound(String),
    /// Error when no objective was given and no biomass reaction could be found
    #[error("Unable to detect a biomass reaction in the model")]
    NoBiomassReaction,
}
