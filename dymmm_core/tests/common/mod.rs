//! Shared fixtures: a glucose eating acetate producer and an acetate consumer
#![allow(dead_code)]
use dymmm_core::dynamics::{
    Bioreactor, MichaelisMentenUptake, Organism, OrganismRef, PolicyChain, SecretionOnly,
};
use dymmm_core::metabolic_model::metabolite::Metabolite;
use dymmm_core::metabolic_model::model::Model;
use dymmm_core::metabolic_model::reaction::ReactionBuilder;
use dymmm_core::optimize::solvers::clarabel::ClarabelSolver;
use indexmap::IndexMap;
use std::sync::Arc;

pub const GLUCOSE: &str = "EX_glc_e";
pub const ACETATE: &str = "EX_ac_e";

fn add_reaction(model: &mut Model, id: &str, stoichiometry: &[(&str, f64)], lb: f64, ub: f64) {
    model
        .add_reaction(
            ReactionBuilder::default()
                .id(id)
                .metabolites(
                    stoichiometry
                        .iter()
                        .map(|(met, coef)| (met.to_string(), *coef))
                        .collect::<IndexMap<_, _>>(),
                )
                .lower_bound(Some(lb))
                .upper_bound(Some(ub))
                .build()
                .unwrap(),
        )
        .unwrap();
}

/// Grows on glucose at 0.1 gDW/mmol and releases 5 mmol acetate per gDW
pub fn producer_model() -> Model {
    let mut model = Model::new("producer");
    model.add_metabolites([
        Metabolite::new("glc_e", Some("e")),
        Metabolite::new("glc_c", Some("c")),
        Metabolite::new("ac_c", Some("c")),
        Metabolite::new("ac_e", Some("e")),
    ]);
    add_reaction(&mut model, GLUCOSE, &[("glc_e", -1.)], -10., 1000.);
    add_reaction(&mut model, "GLCt", &[("glc_e", -1.), ("glc_c", 1.)], 0., 1000.);
    add_reaction(&mut model, "BIOMASS", &[("glc_c", -10.), ("ac_c", 5.)], 0., 1000.);
    add_reaction(&mut model, "ACt", &[("ac_c", -1.), ("ac_e", 1.)], 0., 1000.);
    add_reaction(&mut model, ACETATE, &[("ac_e", -1.)], 0., 1000.);
    model.set_objective("BIOMASS", 1.).unwrap();
    model
}

/// Grows on acetate at 0.2 gDW/mmol, has no objective so the biomass
/// reaction is detected by name
pub fn consumer_model() -> Model {
    let mut model = Model::new("consumer");
    model.add_metabolites([
        Metabolite::new("ac_e", Some("e")),
        Metabolite::new("ac_c", Some("c")),
    ]);
    add_reaction(&mut model, ACETATE, &[("ac_e", -1.)], -10., 1000.);
    add_reaction(&mut model, "ACt", &[("ac_e", -1.), ("ac_c", 1.)], 0., 1000.);
    add_reaction(&mut model, "Biomass_consumer", &[("ac_c", -5.)], 0., 1000.);
    model
}

pub fn producer() -> OrganismRef {
    Organism::new(&producer_model())
        .with_update_policy(
            PolicyChain::new()
                .then(MichaelisMentenUptake::new(GLUCOSE, GLUCOSE, 10., 0.5))
                .then(SecretionOnly::new(ACETATE)),
        )
        .wrap()
}

pub fn consumer() -> OrganismRef {
    Organism::new(&consumer_model())
        .with_update_policy(MichaelisMentenUptake::new(ACETATE, ACETATE, 8., 0.5))
        .wrap()
}

/// Batch co-culture with glucose at 10 mM and a little acetate
pub fn co_culture() -> Bioreactor {
    let mut reactor = Bioreactor::new(
        vec![producer(), consumer()],
        [GLUCOSE, ACETATE],
        Arc::new(ClarabelSolver::default()),
    )
    .unwrap();
    reactor.set_biomass(&[0.05, 0.05]).unwrap();
    reactor.set_substrates(&[10., 1.]).unwrap();
    reactor
}
