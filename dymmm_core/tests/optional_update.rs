//! Runs in its own test binary since it changes the global configuration
mod common;

use approx::assert_relative_eq;
use common::{producer_model, GLUCOSE};
use dymmm_core::configuration::CONFIGURATION;
use dymmm_core::dynamics::{Bioreactor, Organism};

#[test]
fn organisms_without_policy_keep_their_bounds() {
    let organism = Organism::new(&producer_model()).wrap();
    let mut reactor = Bioreactor::with_default_solver(vec![organism], [GLUCOSE]).unwrap();
    reactor.set_biomass(&[0.5]).unwrap();
    reactor.set_substrates(&[20.]).unwrap();
    assert!(reactor.step(0.1).is_err());

    CONFIGURATION.write().unwrap().require_update_policy = false;
    let report = reactor.step(0.1).unwrap();
    CONFIGURATION.write().unwrap().require_update_policy = true;

    assert!(report.all_optimal());
    // uptake stays at the model's -10 bound
    assert_relative_eq!(report.organisms[0].growth_rate, 1., epsilon = 1e-5);
    assert_relative_eq!(reactor.biomass()[0], 0.55, epsilon = 1e-5);
    assert_relative_eq!(reactor.substrates()[0], 19.5, epsilon = 1e-5);
}
