//! Kinetic laws turning growth rates, exchange fluxes and feeds into time
//! derivatives of the reactor state
use std::fmt::Debug;

/// Rate law applied to every organism and metabolite of a bioreactor
///
/// Rates are per unit time, the bioreactor integrates them with an explicit
/// Euler step.
pub trait KineticLaw: Debug + Send + Sync {
    /// dX/dt for one organism
    ///
    /// # Parameters
    /// - `growth_rate`: specific growth rate from FBA (1/h)
    /// - `biomass`: current biomass concentration (gDW/L)
    /// - `feed`: biomass feed entry for the organism
    fn biomass_rate(&self, growth_rate: f64, biomass: f64, feed: f64) -> f64;

    /// dS/dt for one tracked metabolite
    ///
    /// # Parameters
    /// - `net_exchange`: sum over organisms of exchange flux times biomass (mmol/L/h)
    /// - `concentration`: current concentration (mmol/L)
    /// - `feed`: substrate feed entry for the metabolite
    fn substrate_rate(&self, net_exchange: f64, concentration: f64, feed: f64) -> f64;

    /// Dilution rate, for laws that have one
    fn dilution_rate(&self) -> Option<f64> {
        None
    }
}

/// Continuously stirred reactor with a dilution rate `D`
///
/// ```text
/// dX/dt = mu X + D (Xfeed - X)
/// dS/dt = sum(v X) + D (Sfeed - S)
/// ```
/// The feeds are inflow concentrations. With `D = 0` this is a batch reactor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Chemostat {
    pub dilution_rate: f64,
}

impl Chemostat {
    pub fn new(dilution_rate: f64) -> Self {
        Chemostat { dilution_rate }
    }

    pub fn batch() -> Self {
        Chemostat { dilution_rate: 0. }
    }
}

impl KineticLaw for Chemostat {
    fn biomass_rate(&self, growth_rate: f64, biomass: f64, feed: f64) -> f64 {
        growth_rate * biomass + self.dilution_rate * (feed - biomass)
    }

    fn substrate_rate(&self, net_exchange: f64, concentration: f64, feed: f64) -> f64 {
        net_exchange + self.dilution_rate * (feed - concentration)
    }

    fn dilution_rate(&self) -> Option<f64> {
        Some(self.dilution_rate)
    }
}

/// Fed-batch reactor, the feeds are added as absolute rates with no outflow
///
/// ```text
/// dX/dt = mu X + Xfeed
/// dS/dt = sum(v X) + Sfeed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FedBatch;

impl KineticLaw for FedBatch {
    fn biomass_rate(&self, growth_rate: f64, biomass: f64, feed: f64) -> f64 {
        growth_rate * biomass + feed
    }

    fn substrate_rate(&self, net_exchange: f64, _concentration: f64, feed: f64) -> f64 {
        net_exchange + feed
    }
}
