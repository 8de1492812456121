//! Step reports, stop conditions and recorded trajectories
use serde::{Deserialize, Serialize};

use crate::dynamics::bioreactor::Bioreactor;
use crate::optimize::OptimizationStatus;

/// Outcome of one organism's solve during a time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismStep {
    pub label: String,
    pub status: OptimizationStatus,
    /// Growth rate, 0 if the solve wasn't optimal
    pub growth_rate: f64,
    /// Factor growth and exchange fluxes were scaled by so uptake stays
    /// within what the reactor holds, 1 if uptake wasn't limited
    pub uptake_scale: f64,
    /// Flux through the exchange reaction of every tracked metabolite, in
    /// metabolite order, all 0 if the solve wasn't optimal
    pub exchange_fluxes: Vec<f64>,
}

impl OrganismStep {
    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }
}

/// Everything that happened during a single time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Simulation time at the end of the step
    pub time: f64,
    /// Step size
    pub dt: f64,
    /// Per organism outcomes, in organism order
    pub organisms: Vec<OrganismStep>,
    /// Biomass concentrations at the end of the step
    pub biomass: Vec<f64>,
    /// Substrate concentrations at the end of the step
    pub substrates: Vec<f64>,
}

impl StepReport {
    pub fn all_optimal(&self) -> bool {
        self.organisms.iter().all(OrganismStep::is_optimal)
    }

    /// Indices of the organisms whose solve was not optimal
    pub fn failed_organisms(&self) -> Vec<usize> {
        self.organisms
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.is_optimal())
            .map(|(index, _)| index)
            .collect()
    }

    /// Indices of the organisms whose uptake was scaled down to the available substrate
    pub fn limited_organisms(&self) -> Vec<usize> {
        self.organisms
            .iter()
            .enumerate()
            .filter(|(_, step)| step.uptake_scale < 1.)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Caller supplied policy deciding when a simulation run ends
///
/// Checked after every step. Any `FnMut(&Bioreactor, &StepReport) -> bool`
/// is a stop condition.
pub trait StopCondition {
    fn should_stop(&mut self, reactor: &Bioreactor, report: &StepReport) -> bool;
}

impl<F> StopCondition for F
where
    F: FnMut(&Bioreactor, &StepReport) -> bool,
{
    fn should_stop(&mut self, reactor: &Bioreactor, report: &StepReport) -> bool {
        self(reactor, report)
    }
}

/// Stop once the simulation clock reaches a fixed end time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon(pub f64);

impl StopCondition for Horizon {
    fn should_stop(&mut self, reactor: &Bioreactor, _report: &StepReport) -> bool {
        // Allow for rounding when the horizon is a multiple of the step size
        let slack = 1e-9 * self.0.abs().max(1.);
        reactor.time() >= self.0 - slack
    }
}

/// Stop after a fixed number of steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxSteps {
    max: usize,
    taken: usize,
}

impl MaxSteps {
    pub fn new(max: usize) -> Self {
        MaxSteps { max, taken: 0 }
    }
}

impl StopCondition for MaxSteps {
    fn should_stop(&mut self, _reactor: &Bioreactor, _report: &StepReport) -> bool {
        self.taken += 1;
        self.taken >= self.max
    }
}

/// Stop once no concentration changes faster than `tolerance` per unit time
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyState {
    pub tolerance: f64,
    previous: Option<Vec<f64>>,
}

impl SteadyState {
    pub fn new(tolerance: f64) -> Self {
        SteadyState {
            tolerance,
            previous: None,
        }
    }
}

impl StopCondition for SteadyState {
    fn should_stop(&mut self, _reactor: &Bioreactor, report: &StepReport) -> bool {
        let state: Vec<f64> = report
            .biomass
            .iter()
            .chain(&report.substrates)
            .copied()
            .collect();
        let settled = match &self.previous {
            Some(previous) if previous.len() == state.len() => previous
                .iter()
                .zip(&state)
                .all(|(before, after)| ((after - before) / report.dt).abs() < self.tolerance),
            _ => false,
        };
        self.previous = Some(state);
        settled
    }
}

/// Recorded history of a simulation run
///
/// Row `k` of `biomass` and `substrates` is the state at `time[k]`, columns
/// follow the order of `organisms` and `metabolites`. `statuses[k]` holds
/// the solver status of every organism during the step that ended at
/// `time[k + 1]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub organisms: Vec<String>,
    pub metabolites: Vec<String>,
    pub time: Vec<f64>,
    pub biomass: Vec<Vec<f64>>,
    pub substrates: Vec<Vec<f64>>,
    pub statuses: Vec<Vec<OptimizationStatus>>,
}

impl Trajectory {
    pub fn new(organisms: Vec<String>, metabolites: Vec<String>) -> Self {
        Trajectory {
            organisms,
            metabolites,
            ..Trajectory::default()
        }
    }

    /// Record the state before the first step
    pub(crate) fn record_initial(&mut self, time: f64, biomass: &[f64], substrates: &[f64]) {
        self.time.push(time);
        self.biomass.push(biomass.to_vec());
        self.substrates.push(substrates.to_vec());
    }

    pub(crate) fn record(&mut self, report: &StepReport) {
        self.time.push(report.time);
        self.biomass.push(report.biomass.clone());
        self.substrates.push(report.substrates.clone());
        self.statuses
            .push(report.organisms.iter().map(|step| step.status).collect());
    }

    /// Number of recorded time points
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Biomass of one organism over time
    pub fn biomass_series(&self, organism: usize) -> Option<Vec<f64>> {
        self.biomass
            .iter()
            .map(|row| row.get(organism).copied())
            .collect()
    }

    /// Concentration of one tracked metabolite over time
    pub fn substrate_series(&self, metabolite: usize) -> Option<Vec<f64>> {
        self.substrates
            .iter()
            .map(|row| row.get(metabolite).copied())
            .collect()
    }
}
