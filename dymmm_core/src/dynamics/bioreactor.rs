//! Provides the Bioreactor, an environment with biomass and substrate
//! concentrations that are advanced in time from per-organism FBA solutions
use std::sync::Arc;

use nalgebra::DVector;

use crate::configuration;
use crate::dynamics::environment::{Environment, EnvironmentId, HostEnvironment};
use crate::dynamics::kinetics::{FedBatch, KineticLaw};
use crate::dynamics::organism::{read_organism, write_organism, Organism, OrganismRef};
use crate::dynamics::simulation::{OrganismStep, StepReport, StopCondition, Trajectory};
use crate::dynamics::DynamicsError;
use crate::optimize::solvers::{default_solver, FbaSolver};
use crate::optimize::FbaSolution;

/// A well mixed reactor shared by several organisms
///
/// Biomass vectors are indexed like [`Bioreactor::organisms`], substrate
/// vectors like [`Bioreactor::metabolites`]. Tracked metabolites are
/// identified by the id of the matching exchange reaction in the organisms'
/// models.
#[derive(Debug)]
pub struct Bioreactor {
    environment: Environment,
    /// Biomass feed, one entry per organism
    xfeed: Option<DVector<f64>>,
    /// Substrate feed, one entry per tracked metabolite
    sfeed: Option<DVector<f64>>,
    /// Current biomass concentrations
    biomass: DVector<f64>,
    /// Current substrate concentrations
    substrates: DVector<f64>,
    time: f64,
    kinetics: Arc<dyn KineticLaw>,
    solver: Arc<dyn FbaSolver>,
    solve_pool: SolvePool,
}

impl Bioreactor {
    // region Creation Functions
    /// Create a new bioreactor from organisms and tracked metabolites, both in order
    ///
    /// Feeds start unset, concentrations at 0, and the kinetics is
    /// [`FedBatch`], which behaves as a batch reactor until a feed is set.
    pub fn new<I, S>(
        organisms: Vec<OrganismRef>,
        metabolites: I,
        solver: Arc<dyn FbaSolver>,
    ) -> Result<Self, DynamicsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut environment = Environment::new();
        environment.add_organisms(organisms)?;
        environment.add_metabolites(metabolites);
        let n_organisms = environment.organisms().len();
        let n_metabolites = environment.metabolites().len();
        Ok(Bioreactor {
            environment,
            xfeed: None,
            sfeed: None,
            biomass: DVector::zeros(n_organisms),
            substrates: DVector::zeros(n_metabolites),
            time: 0.,
            kinetics: Arc::new(FedBatch),
            solver,
            solve_pool: SolvePool::default(),
        })
    }

    /// Create a new bioreactor using the configured default solver
    pub fn with_default_solver<I, S>(
        organisms: Vec<OrganismRef>,
        metabolites: I,
    ) -> Result<Self, DynamicsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(organisms, metabolites, default_solver()?)
    }

    /// Set the kinetic law
    pub fn with_kinetics<K: KineticLaw + 'static>(mut self, kinetics: K) -> Self {
        self.set_kinetics(kinetics);
        self
    }
    // endregion Creation Functions

    // region Accessors
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn organisms(&self) -> &[OrganismRef] {
        self.environment.organisms()
    }

    pub fn metabolites(&self) -> &[String] {
        self.environment.metabolites()
    }

    /// Biomass feed, None until it has been set
    pub fn xfeed(&self) -> Option<&[f64]> {
        self.xfeed.as_ref().map(|feed| feed.as_slice())
    }

    /// Substrate feed, None until it has been set
    pub fn sfeed(&self) -> Option<&[f64]> {
        self.sfeed.as_ref().map(|feed| feed.as_slice())
    }

    pub fn biomass(&self) -> &[f64] {
        self.biomass.as_slice()
    }

    pub fn substrates(&self) -> &[f64] {
        self.substrates.as_slice()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn kinetics(&self) -> &dyn KineticLaw {
        self.kinetics.as_ref()
    }

    pub fn solver(&self) -> &dyn FbaSolver {
        self.solver.as_ref()
    }
    // endregion Accessors

    // region Setters
    /// Replace the biomass feed, must have one entry per organism
    pub fn set_xfeed(&mut self, feed: &[f64]) -> Result<(), DynamicsError> {
        self.check_organism_dimension("Xfeed", feed.len())?;
        self.xfeed = Some(DVector::from_column_slice(feed));
        Ok(())
    }

    /// Replace the substrate feed, must have one entry per tracked metabolite
    pub fn set_sfeed(&mut self, feed: &[f64]) -> Result<(), DynamicsError> {
        self.check_metabolite_dimension("Sfeed", feed.len())?;
        self.sfeed = Some(DVector::from_column_slice(feed));
        Ok(())
    }

    /// Replace the biomass concentrations, must have one entry per organism
    pub fn set_biomass(&mut self, biomass: &[f64]) -> Result<(), DynamicsError> {
        self.check_organism_dimension("biomass", biomass.len())?;
        self.biomass = DVector::from_column_slice(biomass);
        Ok(())
    }

    /// Replace the substrate concentrations, must have one entry per tracked metabolite
    pub fn set_substrates(&mut self, substrates: &[f64]) -> Result<(), DynamicsError> {
        self.check_metabolite_dimension("substrates", substrates.len())?;
        self.substrates = DVector::from_column_slice(substrates);
        Ok(())
    }

    pub fn set_kinetics<K: KineticLaw + 'static>(&mut self, kinetics: K) {
        self.kinetics = Arc::new(kinetics);
    }

    pub fn set_solver(&mut self, solver: Arc<dyn FbaSolver>) {
        self.solver = solver;
    }

    /// Reset the simulation clock, for instance after loading a saved state
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }
    // endregion Setters

    // region Adding and Removing
    /// Append an organism with an initial biomass of 0
    ///
    /// A biomass feed that was already set gets a 0 entry for the new organism.
    pub fn add_organism(&mut self, organism: OrganismRef) -> Result<(), DynamicsError> {
        self.environment.add_organism(organism)?;
        let n = self.environment.organisms().len();
        self.biomass = grow(&self.biomass, n);
        self.xfeed = self.xfeed.as_ref().map(|feed| grow(feed, n));
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

    /// Append a tracked metabolite with an initial concentration of 0
    ///
    /// A substrate feed that was already set gets a 0 entry for the new metabolite.
    pub fn add_metabolite<S: Into<String>>(&mut self, metabolite: S) {
        self.environment.add_metabolite(metabolite);
        let n = self.environment.metabolites().len();
        self.substrates = grow(&self.substrates, n);
        self.sfeed = self.sfeed.as_ref().map(|feed| grow(feed, n));
    }

    /// Append several tracked metabolites, in order
    pub fn add_metabolites<I, S>(&mut self, metabolites: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for metabolite in metabolites {
            self.add_metabolite(metabolite);
        }
    }

    /// Remove the organism at `index` along with its biomass and feed entries
    pub fn remove_organism(&mut self, index: usize) -> Result<OrganismRef, DynamicsError> {
        let organism = self.environment.remove_organism(index)?;
        self.biomass = self.biomass.clone().remove_row(index);
        self.xfeed = self.xfeed.take().map(|feed| feed.remove_row(index));
        Ok(organism)
    }

    /// Remove the tracked metabolite at `index` along with its concentration and feed entries
    pub fn remove_metabolite(&mut self, index: usize) -> Result<String, DynamicsError> {
        let metabolite = self.environment.remove_metabolite(index)?;
        self.substrates = self.substrates.clone().remove_row(index);
        self.sfeed = self.sfeed.take().map(|feed| feed.remove_row(index));
        Ok(metabolite)
    }
    // endregion Adding and Removing

    // region Integration
    /// Advance the reactor by one time step of size `dt`
    ///
    /// 1. every organism, in order, updates its bounds from the current state;
    ///    the new bounds are only kept if every update succeeds
    /// 2. every organism, in order, is solved; a non-optimal solve gives that
    ///    organism zero growth and zero exchange for this step
    /// 3. organisms that would take up more of a metabolite than the reactor
    ///    holds have their growth and exchange fluxes scaled down
    /// 4. biomass is integrated organism by organism
    /// 5. substrates are integrated, summing exchange flux times biomass over
    ///    organisms in order
    /// 6. the clock advances by `dt`
    ///
    /// Rates are evaluated on the state at the start of the step and
    /// concentrations are clamped at 0.
    pub fn step(&mut self, dt: f64) -> Result<StepReport, DynamicsError> {
        if !(dt.is_finite() && dt > 0.) {
            return Err(DynamicsError::InvalidTimeStep(dt));
        }
        self.warn_unused_feeds();
        self.update_organisms()?;
        let solutions = self.solve_organisms()?;
        let mut organisms = self.collect_steps(&solutions)?;
        self.limit_uptake(&mut organisms, dt);

        let biomass_start = self.biomass.clone();
        for (i, organism) in organisms.iter().enumerate() {
            let feed = self.xfeed.as_ref().map_or(0., |feed| feed[i]);
            let rate = self
                .kinetics
                .biomass_rate(organism.growth_rate, biomass_start[i], feed);
            self.biomass[i] = (biomass_start[i] + dt * rate).max(0.);
        }

        let net_exchange = net_exchange(&organisms, &biomass_start, self.substrates.len());
        for j in 0..self.substrates.len() {
            let feed = self.sfeed.as_ref().map_or(0., |feed| feed[j]);
            let concentration = self.substrates[j];
            let rate = self
                .kinetics
                .substrate_rate(net_exchange[j], concentration, feed);
            // Only rounding can take this below 0 once uptake is limited
            self.substrates[j] = (concentration + dt * rate).max(0.);
        }

        self.time += dt;
        log::debug!(
            "t = {:.4}: biomass {:?}, substrates {:?}",
            self.time,
            self.biomass.as_slice(),
            self.substrates.as_slice()
        );
        Ok(StepReport {
            time: self.time,
            dt,
            organisms,
            biomass: self.biomass.as_slice().to_vec(),
            substrates: self.substrates.as_slice().to_vec(),
        })
    }

    /// Step the reactor until `stop` says otherwise, recording every state
    pub fn run(
        &mut self,
        dt: f64,
        stop: &mut dyn StopCondition,
    ) -> Result<Trajectory, DynamicsError> {
        if !(dt.is_finite() && dt > 0.) {
            return Err(DynamicsError::InvalidTimeStep(dt));
        }
        let mut trajectory = Trajectory::new(
            self.environment.organism_labels()?,
            self.metabolites().to_vec(),
        );
        trajectory.record_initial(self.time, self.biomass(), self.substrates());
        log::info!(
            "Starting simulation of {} organisms and {} metabolites at t = {} with {}",
            self.organisms().len(),
            self.metabolites().len(),
            self.time,
            self.solver.name()
        );
        loop {
            let report = self.step(dt)?;
            trajectory.record(&report);
            if stop.should_stop(self, &report) {
                break;
            }
        }
        log::info!(
            "Simulation finished at t = {} after {} steps",
            self.time,
            trajectory.len() - 1
        );
        Ok(trajectory)
    }

    /// Let every organism refresh its bounds, strictly in order
    ///
    /// Updates run on copies, an organism listed twice sees its own earlier
    /// update. The copies replace the organisms only once all updates have
    /// succeeded, so a failing policy leaves every organism as it was.
    fn update_organisms(&self) -> Result<(), DynamicsError> {
        let require_policy = configuration::current().require_update_policy;
        let mut staged: Vec<(&OrganismRef, Organism)> = Vec::new();
        for organism in self.organisms() {
            let index = match staged.iter().position(|(o, _)| Arc::ptr_eq(*o, organism)) {
                Some(index) => index,
                None => {
                    staged.push((organism, read_organism(organism)?.clone()));
                    staged.len() - 1
                }
            };
            let copy = &mut staged[index].1;
            if !require_policy && !copy.has_update_policy() {
                log::trace!("{} has no update policy, keeping its bounds", copy.label());
                continue;
            }
            copy.update(self)?;
        }
        for (organism, updated) in staged {
            *write_organism(organism)? = updated;
        }
        Ok(())
    }

    /// Scale down organisms whose uptake would take more of a metabolite
    /// than the reactor holds over the step
    ///
    /// For every metabolite the supply is what the reactor holds plus what
    /// the feed and secretion add over the step. When the total uptake is
    /// larger, every organism taking it up is scaled by supply / uptake
    /// (the smallest factor over its metabolites), which keeps biomass
    /// formed in proportion to substrate consumed.
    fn limit_uptake(&self, organisms: &mut [OrganismStep], dt: f64) {
        let n_metabolites = self.substrates.len();
        let mut uptake = vec![0.; n_metabolites];
        for (i, organism) in organisms.iter().enumerate() {
            for (j, flux) in organism.exchange_fluxes.iter().enumerate() {
                uptake[j] += (-flux).max(0.) * self.biomass[i];
            }
        }
        let net = net_exchange(organisms, &self.biomass, n_metabolites);
        let factors: Vec<f64> = (0..n_metabolites)
            .map(|j| {
                if uptake[j] <= 0. {
                    return 1.;
                }
                let feed = self.sfeed.as_ref().map_or(0., |feed| feed[j]);
                let other = self
                    .kinetics
                    .substrate_rate(net[j] + uptake[j], self.substrates[j], feed);
                let supply = (self.substrates[j] + dt * other).max(0.);
                (supply / (dt * uptake[j])).min(1.)
            })
            .collect();

        for organism in organisms.iter_mut() {
            let scale = organism
                .exchange_fluxes
                .iter()
                .zip(&factors)
                .filter(|(flux, _)| **flux < 0.)
                .map(|(_, factor)| *factor)
                .fold(1., f64::min);
            if scale < 1. {
                log::warn!(
                    "{} would exhaust a substrate at t = {}, scaling its fluxes by {}",
                    organism.label,
                    self.time,
                    scale
                );
                organism.uptake_scale = scale;
                organism.growth_rate *= scale;
                organism
                    .exchange_fluxes
                    .iter_mut()
                    .for_each(|flux| *flux *= scale);
            }
        }
    }

    /// Feeds set under a law without inflow have no effect
    fn warn_unused_feeds(&self) {
        let has_feed = |feed: &Option<DVector<f64>>| {
            feed.as_ref().is_some_and(|feed| feed.iter().any(|f| *f != 0.))
        };
        let no_inflow = self.kinetics.dilution_rate() == Some(0.);
        if no_inflow && (has_feed(&self.xfeed) || has_feed(&self.sfeed)) {
            log::warn!(
                "Feeds are set but the kinetic law has a dilution rate of 0, they are ignored"
            );
        }
    }

    /// Solve every organism, results are in organism order
    fn solve_organisms(&self) -> Result<Vec<FbaSolution>, DynamicsError> {
        self.solve_pool.solve_all(self.organisms(), self.solver.as_ref())
    }

    /// Extract growth rates and exchange fluxes from the solutions
    fn collect_steps(
        &self,
        solutions: &[FbaSolution],
    ) -> Result<Vec<OrganismStep>, DynamicsError> {
        let metabolites = self.metabolites();
        self.organisms()
            .iter()
            .zip(solutions)
            .map(|(organism, solution)| {
                let label = read_organism(organism)?.label().to_string();
                if !solution.is_optimal() {
                    log::warn!(
                        "{} could not be solved at t = {} ({:?}), no growth this step",
                        label,
                        self.time,
                        solution.status
                    );
                    return Ok(OrganismStep {
                        label,
                        status: solution.status,
                        growth_rate: 0.,
                        uptake_scale: 1.,
                        exchange_fluxes: vec![0.; metabolites.len()],
                    });
                }
                Ok(OrganismStep {
                    label,
                    status: solution.status,
                    growth_rate: solution.objective_value.unwrap_or(0.),
                    uptake_scale: 1.,
                    exchange_fluxes: metabolites
                        .iter()
                        .map(|met| solution.flux(met).unwrap_or(0.))
                        .collect(),
                })
            })
            .collect()
    }
    // endregion Integration

    fn check_organism_dimension(
        &self,
        what: &'static str,
        found: usize,
    ) -> Result<(), DynamicsError> {
        let expected = self.organisms().len();
        if found != expected {
            return Err(DynamicsError::Dimension {
                what,
                expected,
                found,
            });
        }
        Ok(())
    }

    fn check_metabolite_dimension(
        &self,
        what: &'static str,
        found: usize,
    ) -> Result<(), DynamicsError> {
        let expected = self.metabolites().len();
        if found != expected {
            return Err(DynamicsError::Dimension {
                what,
                expected,
                found,
            });
        }
        Ok(())
    }
}

impl HostEnvironment for Bioreactor {
    fn id(&self) -> EnvironmentId {
        self.environment.id()
    }

    fn metabolites(&self) -> &[String] {
        self.environment.metabolites()
    }

    fn organism_count(&self) -> usize {
        self.environment.organisms().len()
    }

    fn concentration(&self, metabolite: &str) -> Option<f64> {
        self.metabolite_index(metabolite)
            .map(|index| self.substrates[index])
    }

    fn time(&self) -> f64 {
        self.time
    }
}

/// Copy of `vector` extended with zeros to length `n`
fn grow(vector: &DVector<f64>, n: usize) -> DVector<f64> {
    let mut grown = DVector::zeros(n);
    grown.rows_mut(0, vector.len()).copy_from(vector);
    grown
}

/// Sum over organisms of exchange flux times biomass, per metabolite
fn net_exchange(
    organisms: &[OrganismStep],
    biomass: &DVector<f64>,
    n_metabolites: usize,
) -> Vec<f64> {
    let mut net = vec![0.; n_metabolites];
    for (i, organism) in organisms.iter().enumerate() {
        for (j, flux) in organism.exchange_fluxes.iter().enumerate() {
            net[j] += flux * biomass[i];
        }
    }
    net
}

fn solve_one(
    organism: &OrganismRef,
    solver: &dyn FbaSolver,
) -> Result<FbaSolution, DynamicsError> {
    Ok(read_organism(organism)?.solve(solver)?)
}

fn solve_serial(
    organisms: &[OrganismRef],
    solver: &dyn FbaSolver,
) -> Result<Vec<FbaSolution>, DynamicsError> {
    organisms.iter().map(|o| solve_one(o, solver)).collect()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        use std::sync::Mutex;

        use rayon::prelude::*;

        /// Worker pool for the solve phase, built on first use and rebuilt
        /// only when the configured number of processes changes
        #[derive(Debug, Default)]
        struct SolvePool {
            cached: Mutex<Option<(usize, Arc<rayon::ThreadPool>)>>,
        }

        impl SolvePool {
            /// Solve every organism, in parallel when more than one process is configured
            ///
            /// Solves only read the organisms, and the results are collected in order.
            fn solve_all(
                &self,
                organisms: &[OrganismRef],
                solver: &dyn FbaSolver,
            ) -> Result<Vec<FbaSolution>, DynamicsError> {
                let processes = configuration::current().processes as usize;
                if processes <= 1 {
                    return solve_serial(organisms, solver);
                }
                let pool = self.pool(processes)?;
                pool.install(|| organisms.par_iter().map(|o| solve_one(o, solver)).collect())
            }

            fn pool(&self, processes: usize) -> Result<Arc<rayon::ThreadPool>, DynamicsError> {
                let mut cached = self
                    .cached
                    .lock()
                    .map_err(|_| DynamicsError::ThreadPool("pool cache lock poisoned".to_string()))?;
                if let Some((threads, pool)) = cached.as_ref() {
                    if *threads == processes {
                        return Ok(Arc::clone(pool));
                    }
                }
                log::debug!("Building a solve pool with {} threads", processes);
                let pool = Arc::new(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(processes)
                        .build()
                        .map_err(|err| DynamicsError::ThreadPool(err.to_string()))?,
                );
                *cached = Some((processes, Arc::clone(&pool)));
                Ok(pool)
            }
        }
    } else {
        #[derive(Debug, Default)]
        struct SolvePool;

        impl SolvePool {
            fn solve_all(
                &self,
                organisms: &[OrganismRef],
                solver: &dyn FbaSolver,
            ) -> Result<Vec<FbaSolution>, DynamicsError> {
                solve_serial(organisms, solver)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::kinetics::Chemostat;
    use crate::dynamics::simulation::{Horizon, MaxSteps};
    use crate::metabolic_model::metabolite::Metabolite;
    use crate::metabolic_model::model::Model;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::optimize::problem::LinearProgram;
    use crate::optimize::solvers::SolverError;
    use crate::optimize::OptimizationStatus;
    use approx::assert_relative_eq;
    use indexmap::IndexMap;

    /// Solver whose growth is proportional to the glucose uptake bound, so
    /// the expected state after a step can be worked out by hand
    #[derive(Debug)]
    struct UptakeLimited {
        yield_coefficient: f64,
    }

    impl FbaSolver for UptakeLimited {
        fn name(&self) -> &'static str {
            "uptake limited"
        }

        fn solve_lp(&self, _lp: &LinearProgram) -> Result<FbaSolution, SolverError> {
            Ok(FbaSolution::failed(OptimizationStatus::Unoptimized))
        }

        fn solve(
            &self,
            model: &Model,
            _objective: &IndexMap<String, f64>,
        ) -> Result<FbaSolution, SolverError> {
            let (lb, ub) = model.get_bounds("EX_glc")?;
            let uptake = lb.unwrap_or(0.);
            if uptake == 0. && ub == Some(0.) {
                return Ok(FbaSolution::failed(OptimizationStatus::Infeasible));
            }
            let growth = -uptake * self.yield_coefficient;
            Ok(FbaSolution {
                status: OptimizationStatus::Optimal,
                objective_value: Some(growth),
                fluxes: Some(IndexMap::from([
                    ("EX_glc".to_string(), uptake),
                    ("BIOMASS".to_string(), growth),
                ])),
            })
        }
    }

    fn setup_model() -> Model {
        let mut model = Model::new("toy");
        model.add_metabolite(Metabolite::new("glc_e", Some("e")));
        for id in ["EX_glc", "BIOMASS"] {
            model
                .add_reaction(
                    ReactionBuilder::default()
                        .id(id)
                        .metabolites(IndexMap::from([("glc_e".to_string(), -1.)]))
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        model.set_objective("BIOMASS", 1.).unwrap();
        model
    }

    /// Organism taking up glucose at a fixed rate, or none once it's gone
    fn fixed_uptake(rate: f64) -> OrganismRef {
        Organism::new(&setup_model())
            .with_update_policy(
                move |organism: &mut Organism,
                      env: &dyn HostEnvironment|
                      -> Result<(), DynamicsError> {
                    let glucose = env.concentration("EX_glc").unwrap_or(0.);
                    let lb = if glucose > 0. { -rate } else { 0. };
                    organism.model_mut().set_bounds("EX_glc", Some(lb), Some(0.))?;
                    Ok(())
                },
            )
            .wrap()
    }

    fn setup_reactor(organisms: Vec<OrganismRef>) -> Bioreactor {
        Bioreactor::new(
            organisms,
            ["EX_glc"],
            Arc::new(UptakeLimited {
                yield_coefficient: 0.1,
            }),
        )
        .unwrap()
    }

    #[test]
    fn new_reactor_is_empty() {
        let reactor = setup_reactor(vec![fixed_uptake(2.), fixed_uptake(2.)]);
        assert_eq!(reactor.biomass(), &[0., 0.]);
        assert_eq!(reactor.substrates(), &[0.]);
        assert_eq!(reactor.xfeed(), None);
        assert_eq!(reactor.sfeed(), None);
        assert_eq!(reactor.time(), 0.);
        assert_eq!(reactor.kinetics().dilution_rate(), None);
        for organism in reactor.organisms() {
            assert_eq!(
                organism.read().unwrap().environment(),
                Some(reactor.environment().id())
            );
        }
    }

    #[test]
    fn xfeed_dimension_checked() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.), fixed_uptake(2.)]);
        reactor.set_xfeed(&[1., 1.]).unwrap();
        assert_eq!(reactor.xfeed(), Some(&[1., 1.][..]));
        assert_eq!(
            reactor.set_xfeed(&[1., 2., 3.]),
            Err(DynamicsError::Dimension {
                what: "Xfeed",
                expected: 2,
                found: 3
            })
        );
        assert_eq!(reactor.xfeed(), Some(&[1., 1.][..]));
    }

    #[test]
    fn sfeed_dimension_checked() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        assert!(reactor.set_sfeed(&[]).is_err());
        assert_eq!(reactor.sfeed(), None);
        reactor.set_sfeed(&[20.]).unwrap();
        assert_eq!(reactor.sfeed(), Some(&[20.][..]));
        assert!(reactor.set_substrates(&[1., 2.]).is_err());
        assert!(reactor.set_biomass(&[1., 2.]).is_err());
        assert_eq!(reactor.substrates(), &[0.]);
        assert_eq!(reactor.biomass(), &[0.]);
    }

    #[test]
    fn batch_euler_step() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();

        let report = reactor.step(0.1).unwrap();
        assert!(report.all_optimal());
        assert_relative_eq!(report.organisms[0].growth_rate, 0.2, epsilon = 1e-12);
        assert_eq!(report.organisms[0].exchange_fluxes, vec![-2.]);
        // X + dt * mu * X
        assert_relative_eq!(reactor.biomass()[0], 0.51, epsilon = 1e-12);
        // S + dt * v * X
        assert_relative_eq!(reactor.substrates()[0], 9.9, epsilon = 1e-12);
        assert_relative_eq!(reactor.time(), 0.1, epsilon = 1e-12);
        assert_eq!(report.biomass, reactor.biomass());
    }

    #[test]
    fn chemostat_euler_step() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]).with_kinetics(Chemostat::new(0.5));
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        reactor.set_xfeed(&[0.]).unwrap();
        reactor.set_sfeed(&[20.]).unwrap();

        reactor.step(0.1).unwrap();
        // 0.5 + 0.1 * (0.2 * 0.5 + 0.5 * (0 - 0.5))
        assert_relative_eq!(reactor.biomass()[0], 0.485, epsilon = 1e-12);
        // 10 + 0.1 * (-2 * 0.5 + 0.5 * (20 - 10))
        assert_relative_eq!(reactor.substrates()[0], 10.4, epsilon = 1e-12);
    }

    #[test]
    fn default_kinetics_applies_feeds() {
        let mut fed = setup_reactor(vec![fixed_uptake(2.)]);
        let mut unfed = setup_reactor(vec![fixed_uptake(2.)]);
        for reactor in [&mut fed, &mut unfed] {
            reactor.set_biomass(&[0.5]).unwrap();
            reactor.set_substrates(&[10.]).unwrap();
        }
        fed.set_xfeed(&[0.2]).unwrap();
        fed.set_sfeed(&[5.]).unwrap();

        fed.step(0.1).unwrap();
        unfed.step(0.1).unwrap();
        assert_relative_eq!(unfed.biomass()[0], 0.51, epsilon = 1e-12);
        assert_relative_eq!(unfed.substrates()[0], 9.9, epsilon = 1e-12);
        // 0.51 + 0.1 * 0.2 and 9.9 + 0.1 * 5
        assert_relative_eq!(fed.biomass()[0], 0.53, epsilon = 1e-12);
        assert_relative_eq!(fed.substrates()[0], 10.4, epsilon = 1e-12);
    }

    #[test]
    fn substrates_never_negative() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[0.05]).unwrap();
        let report = reactor.step(0.1).unwrap();
        assert_eq!(reactor.substrates(), &[0.]);
        // uptake of 2 * 0.5 over 0.1 would take 0.1, only half is there
        assert_eq!(report.limited_organisms(), vec![0]);
        assert_relative_eq!(report.organisms[0].uptake_scale, 0.5, epsilon = 1e-12);
        assert_relative_eq!(report.organisms[0].growth_rate, 0.1, epsilon = 1e-12);
        assert_relative_eq!(report.organisms[0].exchange_fluxes[0], -1., epsilon = 1e-12);
        assert_relative_eq!(reactor.biomass()[0], 0.505, epsilon = 1e-12);
        // Nothing left to take up, the next solve is infeasible
        let report = reactor.step(0.1).unwrap();
        assert_eq!(report.failed_organisms(), vec![0]);
        assert_eq!(reactor.substrates(), &[0.]);
    }

    #[test]
    fn failed_solve_does_not_abort_step() {
        let starving = Organism::new(&setup_model())
            .with_update_policy(
                |organism: &mut Organism, _env: &dyn HostEnvironment| -> Result<(), DynamicsError> {
                    organism.model_mut().set_bounds("EX_glc", Some(0.), Some(0.))?;
                    Ok(())
                },
            )
            .wrap();
        let mut reactor = setup_reactor(vec![fixed_uptake(2.), starving]);
        reactor.set_biomass(&[0.5, 0.3]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();

        let report = reactor.step(0.1).unwrap();
        assert_eq!(report.failed_organisms(), vec![1]);
        assert_eq!(report.organisms[1].status, OptimizationStatus::Infeasible);
        assert_eq!(report.organisms[1].growth_rate, 0.);
        assert_eq!(report.organisms[1].exchange_fluxes, vec![0.]);
        assert_relative_eq!(reactor.biomass()[0], 0.51, epsilon = 1e-12);
        assert_eq!(reactor.biomass()[1], 0.3);
        assert_relative_eq!(reactor.substrates()[0], 9.9, epsilon = 1e-12);
    }

    #[test]
    fn limited_growth_matches_substrate_consumed() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.), fixed_uptake(4.)]);
        reactor.set_biomass(&[0.5, 0.25]).unwrap();
        reactor.set_substrates(&[0.08]).unwrap();
        let report = reactor.step(0.1).unwrap();
        assert_eq!(report.limited_organisms(), vec![0, 1]);
        let gained: f64 = reactor.biomass().iter().sum::<f64>() - 0.75;
        let consumed = 0.08 - reactor.substrates()[0];
        assert_relative_eq!(consumed, 0.08, epsilon = 1e-12);
        assert_relative_eq!(gained, 0.1 * consumed, epsilon = 1e-12);
    }

    #[test]
    fn unlimited_step_keeps_scale() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        let report = reactor.step(0.1).unwrap();
        assert!(report.limited_organisms().is_empty());
        assert_eq!(report.organisms[0].uptake_scale, 1.);
    }

    #[test]
    fn failed_update_leaves_bounds_untouched() {
        let first = fixed_uptake(2.);
        let failing = Organism::new(&setup_model())
            .with_update_policy(
                |organism: &mut Organism, _env: &dyn HostEnvironment| -> Result<(), DynamicsError> {
                    organism.model_mut().set_bounds("missing", None, None)?;
                    Ok(())
                },
            )
            .wrap();
        let mut reactor = setup_reactor(vec![first.clone(), failing]);
        reactor.set_biomass(&[0.5, 0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        let before = first.read().unwrap().model().get_bounds("EX_glc").unwrap();

        assert!(matches!(reactor.step(0.1), Err(DynamicsError::Model(_))));
        assert_eq!(
            first.read().unwrap().model().get_bounds("EX_glc").unwrap(),
            before
        );
        assert_ne!(before, (Some(-2.), Some(0.)));
        assert_eq!(reactor.time(), 0.);
        assert_eq!(reactor.biomass(), &[0.5, 0.5]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn solve_pool_is_reused() {
        let pool = SolvePool::default();
        let first = pool.pool(2).unwrap();
        let second = pool.pool(2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let resized = pool.pool(3).unwrap();
        assert!(!Arc::ptr_eq(&first, &resized));
        assert_eq!(resized.current_num_threads(), 3);
    }

    #[test]
    fn invalid_time_step() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        assert_eq!(reactor.step(0.), Err(DynamicsError::InvalidTimeStep(0.)));
        assert_eq!(reactor.step(-1.), Err(DynamicsError::InvalidTimeStep(-1.)));
        assert!(matches!(
            reactor.step(f64::NAN),
            Err(DynamicsError::InvalidTimeStep(_))
        ));
        assert_eq!(reactor.time(), 0.);
    }

    #[test]
    fn missing_update_policy() {
        let plain = Organism::new(&setup_model()).with_label("plain").wrap();
        let mut reactor = setup_reactor(vec![plain]);
        assert_eq!(
            reactor.step(0.1),
            Err(DynamicsError::UpdateNotImplemented("plain".to_string()))
        );
        assert_eq!(reactor.time(), 0.);
    }

    #[test]
    fn repeated_organism_counts_twice() {
        let organism = fixed_uptake(2.);
        let mut reactor = setup_reactor(vec![organism.clone(), organism]);
        reactor.set_biomass(&[0.5, 0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        let report = reactor.step(0.1).unwrap();
        assert_eq!(report.organisms.len(), 2);
        assert_relative_eq!(reactor.substrates()[0], 9.8, epsilon = 1e-12);
    }

    #[test]
    fn adding_keeps_vectors_aligned() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_xfeed(&[1.]).unwrap();
        reactor.add_organism(fixed_uptake(3.)).unwrap();
        assert_eq!(reactor.biomass(), &[0.5, 0.]);
        assert_eq!(reactor.xfeed(), Some(&[1., 0.][..]));

        reactor.add_metabolites(["EX_ac", "EX_o2"]);
        assert_eq!(reactor.metabolites(), &["EX_glc", "EX_ac", "EX_o2"]);
        assert_eq!(reactor.substrates(), &[0., 0., 0.]);
        assert_eq!(reactor.sfeed(), None);
    }

    #[test]
    fn removing_keeps_vectors_aligned() {
        let first = fixed_uptake(2.);
        let mut reactor = setup_reactor(vec![first.clone(), fixed_uptake(3.)]);
        reactor.add_metabolite("EX_ac");
        reactor.set_biomass(&[1., 2.]).unwrap();
        reactor.set_xfeed(&[3., 4.]).unwrap();
        reactor.set_substrates(&[5., 6.]).unwrap();
        reactor.set_sfeed(&[7., 8.]).unwrap();

        let removed = reactor.remove_organism(0).unwrap();
        assert!(Arc::ptr_eq(&removed, &first));
        assert_eq!(first.read().unwrap().environment(), None);
        assert_eq!(reactor.biomass(), &[2.]);
        assert_eq!(reactor.xfeed(), Some(&[4.][..]));

        assert_eq!(reactor.remove_metabolite(0).unwrap(), "EX_glc");
        assert_eq!(reactor.substrates(), &[6.]);
        assert_eq!(reactor.sfeed(), Some(&[8.][..]));
        assert!(reactor.remove_metabolite(1).is_err());
        assert_eq!(reactor.metabolites(), &["EX_ac"]);
    }

    #[test]
    fn host_concentration_uses_first_occurrence() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.add_metabolite("EX_glc");
        reactor.set_substrates(&[4., 9.]).unwrap();
        let host: &dyn HostEnvironment = &reactor;
        assert_eq!(host.concentration("EX_glc"), Some(4.));
        assert_eq!(host.concentration("EX_ac"), None);
        assert_eq!(host.organism_count(), 1);
    }

    #[test]
    fn run_until_horizon() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        let trajectory = reactor.run(0.1, &mut Horizon(1.)).unwrap();
        assert_eq!(trajectory.len(), 11);
        assert_eq!(trajectory.statuses.len(), 10);
        assert_eq!(trajectory.organisms, vec!["toy".to_string()]);
        assert_relative_eq!(reactor.time(), 1., epsilon = 1e-9);
        let glucose = trajectory.substrate_series(0).unwrap();
        assert!(glucose.windows(2).all(|pair| pair[1] <= pair[0]));
        let biomass = trajectory.biomass_series(0).unwrap();
        assert!(biomass.windows(2).all(|pair| pair[1] >= pair[0]));
    }

    #[test]
    fn run_with_closure_and_step_limit() {
        let mut reactor = setup_reactor(vec![fixed_uptake(2.)]);
        reactor.set_biomass(&[0.5]).unwrap();
        reactor.set_substrates(&[10.]).unwrap();
        let trajectory = reactor.run(0.1, &mut MaxSteps::new(3)).unwrap();
        assert_eq!(trajectory.len(), 4);

        let mut stop = |reactor: &Bioreactor, _report: &StepReport| reactor.time() > 0.45;
        let trajectory = reactor.run(0.1, &mut stop).unwrap();
        // Continues from t = 0.3
        assert_eq!(trajectory.len(), 3);
        assert_relative_eq!(trajectory.time[0], 0.3, epsilon = 1e-9);
    }
}
