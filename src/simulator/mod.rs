/*
    Ballistic EKF, extended Kalman filtering of nonlinear dynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::dynamics::{DynamicsError, NonlinearModel};
use crate::errors::ErrorKind;
use crate::filter::{Estimate, ExtendedKalmanFilter, FilterError, Residual};
use crate::linalg::DVector;
use crate::noise::{GaussianNoise, NoiseModel};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use snafu::prelude::*;
use std::fmt;
use typed_builder::TypedBuilder;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SimulationError {
    #[snafu(display("{what} has {got} components but the simulation requires {expected}"))]
    SimDimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[snafu(display("step {step}: {action} failed: {source}"))]
    StepDynamics {
        step: usize,
        action: &'static str,
        source: DynamicsError,
    },
    #[snafu(display("step {step}: {action} failed: {source}"))]
    StepFilter {
        step: usize,
        action: &'static str,
        source: FilterError,
    },
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SimDimensionMismatch { .. } => ErrorKind::Configuration,
            Self::StepDynamics { source, .. } => source.kind(),
            Self::StepFilter { source, .. } => source.kind(),
        }
    }
}

/// Everything computed during a single step of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub step: usize,
    /// True state after this step's propagation
    pub truth: DVector<f64>,
    /// Noise free observation of the true state
    pub observation: DVector<f64>,
    /// Noisy measurement processed by the filter
    pub measurement: DVector<f64>,
    pub prediction: Estimate,
    pub estimate: Estimate,
    pub residual: Residual,
    /// Observation of the corrected estimate, as computed by the filter's model
    pub filter_observation: DVector<f64>,
    /// Normalized estimation error squared of the corrected estimate
    pub nees: f64,
}

/// Output of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResults {
    pub records: Vec<StepRecord>,
    /// Consistency score of the run, i.e. the sum of the NEES of every step
    pub filter_error: f64,
}

impl SimulationResults {
    fn series<F: Fn(&StepRecord) -> f64>(&self, f: F) -> Vec<(usize, f64)> {
        self.records.iter().map(|rec| (rec.step, f(rec))).collect()
    }

    /// First component of the noise free observation of the truth at each step.
    pub fn truth_series(&self) -> Vec<(usize, f64)> {
        self.series(|rec| rec.observation[0])
    }

    /// First component of the noisy measurement at each step.
    pub fn measurement_series(&self) -> Vec<(usize, f64)> {
        self.series(|rec| rec.measurement[0])
    }

    /// First component of the observation of the filtered estimate at each step.
    pub fn filter_series(&self) -> Vec<(usize, f64)> {
        self.series(|rec| rec.filter_observation[0])
    }

    pub fn final_estimate(&self) -> Option<&Estimate> {
        self.records.last().map(|rec| &rec.estimate)
    }

    /// Largest absolute error between the truth and the corrected estimate for the provided state component.
    ///
    /// Returns `None` if there are no records or if the component is not part of the state.
    pub fn max_abs_error(&self, component: usize) -> Option<f64> {
        let first = self.records.first()?;
        if component >= first.truth.len() {
            return None;
        }
        Some(
            self.records
                .iter()
                .map(|rec| (rec.truth[component] - rec.estimate.state[component]).abs())
                .fold(0.0, f64::max),
        )
    }

    /// Fraction of the steps where the truth lies within three sigma of the estimate.
    pub fn within_3sigma_ratio(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let cnt = self
            .records
            .iter()
            .filter(|rec| rec.estimate.within_3sigma(&rec.truth))
            .count();
        cnt as f64 / self.records.len() as f64
    }
}

impl fmt::Display for SimulationResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} steps, filter error (sum of NEES) = {:.6e}, {:.1}% within 3 sigma",
            self.records.len(),
            self.filter_error,
            100.0 * self.within_3sigma_ratio()
        )
    }
}

/// Ties a truth model and a filter together for a single run.
///
/// At each step, the truth is propagated with the nonlinear dynamics, observed and corrupted with measurement noise,
/// and the filter predicts and updates its estimate with that measurement.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(doc)]
pub struct Simulation<D: NonlinearModel> {
    /// Model used to propagate the true state
    pub truth_model: D,
    pub filter: ExtendedKalmanFilter<D>,
    pub initial_state: DVector<f64>,
    /// Prior estimate of the filter, usually centered on the initial state
    pub prior: Estimate,
    /// Control input, held constant throughout the run
    pub control: DVector<f64>,
    pub measurement_noise: GaussianNoise,
    #[builder(default = 50)]
    pub steps: usize,
    /// If set, a sample of this noise is added to the mean of the prior before the first step
    #[builder(default, setter(strip_option))]
    pub prior_dispersion: Option<GaussianNoise>,
    /// Seed of the random number generator; the generator is seeded from entropy if unset
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
}

impl<D: NonlinearModel> Simulation<D> {
    fn check_len(what: &'static str, got: usize, expected: usize) -> Result<(), SimulationError> {
        ensure!(
            got == expected,
            SimDimensionMismatchSnafu {
                what,
                expected,
                got
            }
        );
        Ok(())
    }

    /// Ensures that all of the inputs are mutually consistent, before any step is run.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let model = &self.truth_model;
        let n = model.state_size();
        Self::check_len("initial state", self.initial_state.len(), n)?;
        Self::check_len("control", self.control.len(), model.control_size())?;
        Self::check_len("filter state", self.filter.model().state_size(), n)?;
        Self::check_len(
            "filter control",
            self.filter.model().control_size(),
            model.control_size(),
        )?;
        Self::check_len(
            "measurement noise",
            self.measurement_noise.dim(),
            model.observation_size(),
        )?;
        Self::check_len("prior", self.prior.state.len(), self.filter.model().state_size())?;
        Self::check_len(
            "filter observation",
            self.filter.model().observation_size(),
            model.observation_size(),
        )?;
        if let Some(dispersion) = &self.prior_dispersion {
            Self::check_len("prior dispersion", dispersion.dim(), n)?;
        }
        Ok(())
    }

    /// Returns the random number generator for this run.
    pub fn rng(&self) -> Pcg64Mcg {
        match self.seed {
            Some(seed) => Pcg64Mcg::seed_from_u64(seed),
            None => Pcg64Mcg::from_entropy(),
        }
    }

    /// Runs all of the steps, failing on the first error.
    pub fn run(&self) -> Result<SimulationResults, SimulationError> {
        self.validate()?;
        let mut rng = self.rng();

        let mut estimate = self.prior.clone();
        if let Some(dispersion) = &self.prior_dispersion {
            let delta = dispersion.sample(&mut rng);
            debug!("prior dispersed by {}", delta.transpose());
            estimate.state += delta;
        }

        let u = &self.control;
        let mut truth = self.initial_state.clone();
        let mut records = Vec::with_capacity(self.steps);
        let mut filter_error = 0.0;

        info!(
            "simulating {} steps with {}",
            self.steps, self.measurement_noise
        );

        for step in 0..self.steps {
            truth = self
                .truth_model
                .propagate(&truth, u)
                .context(StepDynamicsSnafu {
                    step,
                    action: "propagate",
                })?;

            let observation = self
                .truth_model
                .observe(&truth, u)
                .context(StepDynamicsSnafu {
                    step,
                    action: "observe",
                })?;
            let measurement = &observation + self.measurement_noise.sample(&mut rng);

            let prediction = self
                .filter
                .predict(&estimate, u)
                .context(StepFilterSnafu {
                    step,
                    action: "predict",
                })?;

            let (corrected, residual) = self
                .filter
                .update_with_residual(&prediction, u, &measurement)
                .context(StepFilterSnafu {
                    step,
                    action: "update",
                })?;

            let nees = corrected.nees(&truth).context(StepFilterSnafu {
                step,
                action: "consistency",
            })?;
            filter_error += nees;

            let filter_observation =
                self.filter
                    .model()
                    .observe(&corrected.state, u)
                    .context(StepDynamicsSnafu {
                        step,
                        action: "observe",
                    })?;

            debug!(
                "step {step}: truth {:.6} / measured {:.6} / filtered {:.6} (NEES {nees:.3e}, {residual})",
                observation[0], measurement[0], filter_observation[0]
            );
            trace!("step {step}: {prediction}{corrected}");

            estimate = corrected.clone();
            records.push(StepRecord {
                step,
                truth: truth.clone(),
                observation,
                measurement,
                prediction,
                estimate: corrected,
                residual,
                filter_observation,
                nees,
            });
        }

        let results = SimulationResults {
            records,
            filter_error,
        };
        info!("{results}");
        Ok(results)
    }
}
