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

use super::{
    ConfigError, ConfigRepr, InvalidConfigSnafu, MatrixSerde, ScenarioDynamicsSnafu,
    ScenarioFilterSnafu, ScenarioNoiseSnafu, ScenarioSimulationSnafu,
};
use crate::dynamics::{Actuation, BallPhysics, FallingBall, JacobianMethod};
use crate::filter::{CovarianceUpdate, Estimate, ExtendedKalmanFilter, KalmanVariant};
use crate::linalg::DVector;
use crate::noise::GaussianNoise;
use crate::propagators::Integrator;
use crate::simulator::Simulation;
use serde_derive::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};

/// Serializable description of a falling ball tracking scenario.
///
/// Every field is optional in the YAML representation: missing fields take the value of [`ScenarioSerde::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSerde {
    /// Number of filter steps
    pub steps: usize,
    /// Duration of a step, in seconds
    pub dt: f64,
    pub gravity: f64,
    pub drag: f64,
    pub actuation: Actuation,
    pub integrator: Integrator,
    pub jacobian: JacobianMethod,
    pub variant: KalmanVariant,
    pub covar_update: CovarianceUpdate,
    /// True initial state, `[position, velocity]`
    pub initial_state: Vec<f64>,
    /// Control input applied at every step
    pub control: Vec<f64>,
    /// Covariance of the prior estimate
    pub prior_covar: MatrixSerde,
    /// Covariance of the measurement noise, used both to corrupt the measurements and by the filter
    pub measurement_covar: MatrixSerde,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_covar: Option<MatrixSerde>,
    /// Zero mean dispersion applied to the prior estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_dispersion: Option<MatrixSerde>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScenarioSerde {
    /// An input driven ball dropped from 100 m and pushed down, tracked with very noisy position measurements.
    fn default() -> Self {
        let physics = BallPhysics::default();
        Self {
            steps: 50,
            dt: 1.0,
            gravity: physics.gravity,
            drag: physics.drag,
            actuation: Actuation::Input,
            integrator: Integrator::Euler,
            jacobian: JacobianMethod::Analytic,
            variant: KalmanVariant::Linearized,
            covar_update: CovarianceUpdate::Standard,
            initial_state: vec![100.0, 0.0],
            control: vec![-1.0],
            prior_covar: MatrixSerde::diagonal(vec![0.25, 0.25]),
            measurement_covar: MatrixSerde::diagonal(vec![100.0]),
            process_covar: None,
            // Only the position of the prior is dispersed
            initial_dispersion: Some(MatrixSerde::diagonal(vec![0.25, 0.0])),
            seed: None,
        }
    }
}

impl ConfigRepr for ScenarioSerde {}

impl ScenarioSerde {
    /// Builds the falling ball model of this scenario.
    pub fn to_model(&self) -> Result<FallingBall, ConfigError> {
        let physics = BallPhysics::new(self.gravity, self.drag).context(ScenarioDynamicsSnafu)?;
        Ok(
            FallingBall::new(physics, self.actuation, self.dt, self.jacobian)
                .context(ScenarioDynamicsSnafu)?
                .with_integrator(self.integrator),
        )
    }

    /// Builds the simulation of this scenario, checking that all of its inputs are consistent.
    pub fn to_simulation(&self) -> Result<Simulation<FallingBall>, ConfigError> {
        ensure!(
            self.steps > 0,
            InvalidConfigSnafu {
                msg: "a scenario requires at least one step"
            }
        );

        let ball = self.to_model()?;

        let msr_covar = self.measurement_covar.to_matrix()?;
        let process_covar = match &self.process_covar {
            Some(q) => Some(q.to_matrix()?),
            None => None,
        };

        let filter = ExtendedKalmanFilter::new(ball.clone(), msr_covar.clone(), process_covar)
            .context(ScenarioFilterSnafu)?
            .with_variant(self.variant)
            .with_covar_update(self.covar_update);

        let initial_state = DVector::from_column_slice(&self.initial_state);
        let prior = Estimate::new(initial_state.clone(), self.prior_covar.to_matrix()?)
            .context(ScenarioFilterSnafu)?;

        let measurement_noise = GaussianNoise::zero_mean(msr_covar).context(ScenarioNoiseSnafu)?;

        let prior_dispersion = match &self.initial_dispersion {
            Some(covar) => {
                Some(GaussianNoise::zero_mean(covar.to_matrix()?).context(ScenarioNoiseSnafu)?)
            }
            None => None,
        };

        let mut sim = Simulation::builder()
            .truth_model(ball)
            .filter(filter)
            .initial_state(initial_state)
            .prior(prior)
            .control(DVector::from_column_slice(&self.control))
            .measurement_noise(measurement_noise)
            .steps(self.steps)
            .build();
        sim.prior_dispersion = prior_dispersion;
        sim.seed = self.seed;

        sim.validate().context(ScenarioSimulationSnafu)?;

        Ok(sim)
    }
}

#[cfg(test)]
mod ut_scenario {
    use super::*;
    use crate::dynamics::NonlinearModel;
    use crate::errors::ErrorKind;
    use crate::linalg::DMatrix;
    use crate::simulator::SimulationError;

    #[test]
    fn default_scenario() {
        let scenario = ScenarioSerde::default();
        let sim = scenario.to_simulation().unwrap();
        assert_eq!(sim.steps, 50);
        assert_eq!(sim.truth_model.actuation, Actuation::Input);
        assert_eq!(sim.truth_model.step(), 1.0);
        assert_eq!(sim.control, DVector::from_element(1, -1.0));
        assert_eq!(
            sim.filter.measurement_noise(),
            &DMatrix::from_element(1, 1, 100.0)
        );
        assert!(sim.filter.process_noise().is_none());
        assert!(sim.prior_dispersion.is_some());
        assert!(sim.seed.is_none());
    }

    #[test]
    fn partial_yaml() {
        let yaml = r#"
steps: 10
actuation: free
variant: nonlinear
covar_update: joseph
integrator: rk4
jacobian: finite_difference
control: [0.0]
measurement_covar:
  - [1.0e-6]
seed: 7
"#;
        let scenario = ScenarioSerde::loads(yaml).unwrap();
        assert_eq!(scenario.steps, 10);
        assert_eq!(scenario.actuation, Actuation::Free);
        assert_eq!(scenario.variant, KalmanVariant::Nonlinear);
        assert_eq!(scenario.covar_update, CovarianceUpdate::Joseph);
        assert_eq!(scenario.integrator, Integrator::Rk4);
        assert_eq!(scenario.jacobian, JacobianMethod::FiniteDifference);
        assert_eq!(scenario.seed, Some(7));
        // Unspecified fields keep their defaults
        assert_eq!(scenario.initial_state, vec![100.0, 0.0]);
        assert_eq!(scenario.gravity, -10.0);

        let sim = scenario.to_simulation().unwrap();
        assert_eq!(sim.filter.variant, KalmanVariant::Nonlinear);
        assert_eq!(sim.seed, Some(7));
    }

    #[test]
    fn dump_and_load() {
        let scenario = ScenarioSerde {
            seed: Some(3),
            process_covar: Some(MatrixSerde::diagonal(vec![1e-3, 1e-3])),
            ..Default::default()
        };
        let yaml = scenario.dumps().unwrap();
        println!("{yaml}");
        assert_eq!(ScenarioSerde::loads(&yaml).unwrap(), scenario);
    }

    #[test]
    fn invalid_scenarios() {
        let bad_dt = ScenarioSerde {
            dt: -1.0,
            ..Default::default()
        };
        let err = bad_dt.to_simulation().unwrap_err();
        assert!(matches!(err, ConfigError::ScenarioDynamics { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let bad_r = ScenarioSerde {
            measurement_covar: MatrixSerde::diagonal(vec![1.0, 1.0]),
            ..Default::default()
        };
        assert!(matches!(
            bad_r.to_simulation().unwrap_err(),
            ConfigError::ScenarioFilter { .. }
        ));

        let bad_dispersion = ScenarioSerde {
            initial_dispersion: Some(MatrixSerde::diagonal(vec![-1.0, 0.0])),
            ..Default::default()
        };
        let err = bad_dispersion.to_simulation().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sampling);

        let bad_state = ScenarioSerde {
            initial_state: vec![100.0],
            ..Default::default()
        };
        assert!(bad_state.to_simulation().is_err());

        let bad_control = ScenarioSerde {
            control: vec![-1.0, 0.0],
            ..Default::default()
        };
        let err = bad_control.to_simulation().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ScenarioSimulation {
                source: SimulationError::SimDimensionMismatch {
                    what: "control",
                    expected: 1,
                    got: 2
                }
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let no_steps = ScenarioSerde {
            steps: 0,
            ..Default::default()
        };
        assert!(matches!(
            no_steps.to_simulation().unwrap_err(),
            ConfigError::InvalidConfig { .. }
        ));

        assert!(matches!(
            ScenarioSerde::loads("steps: [1, 2]").unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        assert!(matches!(
            ScenarioSerde::load("/this/path/does/not/exist.yaml").unwrap_err(),
            ConfigError::ReadError { .. }
        ));
    }
}
