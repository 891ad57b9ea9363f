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
    ensure_covariance, ensure_dims, CovarianceUpdate, Estimate, FilterDynamicsSnafu, FilterError, KalmanVariant,
    Residual, SingularInnovationSnafu,
};
use crate::dynamics::NonlinearModel;
use crate::linalg::{DMatrix, DVector};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;

/// Defines an Extended Kalman Filter operating against any [`NonlinearModel`].
///
/// The filter is stateless: it never stores an estimate. Each call to [`predict`](Self::predict) or
/// [`update`](Self::update) takes the previous estimate and returns a new one, so calls with identical inputs always
/// return identical outputs.
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter<D: NonlinearModel> {
    model: D,
    /// Measurement noise covariance `R` (m×m)
    measurement_noise: DMatrix<f64>,
    /// Process noise covariance `Q` (n×n), treated as zero if not set.
    process_noise: Option<DMatrix<f64>>,
    pub variant: KalmanVariant,
    pub covar_update: CovarianceUpdate,
    /// Discrete state transition matrix `A_d = I + dt·A`
    stm: DMatrix<f64>,
    /// Discrete input matrix `B_d = dt·B`
    input_map: DMatrix<f64>,
}

impl<D: NonlinearModel> ExtendedKalmanFilter<D> {
    /// Initializes a new filter, checking that the noise covariances are consistent with the model.
    pub fn new(
        model: D,
        measurement_noise: DMatrix<f64>,
        process_noise: Option<DMatrix<f64>>,
    ) -> Result<Self, FilterError> {
        let (n, m) = (model.state_size(), model.observation_size());
        ensure_dims("measurement noise", measurement_noise.shape(), (m, m))?;
        ensure_covariance("measurement noise", &measurement_noise)?;
        if let Some(q) = &process_noise {
            ensure_dims("process noise", q.shape(), (n, n))?;
            ensure_covariance("process noise", q)?;
        }
        let (stm, input_map) = model.matrices().discretize(model.step());
        Ok(Self {
            model,
            measurement_noise,
            process_noise,
            variant: KalmanVariant::default(),
            covar_update: CovarianceUpdate::default(),
            stm,
            input_map,
        })
    }

    pub fn with_variant(mut self, variant: KalmanVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_covar_update(mut self, covar_update: CovarianceUpdate) -> Self {
        self.covar_update = covar_update;
        self
    }

    pub fn model(&self) -> &D {
        &self.model
    }

    pub fn measurement_noise(&self) -> &DMatrix<f64> {
        &self.measurement_noise
    }

    pub fn process_noise(&self) -> Option<&DMatrix<f64>> {
        self.process_noise.as_ref()
    }

    /// Discrete state transition matrix used by the linearized prediction.
    pub fn stm(&self) -> &DMatrix<f64> {
        &self.stm
    }

    fn check_estimate(&self, what: &'static str, est: &Estimate) -> Result<(), FilterError> {
        let n = self.model.state_size();
        ensure_dims(what, (est.state.len(), 1), (n, 1))?;
        ensure_dims("estimate covariance", est.covar.shape(), (n, n))
    }

    fn check_control(&self, control: &DVector<f64>) -> Result<(), FilterError> {
        ensure_dims(
            "control",
            (control.len(), 1),
            (self.model.control_size(), 1),
        )
    }

    /// Computes the prediction (time update) of the provided estimate by one step of the model.
    ///
    /// The returned estimate is flagged as predicted.
    pub fn predict(&self, prev: &Estimate, control: &DVector<f64>) -> Result<Estimate, FilterError> {
        self.check_estimate("estimate state", prev)?;
        self.check_control(control)?;

        let (state, stm) = match self.variant {
            KalmanVariant::Linearized => (
                &self.stm * &prev.state + &self.input_map * control,
                self.stm.clone(),
            ),
            KalmanVariant::Nonlinear => {
                let n = self.model.state_size();
                let jac = self
                    .model
                    .state_jacobian_at(&prev.state, control)
                    .context(FilterDynamicsSnafu)?;
                let stm = DMatrix::<f64>::identity(n, n) + jac * self.model.step();
                let state = self
                    .model
                    .propagate(&prev.state, control)
                    .context(FilterDynamicsSnafu)?;
                (state, stm)
            }
        };

        let mut covar = &stm * &prev.covar * stm.transpose();
        if let Some(q) = &self.process_noise {
            covar += q;
        }

        Ok(Estimate {
            state,
            covar,
            predicted: true,
        })
    }

    /// Computes the measurement update of a prediction with the provided measurement.
    pub fn update(
        &self,
        pred: &Estimate,
        control: &DVector<f64>,
        measurement: &DVector<f64>,
    ) -> Result<Estimate, FilterError> {
        self.update_with_residual(pred, control, measurement)
            .map(|(est, _)| est)
    }

    /// Computes the measurement update of a prediction, returning the corrected estimate along with its residual.
    ///
    /// Returns a [`FilterError::SingularInnovation`] if the innovation covariance cannot be inverted.
    pub fn update_with_residual(
        &self,
        pred: &Estimate,
        control: &DVector<f64>,
        measurement: &DVector<f64>,
    ) -> Result<(Estimate, Residual), FilterError> {
        self.check_estimate("prediction state", pred)?;
        self.check_control(control)?;
        let (n, m) = (self.model.state_size(), self.model.observation_size());
        ensure_dims("measurement", (measurement.len(), 1), (m, 1))?;

        let c = self.model.observation_matrix();

        // Compute the innovation, i.e. the prefit residual
        let computed_obs = self
            .model
            .observe(&pred.state, control)
            .context(FilterDynamicsSnafu)?;
        let prefit = measurement - &computed_obs;

        // Compute the innovation covariance and invert it
        let s_k = c * &pred.covar * c.transpose() + &self.measurement_noise;
        let s_k_inv = s_k.clone().try_inverse().context(SingularInnovationSnafu)?;
        ensure!(
            s_k_inv.iter().all(|v| v.is_finite()),
            SingularInnovationSnafu
        );

        let ratio = (prefit.transpose() * &s_k_inv * &prefit)[(0, 0)];

        let gain = &pred.covar * c.transpose() * &s_k_inv;

        let state = &pred.state + &gain * &prefit;

        let covar = match self.covar_update {
            CovarianceUpdate::Standard => &pred.covar - &gain * c * &pred.covar,
            CovarianceUpdate::Joseph => {
                let first_term = DMatrix::<f64>::identity(n, n) - &gain * c;
                &first_term * &pred.covar * first_term.transpose()
                    + &gain * &self.measurement_noise * gain.transpose()
            }
        };

        let postfit = measurement - c * &state;

        Ok((
            Estimate {
                state,
                covar,
                predicted: false,
            },
            Residual {
                prefit,
                postfit,
                ratio,
                innovation_covar: s_k,
                real_obs: measurement.clone(),
                computed_obs,
            },
        ))
    }
}

impl<D: NonlinearModel + fmt::Display> fmt::Display for ExtendedKalmanFilter<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "EKF ({:?}, {:?} covariance update) on {}",
            self.variant, self.covar_update, self.model
        )
    }
}
