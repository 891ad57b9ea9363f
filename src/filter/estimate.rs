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

use super::{ensure_dims, FilterError, SingularCovarianceSnafu};
use crate::linalg::{DMatrix, DVector};
use snafu::{ensure, OptionExt};
use std::fmt;

/// Stores an estimate, as the result of a `predict` or an `update`, or as the prior of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// The estimated state
    pub state: DVector<f64>,
    /// The covariance of the estimated state
    pub covar: DMatrix<f64>,
    /// Whether or not this is a predicted estimate (or the prior), as opposed to one corrected by a measurement.
    pub predicted: bool,
}

impl Estimate {
    /// Initializes a prior estimate, ensuring that the covariance matches the state size.
    pub fn new(state: DVector<f64>, covar: DMatrix<f64>) -> Result<Self, FilterError> {
        let n = state.len();
        ensure_dims("estimate covariance", covar.shape(), (n, n))?;
        Ok(Self {
            state,
            covar,
            predicted: true,
        })
    }

    /// Initializes a prior estimate with a diagonal covariance built from the provided variances.
    pub fn from_diag(state: DVector<f64>, variances: &[f64]) -> Result<Self, FilterError> {
        let n = state.len();
        ensure_dims("estimate variances", (variances.len(), 1), (n, 1))?;
        Self::new(
            state,
            DMatrix::from_diagonal(&DVector::from_column_slice(variances)),
        )
    }

    pub fn state_size(&self) -> usize {
        self.state.len()
    }

    /// Returns the one sigma bounds of each component of the state.
    pub fn sigmas(&self) -> DVector<f64> {
        self.covar.diagonal().map(|v| v.max(0.0).sqrt())
    }

    /// Normalized estimation error squared of this estimate with respect to the true state, i.e. `(x - x̂)' P⁻¹ (x - x̂)`.
    pub fn nees(&self, truth: &DVector<f64>) -> Result<f64, FilterError> {
        let n = self.state.len();
        ensure_dims("true state", (truth.len(), 1), (n, 1))?;
        let covar_inv = self
            .covar
            .clone()
            .try_inverse()
            .context(SingularCovarianceSnafu)?;
        let err = truth - &self.state;
        let nees = (err.transpose() * covar_inv * &err)[(0, 0)];
        ensure!(nees.is_finite(), SingularCovarianceSnafu);
        Ok(nees)
    }

    /// Returns whether the true state lies within `sigma` standard deviations of this estimate, on every component.
    pub fn within_sigma(&self, truth: &DVector<f64>, sigma: f64) -> bool {
        if truth.len() != self.state.len() {
            return false;
        }
        let deviation = truth - &self.state;
        for i in 0..deviation.len() {
            let bound = self.covar[(i, i)].sqrt() * sigma;
            if deviation[i] > bound || deviation[i] < -bound {
                return false;
            }
        }
        true
    }

    /// Returns whether the true state is within 3 sigma, which represent 99.7% for a Normal distribution
    pub fn within_3sigma(&self, truth: &DVector<f64>) -> bool {
        self.within_sigma(truth, 3.0)
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = if self.predicted {
            "Prediction"
        } else {
            "Estimate"
        };
        let fmt_cov = self
            .sigmas()
            .iter()
            .map(|s| format!("{s:e}"))
            .collect::<Vec<String>>();
        write!(
            f,
            "=== {} ===\nstate {}sigmas [{}]\n",
            word,
            self.state.transpose(),
            fmt_cov.join(",")
        )
    }
}

impl fmt::LowerExp for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = if self.predicted {
            "Prediction"
        } else {
            "Estimate"
        };
        let fmt_state = self
            .state
            .iter()
            .map(|s| format!("{s:e}"))
            .collect::<Vec<String>>();
        write!(
            f,
            "=== {} ===\nstate [{}]\ncovariance {:e}",
            word,
            fmt_state.join(","),
            self.covar
        )
    }
}
