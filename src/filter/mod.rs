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

use crate::dynamics::DynamicsError;
use crate::errors::ErrorKind;
use crate::linalg::DMatrix;
use crate::utils::{all_finite, is_symmetric};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;

pub mod ekf;
pub mod estimate;
pub mod residual;

pub use ekf::ExtendedKalmanFilter;
pub use estimate::Estimate;
pub use residual::Residual;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilterError {
    #[snafu(display(
        "{what} is {got_rows}x{got_cols} but the filter requires {expected_rows}x{expected_cols}"
    ))]
    FilterDimensionMismatch {
        what: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
    #[snafu(display("{what} covariance is {reason}"))]
    InvalidNoiseCovariance {
        what: &'static str,
        reason: &'static str,
    },
    #[snafu(display("filter model failed: {source}"))]
    FilterDynamics { source: DynamicsError },
    #[snafu(display("innovation covariance is singular, cannot compute the Kalman gain"))]
    SingularInnovation,
    #[snafu(display("estimate covariance is singular, cannot compute the NEES"))]
    SingularCovariance,
}

impl FilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FilterDimensionMismatch { .. } | Self::InvalidNoiseCovariance { .. } => {
                ErrorKind::Configuration
            }
            Self::FilterDynamics { source } => source.kind(),
            Self::SingularInnovation | Self::SingularCovariance => ErrorKind::NumericalInstability,
        }
    }
}

/// Selects how the filter propagates the mean of its estimate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KalmanVariant {
    /// Time invariant linear approximation about the equilibrium: `x' = A_d·x + B_d·u`.
    #[default]
    Linearized,
    /// Standard EKF: the mean goes through the nonlinear dynamics and the covariance through the Jacobian at the current estimate.
    Nonlinear,
}

/// Selects the formulation of the covariance measurement update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceUpdate {
    /// `(I - K·C)·P`
    #[default]
    Standard,
    /// `(I - K·C)·P·(I - K·C)' + K·R·K'`, which keeps the covariance symmetric and positive semi definite.
    Joseph,
}

/// Ensures that a noise covariance is finite and symmetric.
pub(crate) fn ensure_covariance(
    what: &'static str,
    covar: &DMatrix<f64>,
) -> Result<(), FilterError> {
    ensure!(
        all_finite(covar),
        InvalidNoiseCovarianceSnafu {
            what,
            reason: "not finite"
        }
    );
    ensure!(
        is_symmetric(covar),
        InvalidNoiseCovarianceSnafu {
            what,
            reason: "not symmetric"
        }
    );
    Ok(())
}

/// Ensures that the provided matrix has the expected number of rows and columns.
pub(crate) fn ensure_dims(
    what: &'static str,
    got: (usize, usize),
    expected: (usize, usize),
) -> Result<(), FilterError> {
    ensure!(
        got == expected,
        FilterDimensionMismatchSnafu {
            what,
            expected_rows: expected.0,
            expected_cols: expected.1,
            got_rows: got.0,
            got_cols: got.1,
        }
    );
    Ok(())
}
