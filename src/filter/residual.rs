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

use crate::linalg::{DMatrix, DVector};
use std::fmt;

/// Stores the residuals of a measurement update.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    /// The prefit residual (innovation), `z - C·x̂⁻`
    pub prefit: DVector<f64>,
    /// The postfit residual, `z - C·x̂⁺`
    pub postfit: DVector<f64>,
    /// The prefit residual ratio computed as the Mahalanobis distance, i.e. it is always positive
    /// and computed as `r' * S^-1 * r`, where `r` is the prefit residual and `S` the innovation covariance.
    /// It follows a Chi Square distribution with as many degrees of freedom as there are measurements.
    pub ratio: f64,
    /// The innovation covariance `S = C·P⁻·C' + R`
    pub innovation_covar: DMatrix<f64>,
    /// The measurement which was processed.
    pub real_obs: DVector<f64>,
    /// The observation computed from the predicted state.
    pub computed_obs: DVector<f64>,
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "prefit {} postfit {} ratio = {:.3}",
            self.prefit.transpose(),
            self.postfit.transpose(),
            self.ratio
        )
    }
}
