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

use super::DynamicsError;
use crate::linalg::{DMatrix, DVector};
use serde_derive::{Deserialize, Serialize};

/// Selects how a model computes its linearization at construction time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianMethod {
    /// Closed form partial derivatives of the equations of motion.
    #[default]
    Analytic,
    /// Central finite differences of the equations of motion.
    FiniteDifference,
}

/// Approximates the Jacobian of `func: R^N → R^M` at `point` using central finite differences.
///
/// Uses a step size of `h_j = ε^(1/3) * max(|x_j|, 1)` for each component, requiring `2N + 1` evaluations.
pub fn central_difference<F>(func: F, point: &DVector<f64>) -> Result<DMatrix<f64>, DynamicsError>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, DynamicsError>,
{
    let rows = func(point)?.len();
    let cbrt_eps = f64::EPSILON.cbrt();
    let mut jac = DMatrix::<f64>::zeros(rows, point.len());

    for j in 0..point.len() {
        let h = cbrt_eps * point[j].abs().max(1.0);

        let mut fwd = point.clone();
        fwd[j] += h;
        let mut bwd = point.clone();
        bwd[j] -= h;

        let col = (func(&fwd)? - func(&bwd)?) / (2.0 * h);
        jac.set_column(j, &col);
    }

    Ok(jac)
}
