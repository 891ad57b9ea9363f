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

use crate::linalg::DMatrix;
use approx::abs_diff_eq;

/// Returns whether the provided matrix is square and symmetric, within an absolute tolerance scaled by its largest entry.
pub fn is_symmetric(m: &DMatrix<f64>) -> bool {
    if !m.is_square() {
        return false;
    }
    let tol = symmetry_tolerance(m);
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if !abs_diff_eq!(m[(i, j)], m[(j, i)], epsilon = tol) {
                return false;
            }
        }
    }
    true
}

/// Tolerance used for symmetry and semi-definiteness checks, relative to the magnitude of the matrix.
pub fn symmetry_tolerance(m: &DMatrix<f64>) -> f64 {
    1e-9 * m.amax().max(1.0)
}

/// Returns whether all of the entries are finite (neither NaN nor infinite).
pub fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}
