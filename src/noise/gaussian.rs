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
    CovarianceNotPsdSnafu, CovarianceNotSymmetricSnafu, NoiseDimensionMismatchSnafu, NoiseError,
    NoiseModel, NonFiniteParameterSnafu,
};
use crate::linalg::{DMatrix, DVector};
use crate::utils::{all_finite, is_symmetric, symmetry_tolerance};
use rand::Rng;
use rand_distr::StandardNormal;
use snafu::ensure;
use std::fmt;

/// A multivariate normal distribution `N(mean, covar)`.
///
/// Samples are computed as `mean + L·w` where `w` is drawn from a standard normal distribution and `L` is the square root
/// factor of the covariance, built once from its singular value decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianNoise {
    mean: DVector<f64>,
    covar: DMatrix<f64>,
    sqrt_factor: DMatrix<f64>,
}

impl GaussianNoise {
    /// Creates a new Gaussian noise model from a mean and covariance which must be of the same size.
    ///
    /// The covariance must be symmetric and positive semi definite (eigenvalues may be nil, e.g. for an unobserved axis).
    pub fn new(mean: DVector<f64>, covar: DMatrix<f64>) -> Result<Self, NoiseError> {
        ensure!(
            covar.is_square() && covar.nrows() == mean.len(),
            NoiseDimensionMismatchSnafu {
                mean_len: mean.len(),
                rows: covar.nrows(),
                cols: covar.ncols(),
            }
        );
        ensure!(
            mean.iter().all(|v| v.is_finite()),
            NonFiniteParameterSnafu { what: "mean" }
        );
        ensure!(
            all_finite(&covar),
            NonFiniteParameterSnafu { what: "covariance" }
        );
        ensure!(is_symmetric(&covar), CovarianceNotSymmetricSnafu);

        let sqrt_factor = if covar.is_empty() {
            covar.clone()
        } else {
            // Check that covariance is PSD by ensuring that all the eigenvalues are positive or nil
            let tol = symmetry_tolerance(&covar);
            if let Some(eigenvalue) = covar
                .symmetric_eigenvalues()
                .iter()
                .copied()
                .find(|eigenval| *eigenval < -tol)
            {
                return CovarianceNotPsdSnafu { eigenvalue }.fail();
            }

            // For a symmetric PSD matrix, U = V, hence covar = V·S·V' = (V·√S)(V·√S)'
            let svd = covar.clone().svd(false, true);
            let v_t = svd
                .v_t
                .ok_or(NoiseError::CovarianceNotPsd { eigenvalue: f64::NAN })?;
            let sqrt_s = svd.singular_values.map(|s| s.max(0.0).sqrt());
            v_t.transpose() * DMatrix::from_diagonal(&sqrt_s)
        };

        Ok(Self {
            mean,
            covar,
            sqrt_factor,
        })
    }

    /// Same as `new` but with a zero mean
    pub fn zero_mean(covar: DMatrix<f64>) -> Result<Self, NoiseError> {
        Self::new(DVector::zeros(covar.nrows()), covar)
    }

    /// Zero mean noise with a diagonal covariance built from the provided variances.
    pub fn from_variances(variances: &[f64]) -> Result<Self, NoiseError> {
        Self::zero_mean(DMatrix::from_diagonal(&DVector::from_column_slice(
            variances,
        )))
    }
}

impl NoiseModel for GaussianNoise {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    fn covariance(&self) -> &DMatrix<f64> {
        &self.covar
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let w = DVector::<f64>::from_fn(self.mean.len(), |_, _| rng.sample(StandardNormal));
        &self.sqrt_factor * w + &self.mean
    }
}

impl fmt::Display for GaussianNoise {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "N(μ = {}, Σ = {})", self.mean.transpose(), self.covar)
    }
}
