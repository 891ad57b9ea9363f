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

use crate::errors::ErrorKind;
use crate::linalg::{DMatrix, DVector};
use rand::Rng;
use snafu::prelude::*;

pub mod gaussian;
pub use gaussian::GaussianNoise;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NoiseError {
    #[snafu(display("noise mean has {mean_len} components but covariance is {rows}x{cols}"))]
    NoiseDimensionMismatch {
        mean_len: usize,
        rows: usize,
        cols: usize,
    },
    #[snafu(display("noise {what} contains non finite entries"))]
    NonFiniteParameter { what: &'static str },
    #[snafu(display("noise covariance is not symmetric"))]
    CovarianceNotSymmetric,
    #[snafu(display("noise covariance is not positive semi definite (eigenvalue of {eigenvalue:e})"))]
    CovarianceNotPsd { eigenvalue: f64 },
}

impl NoiseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Sampling
    }
}

/// Trait for any kind of stochastic modeling, used to synthesize measurement noise and to disperse initial estimates.
pub trait NoiseModel {
    /// Number of components of each sample.
    fn dim(&self) -> usize;

    /// Returns the mean of this noise model.
    fn mean(&self) -> &DVector<f64>;

    /// Returns the covariance of this noise model.
    fn covariance(&self) -> &DMatrix<f64>;

    /// Returns a new sample of this noise model. Every call draws a fresh sample from the provided generator.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64>;
}
