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
use crate::filter::FilterError;
use crate::io::ConfigError;
use crate::noise::NoiseError;
use crate::simulator::SimulationError;
use snafu::prelude::*;
use std::fmt;

/// Broad classification of every failure in this crate. None of them is recoverable within a run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inconsistent or invalid setup (e.g. mismatched matrix dimensions), detected before any step runs.
    Configuration,
    /// A matrix which must be inverted is singular, e.g. the innovation covariance.
    NumericalInstability,
    /// Malformed noise model parameters.
    Sampling,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration error"),
            Self::NumericalInstability => write!(f, "numerical instability"),
            Self::Sampling => write!(f, "sampling error"),
        }
    }
}

/// Umbrella error for callers who drive several components at once.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EkfError {
    #[snafu(context(false), display("{source}"))]
    Dynamics { source: DynamicsError },
    #[snafu(context(false), display("{source}"))]
    Noise { source: NoiseError },
    #[snafu(context(false), display("{source}"))]
    Filter { source: FilterError },
    #[snafu(context(false), display("{source}"))]
    Simulation { source: SimulationError },
    #[snafu(context(false), display("{source}"))]
    Config { source: ConfigError },
}

impl EkfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dynamics { source } => source.kind(),
            Self::Noise { source } => source.kind(),
            Self::Filter { source } => source.kind(),
            Self::Simulation { source } => source.kind(),
            Self::Config { source } => source.kind(),
        }
    }
}

#[cfg(test)]
mod ut_errors {
    use super::*;
    use crate::dynamics::{BallPhysics, FallingBall};
    use crate::filter::Estimate;
    use crate::linalg::{DMatrix, DVector};
    use crate::noise::GaussianNoise;

    fn build_prior() -> Result<Estimate, EkfError> {
        FallingBall::free(BallPhysics::default(), 1.0)?;
        GaussianNoise::from_variances(&[1.0, 1.0])?;
        Ok(Estimate::new(DVector::zeros(2), DMatrix::identity(3, 3))?)
    }

    #[test]
    fn umbrella_error() {
        let err = build_prior().unwrap_err();
        assert!(matches!(err, EkfError::Filter { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        println!("{err} ({})", err.kind());

        let err: EkfError = GaussianNoise::from_variances(&[-1.0]).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Sampling);
    }
}
