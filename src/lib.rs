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

/*! # ballistic-ekf

An Extended Kalman Filter (EKF) tracking a falling (or propelled) ball with quadratic drag from noisy position measurements.

The crate is split into a nonlinear state-space model abstraction ([`dynamics::NonlinearModel`]), a stateless EKF operating
against any such model ([`filter::ExtendedKalmanFilter`]), and a [`simulator::Simulation`] which ties both together for one
run: ground truth propagation, synthetic noisy measurements, filtering, and a consistency score.
*/

/// Provides the fixed step integrators used to propagate the nonlinear dynamics.
pub mod propagators;

/// Provides the nonlinear model abstraction, its linearization, and the falling ball dynamics.
pub mod dynamics;

/// Provides noise modeling, used to synthesize measurements and disperse initial estimates.
pub mod noise;

/// Provides the estimates, the residuals, and the Extended Kalman Filter itself.
pub mod filter;

/// Provides the simulation driver which generates truth and measurements and runs the filter over them.
pub mod simulator;

/// All the input/output needs for this library, i.e. loading of scenarios from YAML.
pub mod io;

/// Utility functions shared by different modules.
pub mod utils;

mod errors;
/// Functions which may fail return a typed error, each of which maps to an [`ErrorKind`].
pub use self::errors::{EkfError, ErrorKind};

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

#[allow(unused_imports)]
pub mod prelude {
    pub use crate::dynamics::*;
    pub use crate::filter::*;
    pub use crate::io::{ConfigRepr, MatrixSerde, ScenarioSerde};
    pub use crate::linalg::{DMatrix, DVector};
    pub use crate::noise::*;
    pub use crate::propagators::Integrator;
    pub use crate::simulator::*;
    pub use crate::{EkfError, ErrorKind};
}
