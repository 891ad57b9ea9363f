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
use crate::linalg::DVector;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Fixed step integrators used to advance the continuous time equations of motion by one discrete step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrator {
    /// Explicit Euler: `x' = x + dt * f(x, u)`. This matches the first order discretization of the linearized system.
    #[default]
    Euler,
    /// Classical fourth order Runge Kutta, with the control held constant over the step.
    Rk4,
}

impl Integrator {
    /// Advances `state` by `step` seconds using the provided equations of motion.
    ///
    /// The `eom` closure computes `dx/dt = f(x, u)`; any error it returns is propagated as is.
    pub fn integrate<F>(
        &self,
        eom: F,
        state: &DVector<f64>,
        control: &DVector<f64>,
        step: f64,
    ) -> Result<DVector<f64>, DynamicsError>
    where
        F: Fn(&DVector<f64>, &DVector<f64>) -> Result<DVector<f64>, DynamicsError>,
    {
        match self {
            Self::Euler => Ok(state + eom(state, control)? * step),
            Self::Rk4 => {
                let half_step = 0.5 * step;
                let k1 = eom(state, control)?;
                let k2 = eom(&(state + &k1 * half_step), control)?;
                let k3 = eom(&(state + &k2 * half_step), control)?;
                let k4 = eom(&(state + &k3 * step), control)?;
                Ok(state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (step / 6.0))
            }
        }
    }

    /// Order of the local truncation error of this integrator.
    pub fn order(&self) -> u8 {
        match self {
            Self::Euler => 1,
            Self::Rk4 => 4,
        }
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Euler => write!(f, "Euler"),
            Self::Rk4 => write!(f, "RK4"),
        }
    }
}
