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
use crate::propagators::Integrator;
use snafu::prelude::*;
use std::fmt;

/// The falling ball dynamics, with and without an input force.
pub mod falling_ball;
pub use falling_ball::{Actuation, BallPhysics, FallingBall};

/// Numerical differentiation used to linearize the dynamics.
pub mod jacobian;
pub use jacobian::{central_difference, JacobianMethod};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// A vector or matrix does not have the size implied by the model.
    #[snafu(display(
        "{what} is {got_rows}x{got_cols} but the model requires {expected_rows}x{expected_cols}"
    ))]
    DimensionMismatch {
        what: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
    /// A physical or numerical parameter is outside of its valid domain.
    #[snafu(display("invalid model parameter {param} = {value}: {reason}"))]
    InvalidParameter {
        param: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl DynamicsError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Ensures that the provided matrix (or vector) has the expected number of rows and columns.
pub(crate) fn ensure_shape(
    what: &'static str,
    mat: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<(), DynamicsError> {
    ensure!(
        mat.nrows() == rows && mat.ncols() == cols,
        DimensionMismatchSnafu {
            what,
            expected_rows: rows,
            expected_cols: cols,
            got_rows: mat.nrows(),
            got_cols: mat.ncols(),
        }
    );
    Ok(())
}

/// Ensures that the provided vector has the expected length.
pub(crate) fn ensure_len(
    what: &'static str,
    vec: &DVector<f64>,
    len: usize,
) -> Result<(), DynamicsError> {
    ensure!(
        vec.len() == len,
        DimensionMismatchSnafu {
            what,
            expected_rows: len,
            expected_cols: 1_usize,
            got_rows: vec.len(),
            got_cols: 1_usize,
        }
    );
    Ok(())
}

/// Time invariant linearization of a nonlinear model about its equilibrium point.
///
/// `A = ∂f/∂x` (n×n), `B = ∂f/∂u` (n×k) and the observation matrix `C` (m×n). These are computed once, when the model is built,
/// and never change afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemMatrices {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DMatrix<f64>,
}

impl SystemMatrices {
    /// Builds the system matrices, ensuring that their dimensions are mutually consistent.
    ///
    /// A model without input should provide a zero `B` matrix with as many columns as the control vector it accepts.
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>, c: DMatrix<f64>) -> Result<Self, DynamicsError> {
        let n = a.nrows();
        ensure!(
            n > 0,
            InvalidParameterSnafu {
                param: "state size",
                value: 0.0,
                reason: "the state must have at least one component",
            }
        );
        ensure_shape("system matrix A", &a, n, n)?;
        ensure_shape("input matrix B", &b, n, b.ncols())?;
        ensure_shape("observation matrix C", &c, c.nrows(), n)?;
        ensure!(
            c.nrows() > 0,
            InvalidParameterSnafu {
                param: "observation size",
                value: 0.0,
                reason: "at least one component of the state must be observed",
            }
        );
        Ok(Self { a, b, c })
    }

    /// State size `n`
    pub fn state_size(&self) -> usize {
        self.a.nrows()
    }

    /// Control size `k`
    pub fn control_size(&self) -> usize {
        self.b.ncols()
    }

    /// Observation size `m`
    pub fn observation_size(&self) -> usize {
        self.c.nrows()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn c(&self) -> &DMatrix<f64> {
        &self.c
    }

    /// Returns the first order discrete time pair `(I + dt·A, dt·B)`, consistent with an explicit Euler step.
    pub fn discretize(&self, step: f64) -> (DMatrix<f64>, DMatrix<f64>) {
        let n = self.state_size();
        let a_d = DMatrix::<f64>::identity(n, n) + &self.a * step;
        let b_d = &self.b * step;
        (a_d, b_d)
    }

    /// Returns whether the linearized system is controllable, i.e. whether `[B, AB, ..., A^(n-1)B]` has full rank.
    pub fn is_controllable(&self) -> bool {
        let (n, k) = (self.state_size(), self.control_size());
        if k == 0 {
            return false;
        }
        let mut ctrb = DMatrix::<f64>::zeros(n, n * k);
        let mut blk = self.b.clone();
        for i in 0..n {
            ctrb.columns_mut(i * k, k).copy_from(&blk);
            blk = &self.a * blk;
        }
        ctrb.rank(1e-12) == n
    }

    /// Returns whether the linearized system is observable, i.e. whether `[C; CA; ...; CA^(n-1)]` has full rank.
    pub fn is_observable(&self) -> bool {
        let (n, m) = (self.state_size(), self.observation_size());
        let mut obsv = DMatrix::<f64>::zeros(n * m, n);
        let mut blk = self.c.clone();
        for i in 0..n {
            obsv.rows_mut(i * m, m).copy_from(&blk);
            blk = blk * &self.a;
        }
        obsv.rank(1e-12) == n
    }
}

impl fmt::Display for SystemMatrices {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "A = {}B = {}C = {}", self.a, self.b, self.c)
    }
}

/// A nonlinear, discrete step, state-space model along with its time invariant linearization.
///
/// Implementors provide the continuous time equations of motion `dx/dt = f(x, u)`; the default `propagate` integrates them
/// over one step with the model's integrator, and the default `observe` applies the observation matrix.
pub trait NonlinearModel {
    /// Discrete step `dt` (in seconds) taken by `propagate`.
    fn step(&self) -> f64;

    /// The linearization of this model, computed at construction time.
    fn matrices(&self) -> &SystemMatrices;

    /// Integrator used by `propagate`.
    fn integrator(&self) -> Integrator {
        Integrator::Euler
    }

    /// Defines the equations of motion, i.e. the exact nonlinear right hand side `f(x, u)`.
    fn eom(&self, state: &DVector<f64>, control: &DVector<f64>)
        -> Result<DVector<f64>, DynamicsError>;

    /// Advances the true state by one discrete step using the nonlinear equations of motion (not the linearized ones).
    fn propagate(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DVector<f64>, DynamicsError> {
        ensure_len("state", state, self.state_size())?;
        ensure_len("control", control, self.control_size())?;
        self.integrator()
            .integrate(|x, u| self.eom(x, u), state, control, self.step())
    }

    /// Returns the observable projection of the state. This is a pure function of the state and control.
    fn observe(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DVector<f64>, DynamicsError> {
        ensure_len("state", state, self.state_size())?;
        ensure_len("control", control, self.control_size())?;
        Ok(self.observation_matrix() * state)
    }

    /// Jacobian of the equations of motion with respect to the state, evaluated at the provided state.
    ///
    /// Defaults to the time invariant `A` matrix, which is exact for linear models.
    fn state_jacobian_at(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DMatrix<f64>, DynamicsError> {
        ensure_len("state", state, self.state_size())?;
        ensure_len("control", control, self.control_size())?;
        Ok(self.jacobian_state().clone())
    }

    /// `A = ∂f/∂x` at the equilibrium point
    fn jacobian_state(&self) -> &DMatrix<f64> {
        self.matrices().a()
    }

    /// `B = ∂f/∂u` at the equilibrium point
    fn jacobian_input(&self) -> &DMatrix<f64> {
        self.matrices().b()
    }

    /// `C`, such that `y = C·x`
    fn observation_matrix(&self) -> &DMatrix<f64> {
        self.matrices().c()
    }

    fn state_size(&self) -> usize {
        self.matrices().state_size()
    }

    fn control_size(&self) -> usize {
        self.matrices().control_size()
    }

    fn observation_size(&self) -> usize {
        self.matrices().observation_size()
    }
}

#[cfg(test)]
mod ut_system_matrices {
    use super::*;

    fn double_integrator() -> SystemMatrices {
        SystemMatrices::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
            DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        )
        .unwrap()
    }

    #[test]
    fn sizes() {
        let sys = double_integrator();
        assert_eq!(sys.state_size(), 2);
        assert_eq!(sys.control_size(), 1);
        assert_eq!(sys.observation_size(), 1);
    }

    #[test]
    fn inconsistent_dimensions() {
        let a = DMatrix::<f64>::zeros(2, 2);
        let b = DMatrix::<f64>::zeros(2, 1);
        let c = DMatrix::<f64>::zeros(1, 2);

        // A not square
        let err = SystemMatrices::new(DMatrix::zeros(2, 3), b.clone(), c.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        // B with the wrong number of rows
        assert!(SystemMatrices::new(a.clone(), DMatrix::zeros(3, 1), c.clone()).is_err());
        // C with the wrong number of columns
        let err = SystemMatrices::new(a.clone(), b.clone(), DMatrix::zeros(1, 3)).unwrap_err();
        assert_eq!(
            err,
            DynamicsError::DimensionMismatch {
                what: "observation matrix C",
                expected_rows: 1,
                expected_cols: 2,
                got_rows: 1,
                got_cols: 3
            }
        );
        // Nothing observed
        assert!(SystemMatrices::new(a.clone(), b.clone(), DMatrix::zeros(0, 2)).is_err());
        // Empty state
        assert!(SystemMatrices::new(DMatrix::zeros(0, 0), b, c).is_err());
    }

    #[test]
    fn discretization() {
        let sys = double_integrator();
        let (a_d, b_d) = sys.discretize(0.5);
        assert_eq!(a_d, DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]));
        assert_eq!(b_d, DMatrix::from_row_slice(2, 1, &[0.0, 0.5]));
    }

    #[test]
    fn controllability_observability() {
        let sys = double_integrator();
        assert!(sys.is_controllable());
        assert!(sys.is_observable());

        let no_input = SystemMatrices::new(
            sys.a().clone(),
            DMatrix::zeros(2, 1),
            sys.c().clone(),
        )
        .unwrap();
        assert!(!no_input.is_controllable());

        // Observing only the velocity does not allow recovering the position
        let vel_only = SystemMatrices::new(
            sys.a().clone(),
            sys.b().clone(),
            DMatrix::from_row_slice(1, 2, &[0.0, 1.0]),
        )
        .unwrap();
        assert!(!vel_only.is_observable());
    }
}
