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

use super::jacobian::{central_difference, JacobianMethod};
use super::{ensure_len, DynamicsError, InvalidParameterSnafu, NonlinearModel, SystemMatrices};
use crate::linalg::{DMatrix, DVector};
use crate::propagators::Integrator;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// Physical parameters of the falling ball.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallPhysics {
    /// Local gravity field expressed as a scalar, negative when pointing down (m/s^2).
    pub gravity: f64,
    /// Viscous drag coefficient experienced by the ball in the fluid, i.e. drag force over mass (1/m).
    pub drag: f64,
}

impl BallPhysics {
    /// Initializes and validates a new set of physical parameters.
    pub fn new(gravity: f64, drag: f64) -> Result<Self, DynamicsError> {
        let me = Self { gravity, drag };
        me.validate()?;
        Ok(me)
    }

    pub(crate) fn validate(&self) -> Result<(), DynamicsError> {
        ensure!(
            self.gravity.is_finite(),
            InvalidParameterSnafu {
                param: "gravity",
                value: self.gravity,
                reason: "must be finite",
            }
        );
        ensure!(
            self.drag.is_finite() && self.drag >= 0.0,
            InvalidParameterSnafu {
                param: "drag",
                value: self.drag,
                reason: "must be finite and non-negative",
            }
        );
        Ok(())
    }

    /// Speed at which the quadratic drag balances gravity, infinite without drag.
    pub fn terminal_speed(&self) -> f64 {
        if self.drag > 0.0 {
            (self.gravity.abs() / self.drag).sqrt()
        } else {
            f64::INFINITY
        }
    }
}

impl Default for BallPhysics {
    /// Gravity of -10 m/s^2 and a drag coefficient of 0.1.
    fn default() -> Self {
        Self {
            gravity: -10.0,
            drag: 0.1,
        }
    }
}

/// Whether an external force acts on the ball.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actuation {
    /// The ball falls freely: the control vector is accepted but has no influence, and the model is not controllable.
    #[default]
    Free,
    /// The first control component is an acceleration added to the velocity equation.
    Input,
}

/// A falling ball with quadratic drag, represented by the equations:
///
/// ```text
/// dx/dt = v                    (change in position equal to velocity)
/// dv/dt = g - ξ·|v|·v [+ u]    (gravity, quadratic drag, and the optional input)
/// ```
///
/// The state is `[x, v]` and only the position is observed, i.e. `C = [1 0]`. The linearization is computed about the
/// equilibrium `x = [0, 0]`, with `u = [-g]` for the input driven ball (the force exactly cancelling gravity).
#[derive(Clone, Debug, PartialEq)]
pub struct FallingBall {
    pub physics: BallPhysics,
    pub actuation: Actuation,
    integrator: Integrator,
    step: f64,
    matrices: SystemMatrices,
    x_eq: DVector<f64>,
    u_eq: DVector<f64>,
}

impl FallingBall {
    /// A freely falling ball, linearized analytically.
    pub fn free(physics: BallPhysics, step: f64) -> Result<Self, DynamicsError> {
        Self::new(physics, Actuation::Free, step, JacobianMethod::Analytic)
    }

    /// A ball driven by an input force, linearized analytically.
    pub fn input_driven(physics: BallPhysics, step: f64) -> Result<Self, DynamicsError> {
        Self::new(physics, Actuation::Input, step, JacobianMethod::Analytic)
    }

    /// Builds the model and computes its linearization about the equilibrium point using the requested method.
    pub fn new(
        physics: BallPhysics,
        actuation: Actuation,
        step: f64,
        method: JacobianMethod,
    ) -> Result<Self, DynamicsError> {
        physics.validate()?;
        ensure!(
            step.is_finite() && step > 0.0,
            InvalidParameterSnafu {
                param: "step",
                value: step,
                reason: "must be finite and strictly positive",
            }
        );

        let x_eq = DVector::from_vec(vec![0.0, 0.0]);
        let u_eq = match actuation {
            Actuation::Free => DVector::from_vec(vec![0.0]),
            // To hold the ball, the input must be the opposite of gravity
            Actuation::Input => DVector::from_vec(vec![-physics.gravity]),
        };

        let (a, b) = match method {
            JacobianMethod::Analytic => (
                analytic_state_jacobian(&physics, &x_eq),
                analytic_input_jacobian(actuation),
            ),
            JacobianMethod::FiniteDifference => (
                central_difference(|x| Ok(ball_eom(&physics, actuation, x, &u_eq)), &x_eq)?,
                central_difference(|u| Ok(ball_eom(&physics, actuation, &x_eq, u)), &u_eq)?,
            ),
        };

        let c = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);

        Ok(Self {
            physics,
            actuation,
            integrator: Integrator::default(),
            step,
            matrices: SystemMatrices::new(a, b, c)?,
            x_eq,
            u_eq,
        })
    }

    /// Switches the integrator used to propagate the true dynamics.
    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Returns the equilibrium state and control about which this model was linearized.
    pub fn equilibrium(&self) -> (&DVector<f64>, &DVector<f64>) {
        (&self.x_eq, &self.u_eq)
    }

    /// The system of differential equations of the ball, `dx/dt = f(x, u)`.
    pub fn sode(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DVector<f64>, DynamicsError> {
        ensure_len("state", state, 2)?;
        ensure_len("control", control, 1)?;
        Ok(ball_eom(&self.physics, self.actuation, state, control))
    }
}

impl NonlinearModel for FallingBall {
    fn step(&self) -> f64 {
        self.step
    }

    fn matrices(&self) -> &SystemMatrices {
        &self.matrices
    }

    fn integrator(&self) -> Integrator {
        self.integrator
    }

    fn eom(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DVector<f64>, DynamicsError> {
        self.sode(state, control)
    }

    fn state_jacobian_at(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
    ) -> Result<DMatrix<f64>, DynamicsError> {
        ensure_len("state", state, 2)?;
        ensure_len("control", control, 1)?;
        Ok(analytic_state_jacobian(&self.physics, state))
    }
}

impl fmt::Display for FallingBall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.actuation {
            Actuation::Free => "free falling",
            Actuation::Input => "input driven",
        };
        write!(
            f,
            "{kind} ball (g = {} m/s^2, ξ = {}, dt = {} s, {})",
            self.physics.gravity, self.physics.drag, self.step, self.integrator
        )
    }
}

fn ball_eom(
    physics: &BallPhysics,
    actuation: Actuation,
    state: &DVector<f64>,
    control: &DVector<f64>,
) -> DVector<f64> {
    let vel = state[1];
    let mut accel = physics.gravity - physics.drag * vel.abs() * vel;
    if actuation == Actuation::Input {
        accel += control[0];
    }
    DVector::from_vec(vec![vel, accel])
}

/// ∂f/∂x, where d(|v|·v)/dv = 2|v|
fn analytic_state_jacobian(physics: &BallPhysics, state: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_row_slice(
        2,
        2,
        &[0.0, 1.0, 0.0, -2.0 * physics.drag * state[1].abs()],
    )
}

fn analytic_input_jacobian(actuation: Actuation) -> DMatrix<f64> {
    match actuation {
        Actuation::Free => DMatrix::zeros(2, 1),
        Actuation::Input => DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
    }
}

#[cfg(test)]
mod ut_falling_ball {
    use super::*;
    use crate::errors::ErrorKind;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn vec2(x: f64, v: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, v])
    }

    #[test]
    fn sode_vanishes_at_equilibrium() {
        let ball = FallingBall::input_driven(BallPhysics::default(), 1.0).unwrap();
        let (x_eq, u_eq) = ball.equilibrium();
        assert_eq!(u_eq[0], 10.0);
        assert_eq!(ball.sode(x_eq, u_eq).unwrap(), DVector::zeros(2));
    }

    #[test]
    fn free_fall_is_not_controllable() {
        let ball = FallingBall::free(BallPhysics::default(), 1.0).unwrap();
        assert_eq!(ball.jacobian_input(), &DMatrix::<f64>::zeros(2, 1));
        assert!(!ball.matrices().is_controllable());
        assert!(ball.matrices().is_observable());

        // The input has no influence on a free falling ball
        let x = vec2(100.0, -3.0);
        assert_eq!(
            ball.propagate(&x, &DVector::from_element(1, 0.0)).unwrap(),
            ball.propagate(&x, &DVector::from_element(1, 25.0)).unwrap()
        );
    }

    #[test]
    fn input_driven_is_controllable() {
        let ball = FallingBall::input_driven(BallPhysics::default(), 1.0).unwrap();
        assert_eq!(
            ball.jacobian_input(),
            &DMatrix::from_row_slice(2, 1, &[0.0, 1.0])
        );
        assert!(ball.matrices().is_controllable());
    }

    #[test]
    fn stabilized_double_integrator() {
        let ball = FallingBall::input_driven(BallPhysics::default(), 1.0).unwrap();
        let a = ball.jacobian_state();
        assert_eq!(a, &DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]));
        // Both eigenvalues are zero: no growing mode at the equilibrium
        assert_eq!(a.trace(), 0.0);
        assert_eq!(a.determinant(), 0.0);
        assert_eq!(a * a, DMatrix::<f64>::zeros(2, 2));
    }

    #[rstest]
    #[case(Actuation::Free)]
    #[case(Actuation::Input)]
    fn analytic_matches_finite_difference(#[case] actuation: Actuation) {
        let physics = BallPhysics::new(-9.81, 0.25).unwrap();
        let analytic = FallingBall::new(physics, actuation, 0.1, JacobianMethod::Analytic).unwrap();
        let numeric =
            FallingBall::new(physics, actuation, 0.1, JacobianMethod::FiniteDifference).unwrap();

        assert_abs_diff_eq!(
            analytic.jacobian_state(),
            numeric.jacobian_state(),
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(
            analytic.jacobian_input(),
            numeric.jacobian_input(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn jacobian_away_from_equilibrium() {
        let ball = FallingBall::free(BallPhysics::default(), 1.0).unwrap();
        let u = DVector::from_element(1, 0.0);
        let x = vec2(50.0, -4.0);
        let analytic = ball.state_jacobian_at(&x, &u).unwrap();
        let numeric = central_difference(|x| ball.sode(x, &u), &x).unwrap();
        assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-6);
        assert_abs_diff_eq!(analytic[(1, 1)], -0.8, epsilon = 1e-12);
    }

    #[test]
    fn euler_propagation() {
        let ball = FallingBall::free(BallPhysics::default(), 1.0).unwrap();
        let u = DVector::from_element(1, 0.0);

        // With dt = 1 s, the ball reaches its terminal speed of 10 m/s in a single step
        let x1 = ball.propagate(&vec2(100.0, 0.0), &u).unwrap();
        assert_eq!(x1, vec2(100.0, -10.0));
        let x2 = ball.propagate(&x1, &u).unwrap();
        assert_eq!(x2, vec2(90.0, -10.0));
        assert_eq!(ball.physics.terminal_speed(), 10.0);

        // Only the position is observed
        assert_eq!(ball.observe(&x2, &u).unwrap(), DVector::from_element(1, 90.0));
    }

    #[test]
    fn rk4_converges_to_terminal_speed() {
        let ball = FallingBall::free(BallPhysics::default(), 0.05)
            .unwrap()
            .with_integrator(Integrator::Rk4);
        let u = DVector::from_element(1, 0.0);
        let mut x = vec2(1000.0, 0.0);
        for _ in 0..400 {
            x = ball.propagate(&x, &u).unwrap();
        }
        assert_abs_diff_eq!(x[1], -10.0, epsilon = 1e-6);
        assert!(x[0] < 1000.0);
    }

    #[test]
    fn input_driven_hovers() {
        let ball = FallingBall::input_driven(BallPhysics::default(), 0.5).unwrap();
        let (x_eq, u_eq) = ball.equilibrium();
        let mut x = x_eq.clone();
        for _ in 0..10 {
            x = ball.propagate(&x, u_eq).unwrap();
        }
        assert_eq!(&x, x_eq);
    }

    #[test]
    fn invalid_configuration() {
        let err = FallingBall::free(BallPhysics::default(), 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(FallingBall::free(BallPhysics::default(), f64::NAN).is_err());
        assert!(BallPhysics::new(f64::INFINITY, 0.1).is_err());
        assert!(BallPhysics::new(-10.0, -0.1).is_err());

        let ball = FallingBall::free(BallPhysics::default(), 1.0).unwrap();
        let short = DVector::from_element(1, 1.0);
        let u = DVector::from_element(1, 0.0);
        assert!(matches!(
            ball.propagate(&short, &u),
            Err(DynamicsError::DimensionMismatch { what: "state", .. })
        ));
        assert!(matches!(
            ball.observe(&vec2(0.0, 0.0), &DVector::zeros(2)),
            Err(DynamicsError::DimensionMismatch { what: "control", .. })
        ));
    }
}
