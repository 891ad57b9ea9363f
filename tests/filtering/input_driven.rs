use crate::init_logger;
use ballistic_ekf::prelude::*;
use rstest::rstest;

#[rstest]
#[case(JacobianMethod::Analytic)]
#[case(JacobianMethod::FiniteDifference)]
fn input_driven_linearization(#[case] method: JacobianMethod) {
    let physics = BallPhysics::default();
    let ball = FallingBall::new(physics, Actuation::Input, 1.0, method).unwrap();
    let (x_eq, u_eq) = ball.equilibrium();

    assert_eq!(x_eq, &DVector::from_vec(vec![0.0, 0.0]));
    assert_eq!(u_eq, &DVector::from_element(1, 10.0));
    assert_eq!(ball.sode(x_eq, u_eq).unwrap(), DVector::zeros(2));

    // Stabilized double integrator: both eigenvalues of A are zero
    let a = ball.jacobian_state();
    assert!(a.trace().abs() < 1e-5);
    assert!(a.determinant().abs() < 1e-5);
    assert!((a[(0, 1)] - 1.0).abs() < 1e-5);

    assert!((ball.jacobian_input()[(1, 0)] - 1.0).abs() < 1e-5);
    assert!(ball.matrices().is_controllable());
    assert!(ball.matrices().is_observable());
    assert_eq!(
        ball.observation_matrix(),
        &DMatrix::from_row_slice(1, 2, &[1.0, 0.0])
    );
}

#[test]
fn default_scenario_runs() {
    init_logger();

    let scenario = ScenarioSerde {
        seed: Some(2024),
        ..Default::default()
    };
    let sim = scenario.to_simulation().unwrap();
    let results = sim.run().unwrap();

    assert_eq!(results.records.len(), 50);
    assert_eq!(results.truth_series().len(), 50);
    assert_eq!(results.measurement_series().len(), 50);
    assert_eq!(results.filter_series().len(), 50);
    assert!(results.filter_error.is_finite());

    for rec in &results.records {
        assert!(rec.truth.iter().all(|v| v.is_finite()));
        assert!(rec.estimate.state.iter().all(|v| v.is_finite()));
    }

    // Same seed, same run
    assert_eq!(scenario.to_simulation().unwrap().run().unwrap(), results);
}
