use crate::{init_logger, simulation};
use ballistic_ekf::prelude::*;

fn propelled_ball() -> FallingBall {
    FallingBall::input_driven(BallPhysics::default(), 0.1)
        .unwrap()
        .with_integrator(Integrator::Rk4)
}

#[test]
fn nonlinear_mean_tracks_propelled_ball() {
    init_logger();

    let run = |variant| {
        simulation(
            propelled_ball(),
            variant,
            &[100.0, 0.0],
            -1.0,
            &[1.0, 1.0],
            0.01,
            100,
            7,
        )
        .run()
        .unwrap()
    };

    let nonlinear = run(KalmanVariant::Nonlinear);
    let linearized = run(KalmanVariant::Linearized);

    let late_err = |results: &SimulationResults| {
        results.records[50..]
            .iter()
            .map(|rec| (rec.truth[0] - rec.estimate.state[0]).abs())
            .fold(0.0, f64::max)
    };

    let nl_err = late_err(&nonlinear);
    let lin_err = late_err(&linearized);
    println!("nonlinear: {nonlinear}\nlinearized: {linearized}");
    println!("late position errors: nonlinear {nl_err:.3e} m, linearized {lin_err:.3e} m");

    assert!(nl_err < 0.5);
    assert!(nl_err < lin_err);

    // The truth converges to the terminal speed with the input force, sqrt(110) m/s
    let final_truth = &nonlinear.records[99].truth;
    assert!((final_truth[1] + 110.0_f64.sqrt()).abs() < 1e-3);
    let final_est = nonlinear.final_estimate().unwrap();
    assert!((final_est.state[1] - final_truth[1]).abs() < 0.5);
}

#[test]
fn joseph_update_in_simulation() {
    let ball = propelled_ball();
    let r = DMatrix::from_element(1, 1, 0.01);
    let x0 = DVector::from_vec(vec![100.0, 0.0]);
    let prior = Estimate::from_diag(x0.clone(), &[1.0, 1.0]).unwrap();

    let run = |covar_update| {
        let filter = ExtendedKalmanFilter::new(ball.clone(), r.clone(), None)
            .unwrap()
            .with_variant(KalmanVariant::Nonlinear)
            .with_covar_update(covar_update);
        Simulation::builder()
            .truth_model(ball.clone())
            .filter(filter)
            .initial_state(x0.clone())
            .prior(prior.clone())
            .control(DVector::from_element(1, -1.0))
            .measurement_noise(GaussianNoise::zero_mean(r.clone()).unwrap())
            .steps(30)
            .seed(11)
            .build()
            .run()
            .unwrap()
    };

    let standard = run(CovarianceUpdate::Standard);
    let joseph = run(CovarianceUpdate::Joseph);

    for (std_rec, jos_rec) in standard.records.iter().zip(&joseph.records) {
        assert_eq!(std_rec.measurement, jos_rec.measurement);
        assert!((&std_rec.estimate.state - &jos_rec.estimate.state).amax() < 1e-6);
    }
}
