use crate::{init_logger, simulation};
use ballistic_ekf::prelude::*;

#[test]
fn free_fall_tracking() {
    init_logger();

    let ball = FallingBall::free(BallPhysics::new(-10.0, 0.1).unwrap(), 1.0).unwrap();
    assert!(!ball.matrices().is_controllable());

    let sim = simulation(
        ball,
        KalmanVariant::Linearized,
        &[100.0, 0.0],
        0.0,
        &[0.25, 0.25],
        1e-6,
        50,
        0,
    );
    let results = sim.run().unwrap();
    assert_eq!(results.records.len(), 50);

    for rec in &results.records {
        let pos_err = (rec.truth[0] - rec.estimate.state[0]).abs();
        assert!(
            pos_err < 1.0,
            "step {}: position error of {pos_err} m",
            rec.step
        );
    }
    assert!(results.max_abs_error(0).unwrap() < 1.0);

    // The ball reaches its terminal speed after the first step, and then falls 10 m per step
    assert_eq!(results.records[49].truth[0], -390.0);
    assert_eq!(results.records[49].truth[1], -10.0);

    println!("{results}");
    assert!(results.filter_error.is_finite());
    assert!(results.filter_error < 1e4);

    // Once the velocity has been observed, the estimate is consistent with the truth
    let late = &results.records[10..];
    assert!(late.iter().all(|rec| rec.nees < 50.0));
    let final_est = results.final_estimate().unwrap();
    assert!((final_est.state[1] + 10.0).abs() < 1e-2);
}

#[test]
fn free_fall_series() {
    let ball = FallingBall::free(BallPhysics::default(), 1.0).unwrap();
    let results = simulation(
        ball,
        KalmanVariant::Linearized,
        &[100.0, 0.0],
        0.0,
        &[0.25, 0.25],
        1e-6,
        5,
        1,
    )
    .run()
    .unwrap();

    let truth = results.truth_series();
    assert_eq!(
        truth,
        vec![(0, 100.0), (1, 90.0), (2, 80.0), (3, 70.0), (4, 60.0)]
    );
    for ((i, msr), (j, filt)) in results
        .measurement_series()
        .into_iter()
        .zip(results.filter_series())
    {
        assert_eq!(i, j);
        assert!((msr - truth[i].1).abs() < 1e-2);
        assert!((filt - truth[i].1).abs() < 1e-2);
    }
}
