use ballistic_ekf::prelude::*;
use std::env;
use std::path::PathBuf;

fn scenario_path(name: &str) -> PathBuf {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or(".".to_string()));
    manifest_dir.join("data").join("scenarios").join(name)
}

#[test]
fn free_fall_from_file() {
    let scenario = ScenarioSerde::load(scenario_path("free_fall.yaml")).unwrap();
    assert_eq!(scenario.actuation, Actuation::Free);
    assert!(scenario.initial_dispersion.is_none());
    assert_eq!(scenario.seed, Some(0));

    let results = scenario.to_simulation().unwrap().run().unwrap();
    assert_eq!(results.records.len(), 50);
    assert!(results.max_abs_error(0).unwrap() < 1.0);
    assert!(results.filter_error.is_finite());
}

#[test]
fn propelled_nonlinear_from_file() {
    let scenario = ScenarioSerde::load(scenario_path("propelled_nonlinear.yaml")).unwrap();
    assert_eq!(scenario.variant, KalmanVariant::Nonlinear);
    assert_eq!(scenario.covar_update, CovarianceUpdate::Joseph);
    assert_eq!(scenario.jacobian, JacobianMethod::FiniteDifference);
    assert_eq!(
        scenario.process_covar.as_ref().unwrap().to_matrix().unwrap(),
        DMatrix::from_row_slice(2, 2, &[1e-6, 0.0, 0.0, 1e-4])
    );

    let sim = scenario.to_simulation().unwrap();
    assert_eq!(sim.truth_model.integrator(), Integrator::Rk4);
    let results = sim.run().unwrap();
    assert_eq!(results.records.len(), 100);
    let last = results.records.last().unwrap();
    assert!((last.truth[0] - last.estimate.state[0]).abs() < 0.5);
}

#[test]
fn many_scenarios() {
    let yaml = r#"
- steps: 5
  actuation: free
  control: [0.0]
- steps: 7
  seed: 1
"#;
    let scenarios = ScenarioSerde::loads_many(yaml).unwrap();
    assert_eq!(scenarios.len(), 2);
    for scenario in &scenarios {
        let results = scenario.to_simulation().unwrap().run().unwrap();
        assert_eq!(results.records.len(), scenario.steps);
    }
}
