//! Resolution driver tests: retries, end-to-end recovery, idempotence.

use rand::rngs::StdRng;
use rand::SeedableRng;

use solon_data::ResponseData;
use solon_engine::{EngineConfig, EngineError, FitResult, Inference, LaplaceEngine};
use solon_identify::{
    identify_draws, resolve, AnchorPair, AnchorTargets, IdentifyConfig, IdentifyError,
    IdentifyState,
};
use solon_model::{ModelSpec, ModelType, TimeProcess};
use solon_sim::{simulate, SimConfig};

/// An engine whose convergence guard always fires.
struct AlwaysDiverges;

impl Inference for AlwaysDiverges {
    fn run(
        &self,
        _data: &ResponseData,
        _spec: &ModelSpec,
        _config: &EngineConfig,
        _rng: &mut StdRng,
    ) -> Result<FitResult, EngineError> {
        Err(EngineError::NotConverged {
            max_rhat: 2.0,
            threshold: 1.1,
        })
    }
}

fn simulated_binary(seed: u64) -> solon_sim::SimOutput {
    let config = SimConfig::new(ModelType::Binary, 30, 20).with_trait_spread(2.0);
    let mut rng = StdRng::seed_from_u64(seed);
    simulate(&config, &mut rng).unwrap()
}

#[test]
fn resolve_identifies_with_automatic_anchors() {
    let sim = simulated_binary(11);
    let spec = ModelSpec::new(ModelType::Binary);
    let engine_config = EngineConfig::new().with_iterations(600, 100);
    let (draws, report) = resolve(
        &LaplaceEngine::new(),
        &sim.data,
        &spec,
        &engine_config,
        &IdentifyConfig::new(),
        42,
    )
    .unwrap();

    assert_eq!(report.state, IdentifyState::Identified);
    assert_eq!(report.attempts, 1);
    // The high anchor sits above the low anchor in every single draw.
    for d in 0..draws.n_draws() {
        let high = draws.theta()[[d, draws.slot(report.anchors.high, 0)]];
        let low = draws.theta()[[d, draws.slot(report.anchors.low, 0)]];
        assert!(high > low, "draw {d}: {high} <= {low}");
    }
    // With explicit targets absent, the anchors land on their posterior
    // means exactly.
    let means = draws.posterior_mean_theta();
    assert!((means[report.anchors.high] - report.targets.high).abs() < 1e-8);
    assert!((means[report.anchors.low] - report.targets.low).abs() < 1e-8);
}

#[test]
fn end_to_end_recovers_trait_ordering() {
    let sim = simulated_binary(21);
    let truth = &sim.truth.theta;

    // Anchor the two most extreme true persons at their true values.
    let (mut high, mut low) = (0usize, 0usize);
    for p in 0..truth.len() {
        if truth[p] > truth[high] {
            high = p;
        }
        if truth[p] < truth[low] {
            low = p;
        }
    }

    let spec = ModelSpec::new(ModelType::Binary);
    let engine_config = EngineConfig::new().with_iterations(600, 100);
    let identify_config = IdentifyConfig::new()
        .with_anchors(AnchorPair::new(high, low).unwrap())
        .with_targets(AnchorTargets::new(truth[high], truth[low]).unwrap());

    let (draws, _) = resolve(
        &LaplaceEngine::new(),
        &sim.data,
        &spec,
        &engine_config,
        &identify_config,
        7,
    )
    .unwrap();

    let means = draws.posterior_mean_theta();
    let rho = solon_stats::spearman_correlation(truth, &means).unwrap();
    assert!(rho >= 0.9, "spearman = {rho}");
}

#[test]
fn identify_draws_is_idempotent() {
    let sim = simulated_binary(31);
    let spec = ModelSpec::new(ModelType::Binary);
    let engine_config = EngineConfig::new().with_iterations(200, 100);
    let config = IdentifyConfig::new()
        .with_anchors(AnchorPair::new(0, 1).unwrap())
        .with_targets(AnchorTargets::new(1.0, -1.0).unwrap());

    let (mut draws, _) = resolve(
        &LaplaceEngine::new(),
        &sim.data,
        &spec,
        &engine_config,
        &config,
        3,
    )
    .unwrap();
    let once = draws.theta().clone();
    identify_draws(&mut draws, TimeProcess::Static, &config).unwrap();
    for (a, b) in once.iter().zip(draws.theta().iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn convergence_failures_exhaust_the_attempt_budget() {
    let sim = simulated_binary(41);
    let spec = ModelSpec::new(ModelType::Binary);
    let res = resolve(
        &AlwaysDiverges,
        &sim.data,
        &spec,
        &EngineConfig::new(),
        &IdentifyConfig::new().with_max_attempts(3),
        1,
    );
    match res {
        Err(IdentifyError::AttemptsExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, EngineError::NotConverged { .. }));
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
}

#[test]
fn explicit_anchors_with_posterior_mean_targets() {
    let sim = simulated_binary(51);
    let spec = ModelSpec::new(ModelType::Binary);
    let engine_config = EngineConfig::new().with_iterations(200, 100);
    let config = IdentifyConfig::new().with_anchors(AnchorPair::new(2, 9).unwrap());
    let (_, report) = resolve(
        &LaplaceEngine::new(),
        &sim.data,
        &spec,
        &engine_config,
        &config,
        13,
    )
    .unwrap();
    // Targets derive from the posterior and come out ordered.
    assert!(report.targets.high > report.targets.low);
    assert_eq!(report.anchors, AnchorPair::new(2, 9).unwrap());
}
