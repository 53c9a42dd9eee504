// Multi-Seed Bench Runs
// Each preset runs once per seed under both solver modes, then aggregates

use std::time::Instant;

use contagion_engine::*;

use crate::report::*;
use crate::scenarios::Preset;

/// Sequential and row-parallel results must agree this closely.
pub const AGREEMENT_TOLERANCE: f64 = 1e-9;

fn max_disagreement(a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| solver::max_abs_change(x, y))
        .fold(0.0, f64::max)
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Run one network under one model with both solver modes.
pub fn run_single(
    scenario: &Scenario,
    preset: &str,
    seed: u64,
    dispatch: &ComputeDispatch,
) -> Result<BenchResult, EngineError> {
    let kind = scenario.model_kind()?;
    let network = Network::from_scenario(scenario)?;
    let model = ValuationModel::select(kind, &scenario.params);

    let start = Instant::now();
    let sequential = ContagionSolver::new(&network, model).run();
    let sequential_ms = ms_since(start);

    let start = Instant::now();
    let parallel = dispatch.run_row_parallel(&network, model, SolverSettings::default(), &CancelToken::new());
    let row_parallel_ms = ms_since(start);

    let disagreement = max_disagreement(&sequential.equity_trajectory, &parallel.equity_trajectory).max(
        max_disagreement(&sequential.valuation_trajectory, &parallel.valuation_trajectory),
    );

    Ok(BenchResult {
        preset: preset.to_string(),
        model: kind.name().to_string(),
        seed,
        nodes: network.len(),
        pass: sequential.iterations == parallel.iterations && disagreement <= AGREEMENT_TOLERANCE,
        iterations: sequential.iterations,
        termination: format!("{:?}", sequential.termination),
        defaulted: sequential.defaulted_nodes().len(),
        max_disagreement: disagreement,
        sequential_ms,
        row_parallel_ms,
    })
}

/// Run a preset `n_runs` times (seeds `base_seed..`) under one model.
/// Fixed presets ignore the seed, so they run once.
pub fn run_monte_carlo(
    preset: &Preset,
    model: ModelKind,
    n_runs: usize,
    base_seed: u64,
    dispatch: &ComputeDispatch,
) -> Result<PresetReport, EngineError> {
    let runs = if preset.is_random() { n_runs.max(1) } else { 1 };

    let mut results = Vec::with_capacity(runs);
    for i in 0..runs {
        let seed = base_seed + i as u64;
        let scenario = preset.build(seed).into_scenario(model.name());
        results.push(run_single(&scenario, preset.name, seed, dispatch)?);
    }

    Ok(aggregate(preset, model, results))
}

/// Aggregate individual runs into a PresetReport.
fn aggregate(preset: &Preset, model: ModelKind, results: Vec<BenchResult>) -> PresetReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let converged = results.iter().filter(|r| r.termination == "Converged").count();

    let iterations = Stats::from_samples(
        &results.iter().map(|r| r.iterations as f64).collect::<Vec<_>>()
    );
    let defaulted = Stats::from_samples(
        &results.iter().map(|r| r.defaulted as f64).collect::<Vec<_>>()
    );
    let sequential_ms = Stats::from_samples(
        &results.iter().map(|r| r.sequential_ms).collect::<Vec<_>>()
    );
    let row_parallel_ms = Stats::from_samples(
        &results.iter().map(|r| r.row_parallel_ms).collect::<Vec<_>>()
    );

    PresetReport {
        preset: preset.name.to_string(),
        label: preset.label.to_string(),
        model: model.name().to_string(),
        n_runs: n,
        pass_rate: passed as f64 / n as f64,
        converged_rate: converged as f64 / n as f64,
        iterations,
        defaulted,
        max_disagreement: results.iter().map(|r| r.max_disagreement).fold(0.0, f64::max),
        sequential_ms,
        row_parallel_ms,
        individual_runs: results,
    }
}
