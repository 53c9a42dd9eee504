// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Fixed-Point Contagion Solver

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EngineError;
use crate::network::Network;
use crate::types::*;
use crate::valuation::ValuationModel;

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Shared flag a caller flips to stop a run between rounds.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─── ContagionSolver ─────────────────────────────────────────────────────────

/// Iterates equity and claim valuation to a fixed point for one scenario.
///
/// Each round values every node's claims at the counterparty's current
/// recovery fraction and recomputes equity from those values; liabilities
/// stay at par. The network is only borrowed and never modified.
pub struct ContagionSolver<'a> {
    network: &'a Network,
    model: ValuationModel,
    settings: SolverSettings,
}

impl<'a> ContagionSolver<'a> {
    pub fn new(network: &'a Network, model: ValuationModel) -> Self {
        Self { network, model, settings: SolverSettings::default() }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn run(&self) -> RunOutcome {
        self.run_with_cancel(&CancelToken::new())
    }

    pub fn run_with_cancel(&self, cancel: &CancelToken) -> RunOutcome {
        let network = self.network;
        let n = network.len();
        let settings = self.settings;
        tracing::debug!(nodes = n, model = %self.model.kind(), "contagion run started");

        let pre_shock = network.par_equity();
        let cushions = network.capital_cushions(&pre_shock);

        let mut equity_trajectory = vec![pre_shock];
        let mut valuation_trajectory = vec![vec![1.0; n]];

        let mut equity = network.shocked_par_equity();
        equity_trajectory.push(equity.clone());

        let mut previous = vec![settings.equity_sentinel; n];
        let mut iterations = 0;

        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if max_abs_change(&equity, &previous) <= settings.tolerance {
                break Termination::Converged;
            }
            if iterations >= settings.max_iterations {
                break Termination::IterationCap;
            }

            let valuation = self.model.revalue(network, &cushions, &equity);
            let next: Vec<f64> = (0..n).map(|i| network.revalued_equity(i, &valuation)).collect();
            valuation_trajectory.push(valuation);

            previous = std::mem::replace(&mut equity, next);
            equity_trajectory.push(equity.clone());
            iterations += 1;
        };

        // Valuation of the last equity vector closes the trajectory.
        valuation_trajectory.push(self.model.revalue(network, &cushions, &equity));

        log_termination(termination, iterations);
        RunOutcome { equity_trajectory, valuation_trajectory, iterations, termination }
    }
}

pub(crate) fn log_termination(termination: Termination, iterations: usize) {
    match termination {
        Termination::Converged => {
            tracing::debug!(iterations, "contagion run converged");
        }
        Termination::IterationCap => {
            tracing::warn!(iterations, "maximum iterations reached without convergence");
        }
        Termination::Cancelled => {
            tracing::warn!(iterations, "contagion run cancelled");
        }
    }
}

/// `max_i |a_i - b_i|`; NaN entries count as not converged.
pub fn max_abs_change(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (x - y).abs();
            if d.is_nan() { f64::INFINITY } else { d }
        })
        .fold(0.0, f64::max)
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Run one scenario from the UI's plain arrays.
///
/// The model name is resolved before the network is built, so an unknown
/// name fails with [`EngineError::Configuration`] before any iteration.
pub fn run(
    external_assets: &[f64],
    external_liabilities: &[f64],
    liability_matrix: &[Vec<f64>],
    shock: &[f64],
    model_kind: &str,
    params: ValuationParameters,
) -> Result<RunOutcome, EngineError> {
    let kind: ModelKind = model_kind.parse()?;
    let network = Network::new(
        external_assets.to_vec(),
        external_liabilities.to_vec(),
        liability_matrix.to_vec(),
        shock.to_vec(),
    )?;
    Ok(ContagionSolver::new(&network, ValuationModel::select(kind, &params)).run())
}

pub fn run_scenario(scenario: &Scenario) -> Result<RunOutcome, EngineError> {
    run_scenario_with_cancel(scenario, &CancelToken::new())
}

pub fn run_scenario_with_cancel(
    scenario: &Scenario,
    cancel: &CancelToken,
) -> Result<RunOutcome, EngineError> {
    let kind = scenario.model_kind()?;
    let network = Network::from_scenario(scenario)?;
    let model = ValuationModel::select(kind, &scenario.params);
    Ok(ContagionSolver::new(&network, model).run_with_cancel(cancel))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
