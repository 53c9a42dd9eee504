// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Compute Dispatch

//! Runs contagion scenarios off the caller's thread on a bounded rayon pool.
//!
//! Two modes:
//! - whole-run offload: [`ComputeDispatch::submit`] runs one scenario per task;
//! - row-parallel: each round fans out one stateless task per node and joins
//!   them before the next round ([`ComputeDispatch::run_row_parallel`]).
//!
//! Row-parallel rounds are fused so a single fan-out per round suffices: the
//! task for node i reads the complete valuation snapshot of round t, computes
//! its round t+1 equity and then the recovery of claims on itself at that
//! equity. Results match the sequential solver bit for bit, since both call
//! the same kernels in the same summation order.
//!
//! [`ComputeDispatch::submit_node_update`] is the unfused node task: it values
//! claims at the equity the caller passes in and revalues equity against the
//! snapshot, leaving the round bookkeeping to the caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::executor::block_on;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::EngineError;
use crate::network::{node_equity, Network};
use crate::solver::{self, log_termination, max_abs_change, CancelToken};
use crate::types::*;
use crate::valuation::{NodeBalance, ValuationModel};

// ---------------------------------------------------------------------------
// Pending results
// ---------------------------------------------------------------------------

/// Result of a task running on the pool. Await it, or block with
/// [`Pending::wait`]. A task that panics resolves to [`EngineError::Dispatch`].
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, EngineError>>,
}

fn pending<T>() -> (Pending<T>, oneshot::Sender<Result<T, EngineError>>) {
    let (tx, rx) = oneshot::channel();
    (Pending { rx }, tx)
}

fn worker_lost(_: oneshot::Canceled) -> EngineError {
    EngineError::Dispatch("worker task terminated before completing".into())
}

impl<T> Pending<T> {
    /// Block until the task finishes.
    pub fn wait(self) -> Result<T, EngineError> {
        block_on(self.rx).map_err(worker_lost)?
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, EngineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.map_err(worker_lost).and_then(|out| out))
    }
}

// ---------------------------------------------------------------------------
// Node-level kernels
// ---------------------------------------------------------------------------

/// Inputs of one node's update. Borrowed slices point into a network shared
/// read-only by every task of the round.
#[derive(Debug, Clone, Copy)]
pub struct NodeUpdate<'a> {
    pub index: usize,
    /// Row i of L (what the node owes)
    pub liability_row: &'a [f64],
    /// Column i of L (what the node is owed)
    pub claim_column: &'a [f64],
    pub external_assets: f64,
    pub external_liabilities: f64,
    pub shock: f64,
    /// Equity after the previous round
    pub previous_equity: f64,
    pub cushion: f64,
}

impl<'a> NodeUpdate<'a> {
    pub fn from_network(network: &'a Network, index: usize, previous_equity: f64, cushion: f64) -> Self {
        Self {
            index,
            liability_row: network.liability_row(index),
            claim_column: network.claim_column(index),
            external_assets: network.external_assets()[index],
            external_liabilities: network.external_liabilities()[index],
            shock: network.shock()[index],
            previous_equity,
            cushion,
        }
    }

    fn interbank(&self) -> f64 {
        self.liability_row.iter().sum()
    }

    fn recovery_at(&self, model: &ValuationModel, interbank: f64, equity: f64) -> f64 {
        model.recovery(&NodeBalance {
            equity,
            external_assets: self.external_assets,
            total_liabilities: interbank + self.external_liabilities,
            cushion: self.cushion,
        })
    }

    fn equity_against(&self, interbank: f64, valuation: &[f64]) -> f64 {
        node_equity(
            self.external_assets,
            self.shock,
            self.claim_column,
            valuation,
            interbank,
            self.external_liabilities,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeOutcome {
    pub index: usize,
    /// Equity revalued against the valuation snapshot
    pub equity: f64,
    /// Recovery fraction of claims on this node at `previous_equity`
    pub recovery: f64,
    /// `|equity - previous_equity|`
    pub shift: f64,
}

/// One node's step: value claims on the node at `previous_equity`, then
/// revalue its equity against `valuation`. Pure; writes nothing shared.
pub fn update_node(update: &NodeUpdate<'_>, model: &ValuationModel, valuation: &[f64]) -> NodeOutcome {
    let interbank = update.interbank();
    let recovery = update.recovery_at(model, interbank, update.previous_equity);
    let equity = update.equity_against(interbank, valuation);
    NodeOutcome {
        index: update.index,
        equity,
        recovery,
        shift: (equity - update.previous_equity).abs(),
    }
}

/// Fused round step: revalue equity against `valuation`, then value claims
/// on the node at that new equity.
fn advance_node(update: &NodeUpdate<'_>, model: &ValuationModel, valuation: &[f64]) -> NodeOutcome {
    let interbank = update.interbank();
    let equity = update.equity_against(interbank, valuation);
    NodeOutcome {
        index: update.index,
        equity,
        recovery: update.recovery_at(model, interbank, equity),
        shift: (equity - update.previous_equity).abs(),
    }
}

// ---------------------------------------------------------------------------
// Per-run round state
// ---------------------------------------------------------------------------

/// State owned by one row-parallel run; never shared between runs.
struct RoundContext {
    round: usize,
    equity: Vec<f64>,
    /// Valuation of `equity`; read-only while a round is in flight
    valuation: Vec<f64>,
    max_shift: f64,
}

// ---------------------------------------------------------------------------
// ComputeDispatch
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ComputeDispatch {
    pool: Arc<ThreadPool>,
}

impl ComputeDispatch {
    /// Pool with `threads` workers (0 picks the available parallelism).
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("contagion-worker-{i}"))
            .panic_handler(|_| tracing::error!("contagion worker task panicked"))
            .build()
            .map_err(|e| EngineError::Dispatch(e.to_string()))?;
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run a whole scenario on the pool. Never blocks the caller.
    pub fn submit(&self, scenario: Scenario) -> Pending<RunOutcome> {
        self.submit_cancellable(scenario, CancelToken::new())
    }

    pub fn submit_cancellable(&self, scenario: Scenario, cancel: CancelToken) -> Pending<RunOutcome> {
        let (pending, tx) = pending();
        self.pool.spawn(move || {
            let _ = tx.send(solver::run_scenario_with_cancel(&scenario, &cancel));
        });
        pending
    }

    /// Run a whole scenario on the pool with its rounds fanned out by node.
    pub fn submit_row_parallel(&self, scenario: Scenario, cancel: CancelToken) -> Pending<RunOutcome> {
        let (pending, tx) = pending();
        let this = self.clone();
        self.pool.spawn(move || {
            let result = scenario.model_kind().and_then(|kind| {
                let network = Network::from_scenario(&scenario)?;
                let model = ValuationModel::select(kind, &scenario.params);
                Ok(this.run_row_parallel(&network, model, SolverSettings::default(), &cancel))
            });
            let _ = tx.send(result);
        });
        pending
    }

    /// Update one node as an independent task against a valuation snapshot.
    pub fn submit_node_update(
        &self,
        network: Arc<Network>,
        index: usize,
        previous_equity: f64,
        cushion: f64,
        model: ValuationModel,
        valuation: Arc<[f64]>,
    ) -> Pending<NodeOutcome> {
        let (pending, tx) = pending();
        self.pool.spawn(move || {
            let result = if index >= network.len() {
                Err(EngineError::Dispatch(format!(
                    "node index {index} out of range for {} nodes",
                    network.len()
                )))
            } else if valuation.len() != network.len() {
                Err(EngineError::Shape {
                    field: "valuation",
                    expected: network.len(),
                    actual: valuation.len(),
                })
            } else {
                let update = NodeUpdate::from_network(&network, index, previous_equity, cushion);
                Ok(update_node(&update, &model, &valuation))
            };
            let _ = tx.send(result);
        });
        pending
    }

    /// Row-parallel fixed-point iteration. Blocks until the run ends;
    /// trajectories are identical to [`solver::ContagionSolver`].
    pub fn run_row_parallel(
        &self,
        network: &Network,
        model: ValuationModel,
        settings: SolverSettings,
        cancel: &CancelToken,
    ) -> RunOutcome {
        let n = network.len();
        tracing::debug!(nodes = n, model = %model.kind(), threads = self.threads(), "row-parallel run started");

        let pre_shock = network.par_equity();
        let cushions = network.capital_cushions(&pre_shock);
        let shocked = network.shocked_par_equity();

        let mut equity_trajectory = vec![pre_shock, shocked.clone()];
        let mut valuation_trajectory = vec![vec![1.0; n]];

        let seed_valuation = self.pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|i| {
                    model.recovery(&NodeBalance {
                        equity: shocked[i],
                        external_assets: network.external_assets()[i],
                        total_liabilities: network.total_liabilities(i),
                        cushion: cushions[i],
                    })
                })
                .collect::<Vec<f64>>()
        });
        let mut ctx = RoundContext {
            round: 0,
            max_shift: max_abs_change(&shocked, &vec![settings.equity_sentinel; n]),
            equity: shocked,
            valuation: seed_valuation,
        };

        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if ctx.max_shift <= settings.tolerance {
                break Termination::Converged;
            }
            if ctx.round >= settings.max_iterations {
                break Termination::IterationCap;
            }

            // Fan out; collect() is the barrier between rounds.
            let outcomes: Vec<NodeOutcome> = self.pool.install(|| {
                (0..n)
                    .into_par_iter()
                    .map(|i| {
                        let update = NodeUpdate::from_network(network, i, ctx.equity[i], cushions[i]);
                        advance_node(&update, &model, &ctx.valuation)
                    })
                    .collect()
            });

            let equity: Vec<f64> = outcomes.iter().map(|o| o.equity).collect();
            let valuation: Vec<f64> = outcomes.iter().map(|o| o.recovery).collect();
            let max_shift = outcomes
                .iter()
                .map(|o| if o.shift.is_nan() { f64::INFINITY } else { o.shift })
                .fold(0.0, f64::max);

            valuation_trajectory.push(std::mem::replace(&mut ctx.valuation, valuation));
            equity_trajectory.push(equity.clone());
            ctx.equity = equity;
            ctx.max_shift = max_shift;
            ctx.round += 1;
        };

        valuation_trajectory.push(ctx.valuation);

        log_termination(termination, ctx.round);
        RunOutcome {
            equity_trajectory,
            valuation_trajectory,
            iterations: ctx.round,
            termination,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
