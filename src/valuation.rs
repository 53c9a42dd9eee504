// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Claim Valuation Models

//! Claim-recovery models: map a node's distress (equity relative to its
//! liabilities or assets) to the fraction of a claim on it that is
//! recoverable.
//!
//! Each model has a per-node kernel used by row-parallel tasks and a
//! vectorized form over the whole network. Non-finite intermediate ratios
//! and results are sanitized to 0.

use crate::network::Network;
use crate::special::{beta_cdf, normal_cdf};
use crate::types::{ModelKind, ValuationParameters};

// ---------------------------------------------------------------------------
// Per-node kernels
// ---------------------------------------------------------------------------

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Distress model for one node.
///
/// `frac = 1 + equity / total_liabilities`. With no capital cushion the claim
/// is either whole (`frac >= 1`) or worthless. Otherwise it is whole above
/// `1 + k`, worthless below 1, and in between loses `R` times a beta CDF of
/// the consumed share of the cushion.
pub fn distress_recovery(
    equity: f64,
    total_liabilities: f64,
    cushion: f64,
    recovery_rate: f64,
    alpha: f64,
    beta: f64,
) -> f64 {
    let frac = finite_or_zero(1.0 + equity / total_liabilities);
    if cushion == 0.0 {
        return if frac >= 1.0 { 1.0 } else { 0.0 };
    }
    let healthy = if frac >= 1.0 + cushion { 1.0 } else { 0.0 };
    let stressed = if frac >= 1.0 && frac < 1.0 + cushion {
        1.0 - recovery_rate * beta_cdf((1.0 + cushion - frac) / cushion, alpha, beta)
    } else {
        0.0
    };
    finite_or_zero(healthy + stressed)
}

fn merton_distance(leverage: f64, volatility: f64, maturity: f64) -> f64 {
    ((1.0 / (1.0 - leverage)).ln() - volatility * volatility * maturity / 2.0)
        / (volatility * maturity.sqrt())
}

/// Merton model for one node: leverage `equity / external_assets`; at or
/// above 1 the claim is whole, else `1 - R * (1 - N(d))`.
pub fn merton_recovery(
    equity: f64,
    external_assets: f64,
    recovery_rate: f64,
    volatility: f64,
    maturity: f64,
) -> f64 {
    let leverage = equity / external_assets;
    if leverage >= 1.0 {
        return 1.0;
    }
    let d = merton_distance(leverage, volatility, maturity);
    finite_or_zero(1.0 - recovery_rate * (1.0 - normal_cdf(d)))
}

/// Black-Cox first-passage model for one node.
///
/// Leverage at or above 1 recovers `1 - R`, negative leverage recovers
/// nothing, and in between the Merton term is corrected by the probability of
/// touching the barrier before maturity.
pub fn black_cox_recovery(
    equity: f64,
    external_assets: f64,
    recovery_rate: f64,
    volatility: f64,
    maturity: f64,
) -> f64 {
    let leverage = equity / external_assets;
    if leverage >= 1.0 {
        return finite_or_zero(1.0 - recovery_rate);
    }
    if !(leverage >= 0.0) {
        return 0.0;
    }
    let log_inv = (1.0 / (1.0 - leverage)).ln();
    let var_t = volatility * volatility * maturity;
    let sd_t = volatility * maturity.sqrt();
    let survive = normal_cdf((log_inv - var_t / 2.0) / sd_t);
    let barrier = (1.0 / (1.0 - leverage)) * normal_cdf((-log_inv - var_t) / sd_t);
    finite_or_zero(1.0 - recovery_rate * (1.0 - survive + barrier))
}

// ---------------------------------------------------------------------------
// Vectorized models
// ---------------------------------------------------------------------------

/// Distress model over the whole network. `liabilities` is L, `cushions` the
/// frozen `k` vector.
pub fn distress(
    liabilities: &[Vec<f64>],
    external_liabilities: &[f64],
    equity: &[f64],
    cushions: &[f64],
    recovery_rate: f64,
    alpha: f64,
    beta: f64,
) -> Vec<f64> {
    equity
        .iter()
        .enumerate()
        .map(|(i, &e)| {
            let total = liabilities[i].iter().sum::<f64>() + external_liabilities[i];
            distress_recovery(e, total, cushions[i], recovery_rate, alpha, beta)
        })
        .collect()
}

pub fn merton(
    external_assets: &[f64],
    equity: &[f64],
    recovery_rate: f64,
    volatility: f64,
    maturity: f64,
) -> Vec<f64> {
    equity
        .iter()
        .zip(external_assets)
        .map(|(&e, &a)| merton_recovery(e, a, recovery_rate, volatility, maturity))
        .collect()
}

pub fn black_cox(
    external_assets: &[f64],
    equity: &[f64],
    recovery_rate: f64,
    volatility: f64,
    maturity: f64,
) -> Vec<f64> {
    equity
        .iter()
        .zip(external_assets)
        .map(|(&e, &a)| black_cox_recovery(e, a, recovery_rate, volatility, maturity))
        .collect()
}

// ---------------------------------------------------------------------------
// ValuationModel - selected once per run
// ---------------------------------------------------------------------------

/// Balance-sheet inputs a model needs for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBalance {
    pub equity: f64,
    pub external_assets: f64,
    pub total_liabilities: f64,
    pub cushion: f64,
}

/// A valuation model with only the parameters it uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValuationModel {
    Distress { recovery_rate: f64, alpha: f64, beta: f64 },
    Merton { recovery_rate: f64, volatility: f64, maturity: f64 },
    BlackCox { recovery_rate: f64, volatility: f64, maturity: f64 },
}

impl ValuationModel {
    pub fn select(kind: ModelKind, params: &ValuationParameters) -> Self {
        match kind {
            ModelKind::Distress => Self::Distress {
                recovery_rate: params.recovery_rate,
                alpha: params.alpha,
                beta: params.beta,
            },
            ModelKind::Merton => Self::Merton {
                recovery_rate: params.recovery_rate,
                volatility: params.volatility,
                maturity: params.maturity,
            },
            ModelKind::BlackCox => Self::BlackCox {
                recovery_rate: params.recovery_rate,
                volatility: params.volatility,
                maturity: params.maturity,
            },
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Distress { .. } => ModelKind::Distress,
            Self::Merton { .. } => ModelKind::Merton,
            Self::BlackCox { .. } => ModelKind::BlackCox,
        }
    }

    pub fn recovery_rate(&self) -> f64 {
        match *self {
            Self::Distress { recovery_rate, .. }
            | Self::Merton { recovery_rate, .. }
            | Self::BlackCox { recovery_rate, .. } => recovery_rate,
        }
    }

    /// Recovery fraction of claims on one node.
    pub fn recovery(&self, node: &NodeBalance) -> f64 {
        match *self {
            Self::Distress { recovery_rate, alpha, beta } => distress_recovery(
                node.equity,
                node.total_liabilities,
                node.cushion,
                recovery_rate,
                alpha,
                beta,
            ),
            Self::Merton { recovery_rate, volatility, maturity } => merton_recovery(
                node.equity,
                node.external_assets,
                recovery_rate,
                volatility,
                maturity,
            ),
            Self::BlackCox { recovery_rate, volatility, maturity } => black_cox_recovery(
                node.equity,
                node.external_assets,
                recovery_rate,
                volatility,
                maturity,
            ),
        }
    }

    /// Recovery vector for the whole network at `equity`.
    pub fn revalue(&self, network: &Network, cushions: &[f64], equity: &[f64]) -> Vec<f64> {
        equity
            .iter()
            .enumerate()
            .map(|(i, &e)| {
                self.recovery(&NodeBalance {
                    equity: e,
                    external_assets: network.external_assets()[i],
                    total_liabilities: network.total_liabilities(i),
                    cushion: cushions[i],
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
