// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Type Definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ─── Valuation Model Kind ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Beta-distributed capital-cushion model
    Distress = 0,
    /// Structural lognormal-asset model
    Merton = 1,
    /// First-passage variant of Merton
    BlackCox = 2,
}

impl Default for ModelKind {
    fn default() -> Self { ModelKind::Distress }
}

impl ModelKind {
    pub fn all() -> Vec<Self> {
        vec![Self::Distress, Self::Merton, Self::BlackCox]
    }

    /// Name as the UI sends it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Distress => "Distress",
            Self::Merton => "Merton",
            Self::BlackCox => "Black",
        }
    }
}

impl FromStr for ModelKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Distress" => Ok(Self::Distress),
            "Merton" => Ok(Self::Merton),
            "Black" | "BlackCox" => Ok(Self::BlackCox),
            other => Err(EngineError::Configuration(other.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Valuation Parameters ───────────────────────────────────────────────────

/// Model parameters for one run. Fields a model does not use are ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValuationParameters {
    /// R in [0, 1]: loss given default as a fraction of the claim
    pub recovery_rate: f64,
    /// Beta shape a (Distress)
    pub alpha: f64,
    /// Beta shape b (Distress)
    pub beta: f64,
    /// Asset volatility (Merton, Black-Cox)
    pub volatility: f64,
    /// Horizon in years (Merton, Black-Cox)
    pub maturity: f64,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        Self {
            recovery_rate: 1.0,
            alpha: 1.0,
            beta: 1.0,
            volatility: 0.5,
            maturity: 5.0,
        }
    }
}

// ─── Solver Settings ────────────────────────────────────────────────────────

pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
pub const DEFAULT_EQUITY_SENTINEL: f64 = 1e9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverSettings {
    /// Max absolute equity change between rounds at the fixed point
    pub tolerance: f64,
    /// Logical bound on revaluation rounds
    pub max_iterations: usize,
    /// Seed for the "previous" equity so the first comparison always fails
    pub equity_sentinel: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            equity_sentinel: DEFAULT_EQUITY_SENTINEL,
        }
    }
}

// ─── Scenario (wire shape) ──────────────────────────────────────────────────

fn default_model_name() -> String {
    ModelKind::Distress.name().to_string()
}

/// One shock scenario as the UI collaborator hands it over.
///
/// `valuation_model` stays a string until a run starts so an unknown name is
/// reported as [`EngineError::Configuration`] rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub external_assets: Vec<f64>,
    pub external_liabilities: Vec<f64>,
    /// `liability_matrix[i][j]`: nominal amount node i owes node j
    pub liability_matrix: Vec<Vec<f64>>,
    pub shock: Vec<f64>,
    #[serde(default = "default_model_name")]
    pub valuation_model: String,
    #[serde(flatten)]
    pub params: ValuationParameters,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn model_kind(&self) -> Result<ModelKind, EngineError> {
        self.valuation_model.parse()
    }

    pub fn node_count(&self) -> usize {
        self.external_assets.len()
    }
}

// ─── Run Outcome ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    /// Max equity change fell to the tolerance
    Converged,
    /// Iteration cap reached; trajectories are best-effort
    IterationCap,
    /// Caller cancelled between rounds; trajectories hold completed rounds
    Cancelled,
}

/// Equity and claim-valuation trajectories of one run.
///
/// Both trajectories have `iterations + 2` entries. `valuation_trajectory[0]`
/// is all ones (par, pre-shock); for `t >= 1`, `valuation_trajectory[t]` is
/// the recovery vector the model assigns to `equity_trajectory[t]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub equity_trajectory: Vec<Vec<f64>>,
    pub valuation_trajectory: Vec<Vec<f64>>,
    pub iterations: usize,
    pub termination: Termination,
}

impl RunOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// NonConvergence flag: cap reached without meeting the tolerance.
    pub fn hit_iteration_cap(&self) -> bool {
        self.termination == Termination::IterationCap
    }

    pub fn final_equity(&self) -> &[f64] {
        self.equity_trajectory.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn final_valuation(&self) -> &[f64] {
        self.valuation_trajectory.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes whose final equity is negative.
    pub fn defaulted_nodes(&self) -> Vec<usize> {
        self.final_equity()
            .iter()
            .enumerate()
            .filter(|(_, &e)| e < 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Equity of one node across all recorded rounds.
    pub fn equity_path(&self, node: usize) -> Vec<f64> {
        self.equity_trajectory
            .iter()
            .filter_map(|step| step.get(node).copied())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}
