// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Interbank Loss Contagion

pub mod error;
pub mod types;
pub mod special;
pub mod valuation;
pub mod network;
pub mod solver;

// Browser hosts offload runs to their own Web Worker.
#[cfg(not(target_arch = "wasm32"))]
pub mod dispatch;

pub use error::EngineError;
pub use types::*;
pub use network::{capital_cushions, get_equities, Network};
pub use solver::{run, run_scenario, CancelToken, ContagionSolver};
pub use valuation::ValuationModel;
#[cfg(not(target_arch = "wasm32"))]
pub use dispatch::{ComputeDispatch, NodeOutcome, NodeUpdate, Pending};

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Run one scenario (`{ externalAssets, externalLiabilities, liabilityMatrix,
/// shock, valuationModel, recoveryRate, alpha, beta, volatility, maturity }`)
/// and return `{ equityTrajectory, valuationTrajectory, iterations,
/// termination }`.
#[wasm_bindgen(js_name = runModel)]
pub fn run_model(scenario: JsValue) -> Result<JsValue, JsValue> {
    install_panic_hook();
    let scenario: Scenario = serde_wasm_bindgen::from_value(scenario).map_err(to_js_error)?;
    let outcome = run_scenario(&scenario).map_err(to_js_error)?;
    if outcome.hit_iteration_cap() {
        log("Maximum iterations reached without convergence.");
    }
    serde_wasm_bindgen::to_value(&outcome).map_err(to_js_error)
}

/// Pre-shock par-value equity per node.
#[wasm_bindgen(js_name = getEquities)]
pub fn get_equities_js(
    ext_assets: Vec<f64>,
    ext_liabilities: Vec<f64>,
    liability_matrix: JsValue,
) -> Result<Vec<f64>, JsValue> {
    install_panic_hook();
    let matrix: Vec<Vec<f64>> = serde_wasm_bindgen::from_value(liability_matrix).map_err(to_js_error)?;
    get_equities(&ext_assets, &ext_liabilities, &matrix).map_err(to_js_error)
}
