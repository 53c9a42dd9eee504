// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Liability Network

//! Validated, immutable view of an interbank liability network.
//!
//! `L[i][j]` is what node i owes node j. Row sums are a node's interbank
//! liabilities, column sums its interbank claims. The transposed matrix is
//! kept alongside so a node's claims are a contiguous slice for both the
//! sequential solver and row-parallel tasks.

use crate::error::EngineError;
use crate::types::Scenario;

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    external_assets: Vec<f64>,
    external_liabilities: Vec<f64>,
    liabilities: Vec<Vec<f64>>,
    /// `claims[i][j] == liabilities[j][i]`
    claims: Vec<Vec<f64>>,
    shock: Vec<f64>,
    interbank_liabilities: Vec<f64>,
}

impl Network {
    pub fn new(
        external_assets: Vec<f64>,
        external_liabilities: Vec<f64>,
        liabilities: Vec<Vec<f64>>,
        shock: Vec<f64>,
    ) -> Result<Self, EngineError> {
        let n = external_assets.len();
        check_len("externalLiabilities", n, external_liabilities.len())?;
        check_len("shock", n, shock.len())?;
        validate_matrix(&liabilities, n)?;

        let claims = (0..n)
            .map(|i| liabilities.iter().map(|row| row[i]).collect())
            .collect();
        let interbank_liabilities = (0..n).map(|i| row_sum(&liabilities, i)).collect();

        Ok(Self {
            external_assets,
            external_liabilities,
            liabilities,
            claims,
            shock,
            interbank_liabilities,
        })
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Self, EngineError> {
        Self::new(
            scenario.external_assets.clone(),
            scenario.external_liabilities.clone(),
            scenario.liability_matrix.clone(),
            scenario.shock.clone(),
        )
    }

    pub fn len(&self) -> usize {
        self.external_assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external_assets.is_empty()
    }

    pub fn external_assets(&self) -> &[f64] {
        &self.external_assets
    }

    pub fn external_liabilities(&self) -> &[f64] {
        &self.external_liabilities
    }

    pub fn shock(&self) -> &[f64] {
        &self.shock
    }

    pub fn liabilities(&self) -> &[Vec<f64>] {
        &self.liabilities
    }

    /// Row i of L: what node i owes each counterparty.
    pub fn liability_row(&self, i: usize) -> &[f64] {
        &self.liabilities[i]
    }

    /// Column i of L: what each counterparty owes node i.
    pub fn claim_column(&self, i: usize) -> &[f64] {
        &self.claims[i]
    }

    /// Interbank liabilities of node i (row sum of L).
    pub fn interbank_liabilities(&self, i: usize) -> f64 {
        self.interbank_liabilities[i]
    }

    /// Interbank plus external liabilities of node i.
    pub fn total_liabilities(&self, i: usize) -> f64 {
        self.interbank_liabilities[i] + self.external_liabilities[i]
    }

    /// Equity with every claim valued at par, before the shock.
    pub fn par_equity(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.external_assets[i] + col_sum(&self.liabilities, i)
                    - self.interbank_liabilities[i]
                    - self.external_liabilities[i]
            })
            .collect()
    }

    /// Equity right after the shock, claims still at par.
    pub fn shocked_par_equity(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.external_assets[i] - self.shock[i] + col_sum(&self.liabilities, i)
                    - self.interbank_liabilities[i]
                    - self.external_liabilities[i]
            })
            .collect()
    }

    /// Capital cushion `k_i = E0_i / (rowSum(L, i) + EL_i)`.
    ///
    /// Nodes without liabilities get a non-finite cushion; the Distress model
    /// handles that like any other degenerate ratio.
    pub fn capital_cushions(&self, pre_shock_equity: &[f64]) -> Vec<f64> {
        pre_shock_equity
            .iter()
            .enumerate()
            .map(|(i, e0)| e0 / self.total_liabilities(i))
            .collect()
    }

    /// Post-shock equity of node i with claims valued at `valuation`.
    pub fn revalued_equity(&self, i: usize, valuation: &[f64]) -> f64 {
        node_equity(
            self.external_assets[i],
            self.shock[i],
            self.claim_column(i),
            valuation,
            self.interbank_liabilities[i],
            self.external_liabilities[i],
        )
    }
}

/// Post-shock equity of one node: external assets less shock, plus inbound
/// claims at the counterparties' recovery fractions, less interbank and
/// external liabilities at par.
pub fn node_equity(
    external_assets: f64,
    shock: f64,
    claims: &[f64],
    valuation: &[f64],
    interbank_liabilities: f64,
    external_liabilities: f64,
) -> f64 {
    let recovered: f64 = claims.iter().zip(valuation).map(|(l, v)| l * v).sum();
    external_assets - shock + recovered - interbank_liabilities - external_liabilities
}

// ---------------------------------------------------------------------------
// Derived queries
// ---------------------------------------------------------------------------

/// Pre-shock par-value equity straight from the UI's arrays.
pub fn get_equities(
    external_assets: &[f64],
    external_liabilities: &[f64],
    liability_matrix: &[Vec<f64>],
) -> Result<Vec<f64>, EngineError> {
    let n = external_assets.len();
    check_len("externalLiabilities", n, external_liabilities.len())?;
    validate_matrix(liability_matrix, n)?;
    Ok((0..n)
        .map(|i| {
            external_assets[i] + col_sum(liability_matrix, i)
                - row_sum(liability_matrix, i)
                - external_liabilities[i]
        })
        .collect())
}

/// Capital cushions of the pre-shock network.
pub fn capital_cushions(network: &Network) -> Vec<f64> {
    network.capital_cushions(&network.par_equity())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn row_sum(matrix: &[Vec<f64>], i: usize) -> f64 {
    matrix[i].iter().sum()
}

pub(crate) fn col_sum(matrix: &[Vec<f64>], j: usize) -> f64 {
    matrix.iter().map(|row| row[j]).sum()
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), EngineError> {
    if expected != actual {
        return Err(EngineError::Shape { field, expected, actual });
    }
    Ok(())
}

fn validate_matrix(matrix: &[Vec<f64>], n: usize) -> Result<(), EngineError> {
    check_len("liabilityMatrix", n, matrix.len())?;
    for (i, row) in matrix.iter().enumerate() {
        check_len("liabilityMatrix row", n, row.len())?;
        for (j, &value) in row.iter().enumerate() {
            if !(value >= 0.0) {
                return Err(EngineError::InvalidNetwork {
                    row: i,
                    col: j,
                    value,
                    reason: "liabilities must be non-negative",
                });
            }
            if i == j && value != 0.0 {
                return Err(EngineError::InvalidNetwork {
                    row: i,
                    col: j,
                    value,
                    reason: "a node cannot owe itself",
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Network {
        Network::new(
            vec![20.0, 10.0, 10.0],
            vec![0.0, 0.0, 0.0],
            vec![
                vec![0.0, 10.0, 0.0],
                vec![0.0, 0.0, 10.0],
                vec![0.0, 0.0, 0.0],
            ],
            vec![5.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_par_equity() {
        assert_eq!(chain().par_equity(), vec![10.0, 10.0, 20.0]);
    }

    #[test]
    fn test_shocked_par_equity() {
        assert_eq!(chain().shocked_par_equity(), vec![5.0, 10.0, 20.0]);
    }

    #[test]
    fn test_claim_column_is_transpose() {
        let net = chain();
        assert_eq!(net.claim_column(1), &[10.0, 0.0, 0.0]);
        assert_eq!(net.liability_row(1), &[0.0, 0.0, 10.0]);
        assert_eq!(net.interbank_liabilities(0), 10.0);
    }

    #[test]
    fn test_capital_cushions() {
        let k = capital_cushions(&chain());
        assert_eq!(k[0], 1.0);
        assert_eq!(k[1], 1.0);
        // no liabilities at all
        assert!(k[2].is_infinite());
    }

    #[test]
    fn test_revalued_equity_haircuts_claims() {
        let net = chain();
        // node 1's claim on node 0 recovers half
        let e1 = net.revalued_equity(1, &[0.5, 1.0, 1.0]);
        assert_eq!(e1, 10.0 + 5.0 - 10.0);
        // node 0 holds no claims
        assert_eq!(net.revalued_equity(0, &[0.0, 0.0, 0.0]), 5.0);
    }

    #[test]
    fn test_get_equities_matches_network() {
        let net = chain();
        let eq = get_equities(net.external_assets(), net.external_liabilities(), net.liabilities()).unwrap();
        assert_eq!(eq, net.par_equity());
    }

    #[test]
    fn test_rejects_ragged_matrix() {
        let err = Network::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![vec![0.0, 1.0], vec![0.0]], vec![0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, EngineError::Shape { field: "liabilityMatrix row", expected: 2, actual: 1 }));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Network::new(vec![1.0, 1.0], vec![0.0], vec![vec![0.0; 2]; 2], vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, EngineError::Shape { field: "externalLiabilities", .. }));
    }

    #[test]
    fn test_rejects_self_liability() {
        let err = Network::new(vec![1.0], vec![0.0], vec![vec![3.0]], vec![0.0]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidNetwork { row: 0, col: 0, .. }));
    }

    #[test]
    fn test_rejects_negative_and_nan_liability() {
        let neg = Network::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![vec![0.0, -1.0], vec![0.0, 0.0]], vec![0.0, 0.0]);
        assert!(matches!(neg, Err(EngineError::InvalidNetwork { row: 0, col: 1, .. })));
        let nan = Network::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![vec![0.0, f64::NAN], vec![0.0, 0.0]], vec![0.0, 0.0]);
        assert!(nan.is_err());
    }

    mod prop {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn get_equities_is_linear_in_external_terms(
                a1 in proptest::collection::vec(0.0f64..1e4, 3),
                a2 in proptest::collection::vec(0.0f64..1e4, 3),
                l1 in proptest::collection::vec(0.0f64..1e4, 3),
                l2 in proptest::collection::vec(0.0f64..1e4, 3),
                c in 0.0f64..10.0,
            ) {
                let m = vec![
                    vec![0.0, 4.0, 1.0],
                    vec![2.0, 0.0, 7.5],
                    vec![0.5, 3.0, 0.0],
                ];
                let zero = vec![0.0; 3];
                let base = get_equities(&zero, &zero, &m).unwrap();
                let e1 = get_equities(&a1, &l1, &m).unwrap();
                let e2 = get_equities(&a2, &l2, &m).unwrap();
                let a: Vec<f64> = a1.iter().zip(&a2).map(|(x, y)| x + c * y).collect();
                let l: Vec<f64> = l1.iter().zip(&l2).map(|(x, y)| x + c * y).collect();
                let combined = get_equities(&a, &l, &m).unwrap();
                for i in 0..3 {
                    // E(a1 + c*a2) - E(0) = (E(a1) - E(0)) + c*(E(a2) - E(0))
                    let expected = (e1[i] - base[i]) + c * (e2[i] - base[i]);
                    prop_assert!((combined[i] - base[i] - expected).abs() < 1e-6);
                }
            }
        }
    }
}
