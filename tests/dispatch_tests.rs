#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use contagion_engine::valuation::NodeBalance;
    use contagion_engine::*;
    use futures::executor::block_on;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_scenario(n: usize, seed: u64, model: &str) -> Scenario {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if i != j && rng.gen_bool(0.08) {
                    *cell = rng.gen_range(1.0..30.0);
                }
            }
        }
        Scenario {
            external_assets: (0..n).map(|_| rng.gen_range(50.0..150.0)).collect(),
            external_liabilities: (0..n).map(|_| rng.gen_range(0.0..20.0)).collect(),
            liability_matrix: matrix,
            shock: (0..n)
                .map(|_| if rng.gen_bool(0.1) { rng.gen_range(20.0..90.0) } else { 0.0 })
                .collect(),
            valuation_model: model.to_string(),
            params: ValuationParameters::default(),
        }
    }

    fn slow_cycle() -> Scenario {
        Scenario {
            external_assets: vec![100.0, 100.0],
            external_liabilities: vec![0.0, 0.0],
            liability_matrix: vec![vec![0.0, 99.9], vec![99.9, 0.0]],
            shock: vec![0.05, 0.05],
            valuation_model: "Distress".to_string(),
            params: ValuationParameters::default(),
        }
    }

    // ========== Whole-run offload ==========

    #[test]
    fn test_submit_matches_sequential() {
        let dispatch = ComputeDispatch::new(2).unwrap();
        let scenario = random_scenario(20, 1, "Merton");
        let expected = run_scenario(&scenario).unwrap();
        let got = dispatch.submit(scenario).wait().unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_submit_can_be_awaited() {
        let dispatch = ComputeDispatch::new(2).unwrap();
        let scenario = random_scenario(15, 2, "Black");
        let expected = run_scenario(&scenario).unwrap();
        let got = block_on(dispatch.submit(scenario)).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_many_concurrent_runs_stay_independent() {
        let dispatch = ComputeDispatch::new(4).unwrap();
        let scenarios: Vec<Scenario> = (0..12)
            .map(|seed| {
                let model = ModelKind::all()[seed as usize % 3].name();
                random_scenario(25, seed, model)
            })
            .collect();
        let pending: Vec<_> = scenarios.iter().cloned().map(|s| dispatch.submit(s)).collect();
        for (scenario, p) in scenarios.iter().zip(pending) {
            assert_eq!(p.wait().unwrap(), run_scenario(scenario).unwrap());
        }
    }

    #[test]
    fn test_submit_reports_configuration_error() {
        let dispatch = ComputeDispatch::new(1).unwrap();
        let mut scenario = random_scenario(5, 3, "Distress");
        scenario.valuation_model = "Vasicek".to_string();
        let err = dispatch.submit(scenario).wait().unwrap_err();
        assert_eq!(err, EngineError::Configuration("Vasicek".to_string()));
    }

    #[test]
    fn test_submit_reports_shape_error() {
        let dispatch = ComputeDispatch::new(1).unwrap();
        let mut scenario = random_scenario(5, 4, "Distress");
        scenario.shock.pop();
        let err = dispatch.submit(scenario).wait().unwrap_err();
        assert!(matches!(err, EngineError::Shape { field: "shock", expected: 5, actual: 4 }));
    }

    // ========== Cancellation ==========

    #[test]
    fn test_cancelled_before_start() {
        let dispatch = ComputeDispatch::new(1).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = dispatch.submit_cancellable(slow_cycle(), cancel).wait().unwrap();
        assert_eq!(out.termination, Termination::Cancelled);
        assert_eq!(out.iterations, 0);
        assert_eq!(out.equity_trajectory.len(), 2);
        assert_eq!(out.valuation_trajectory.len(), 2);
    }

    #[test]
    fn test_cancel_mid_run_keeps_trajectories_aligned() {
        let dispatch = ComputeDispatch::new(1).unwrap();
        let cancel = CancelToken::new();
        let pending = dispatch.submit_cancellable(slow_cycle(), cancel.clone());
        cancel.cancel();
        let out = pending.wait().unwrap();
        // the run may finish before the flag is seen
        assert_ne!(out.termination, Termination::Converged);
        assert_eq!(out.equity_trajectory.len(), out.iterations + 2);
        assert_eq!(out.valuation_trajectory.len(), out.iterations + 2);
    }

    // ========== Row-parallel rounds ==========

    #[test]
    fn test_row_parallel_matches_sequential() {
        let dispatch = ComputeDispatch::new(4).unwrap();
        for kind in ModelKind::all() {
            let scenario = random_scenario(60, 42, kind.name());
            let network = Network::from_scenario(&scenario).unwrap();
            let model = ValuationModel::select(kind, &scenario.params);

            let sequential = ContagionSolver::new(&network, model).run();
            let parallel =
                dispatch.run_row_parallel(&network, model, SolverSettings::default(), &CancelToken::new());

            assert_eq!(parallel.iterations, sequential.iterations, "{kind}");
            assert_eq!(parallel.equity_trajectory, sequential.equity_trajectory, "{kind}");
            assert_eq!(parallel.valuation_trajectory, sequential.valuation_trajectory, "{kind}");
        }
    }

    #[test]
    fn test_row_parallel_independent_of_thread_count() {
        let scenario = random_scenario(80, 9, "Distress");
        let single = ComputeDispatch::new(1).unwrap().submit_row_parallel(scenario.clone(), CancelToken::new());
        let many = ComputeDispatch::new(8).unwrap().submit_row_parallel(scenario, CancelToken::new());
        assert_eq!(single.wait().unwrap(), many.wait().unwrap());
    }

    #[test]
    fn test_row_parallel_hits_iteration_cap() {
        let dispatch = ComputeDispatch::new(2).unwrap();
        let out = dispatch.submit_row_parallel(slow_cycle(), CancelToken::new()).wait().unwrap();
        assert!(out.hit_iteration_cap());
        assert_eq!(out.iterations, 5000);
        assert_eq!(out, run_scenario(&slow_cycle()).unwrap());
    }

    #[test]
    fn test_row_parallel_cancelled_before_start() {
        let dispatch = ComputeDispatch::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = dispatch.submit_row_parallel(random_scenario(50, 5, "Merton"), cancel).wait().unwrap();
        assert_eq!(out.termination, Termination::Cancelled);
        assert_eq!(out.equity_trajectory.len(), 2);
        assert_eq!(out.valuation_trajectory.len(), 2);
    }

    // ========== Node tasks ==========

    #[test]
    fn test_submit_node_update_follows_contract() {
        let dispatch = ComputeDispatch::new(3).unwrap();
        for kind in ModelKind::all() {
            let scenario = random_scenario(30, 11, kind.name());
            let network = Arc::new(Network::from_scenario(&scenario).unwrap());
            let model = ValuationModel::select(kind, &scenario.params);
            let cushions = capital_cushions(&network);
            let equity = network.shocked_par_equity();
            // snapshot one round ahead so previous equity and snapshot disagree
            let snapshot = model.revalue(&network, &cushions, &equity);
            let next: Vec<f64> = (0..network.len()).map(|i| network.revalued_equity(i, &snapshot)).collect();
            let valuation: Arc<[f64]> = Arc::from(model.revalue(&network, &cushions, &next));

            let pending: Vec<_> = (0..network.len())
                .map(|i| {
                    dispatch.submit_node_update(network.clone(), i, equity[i], cushions[i], model, valuation.clone())
                })
                .collect();

            for (i, p) in pending.into_iter().enumerate() {
                let got = p.wait().unwrap();
                let expected_recovery = model.recovery(&NodeBalance {
                    equity: equity[i],
                    external_assets: network.external_assets()[i],
                    total_liabilities: network.total_liabilities(i),
                    cushion: cushions[i],
                });
                let expected_equity = network.revalued_equity(i, &valuation);
                assert_eq!(got.index, i);
                assert_eq!(got.recovery, expected_recovery, "{kind} node {i}");
                assert_eq!(got.equity, expected_equity, "{kind} node {i}");
                assert_eq!(got.shift, (expected_equity - equity[i]).abs());
            }
        }
    }

    #[test]
    fn test_submit_node_update_on_chain_uses_passed_equity() {
        let dispatch = ComputeDispatch::new(1).unwrap();
        let network = Arc::new(
            Network::new(
                vec![20.0, 10.0, 10.0],
                vec![0.0, 0.0, 0.0],
                vec![vec![0.0, 10.0, 0.0], vec![0.0, 0.0, 10.0], vec![0.0, 0.0, 0.0]],
                vec![5.0, 0.0, 0.0],
            )
            .unwrap(),
        );
        let model = ValuationModel::select(ModelKind::Distress, &ValuationParameters::default());
        let valuation: Arc<[f64]> = Arc::from(vec![0.5, 1.0, 1.0]);
        let got = dispatch.submit_node_update(network, 1, 10.0, 1.0, model, valuation).wait().unwrap();
        assert_eq!(got.equity, 5.0);
        assert_eq!(got.recovery, 1.0);
    }

    #[test]
    fn test_pool_size() {
        assert_eq!(ComputeDispatch::new(3).unwrap().threads(), 3);
        assert!(ComputeDispatch::new(0).unwrap().threads() >= 1);
    }
}
