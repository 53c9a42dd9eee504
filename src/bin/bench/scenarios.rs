// Bench Network Presets
// Fixed presets plus seeded random networks in the shape of the UI's generator

use contagion_engine::{Scenario, ValuationParameters};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ─── Preset Configuration ───────────────────────────────────────────────────

pub enum Topology {
    /// Fixed balance sheets; every run is identical
    Fixed(fn() -> Network),
    /// Seeded random network with `nodes` banks
    Random { nodes: usize, density: f64 },
}

pub struct Preset {
    pub name: &'static str,
    pub label: &'static str,
    pub topology: Topology,
}

/// Balance sheets without a model choice.
pub struct Network {
    pub external_assets: Vec<f64>,
    pub external_liabilities: Vec<f64>,
    pub liability_matrix: Vec<Vec<f64>>,
    pub shock: Vec<f64>,
}

impl Network {
    pub fn into_scenario(self, model: &str) -> Scenario {
        Scenario {
            external_assets: self.external_assets,
            external_liabilities: self.external_liabilities,
            liability_matrix: self.liability_matrix,
            shock: self.shock,
            valuation_model: model.to_string(),
            params: ValuationParameters::default(),
        }
    }
}

impl Preset {
    pub fn is_random(&self) -> bool {
        matches!(self.topology, Topology::Random { .. })
    }

    pub fn build(&self, seed: u64) -> Network {
        match self.topology {
            Topology::Fixed(f) => f(),
            Topology::Random { nodes, density } => random_network(nodes, density, seed),
        }
    }
}

// ─── Fixed Networks ─────────────────────────────────────────────────────────

fn chain() -> Network {
    Network {
        external_assets: vec![20.0, 10.0, 10.0],
        external_liabilities: vec![0.0; 3],
        liability_matrix: vec![
            vec![0.0, 10.0, 0.0],
            vec![0.0, 0.0, 10.0],
            vec![0.0, 0.0, 0.0],
        ],
        shock: vec![5.0, 0.0, 0.0],
    }
}

fn ring() -> Network {
    Network {
        external_assets: vec![100.0; 6],
        external_liabilities: vec![0.0; 6],
        liability_matrix: vec![
            vec![0.0, 50.0, 70.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 50.0, 70.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 50.0, 70.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 50.0, 70.0],
            vec![70.0, 0.0, 0.0, 0.0, 0.0, 50.0],
            vec![50.0, 70.0, 0.0, 0.0, 0.0, 0.0],
        ],
        shock: vec![0.0, 0.0, 0.0, 0.0, 0.0, 100.0],
    }
}

fn emergent_disaster() -> Network {
    let mut shock = vec![0.0; 10];
    shock[9] = 90.0;
    Network {
        external_assets: vec![100.0; 10],
        external_liabilities: vec![0.0; 10],
        liability_matrix: vec![
            vec![0.0, 51.01, 0.0, 0.0, 0.0, 20.0, 50.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 50.002, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 50.0, 0.0, 50.003, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 50.004, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 50.005, 0.0, 50.01, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.006, 49.95, 49.97, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.007, 50.013, 50.014],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.008, 50.015],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.009],
            vec![50.016, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ],
        shock,
    }
}

// ─── Random Networks ────────────────────────────────────────────────────────

/// External assets uniform in [0, 100), each off-diagonal liability present
/// with probability `density` and sized uniform in [0, 10). Roughly three
/// nodes take a heavy shock of 200; the rest take 2.
pub fn random_network(nodes: usize, density: f64, seed: u64) -> Network {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let heavy = (3.0 / nodes as f64).min(1.0);

    let mut net = Network {
        external_assets: Vec::with_capacity(nodes),
        external_liabilities: vec![0.0; nodes],
        liability_matrix: Vec::with_capacity(nodes),
        shock: Vec::with_capacity(nodes),
    };
    for i in 0..nodes {
        net.external_assets.push(rng.gen::<f64>() * 100.0);
        net.shock.push(if rng.gen_bool(heavy) { 200.0 } else { 2.0 });
        let row = (0..nodes)
            .map(|j| {
                if i != j && rng.gen_bool(density) {
                    rng.gen::<f64>() * 10.0
                } else {
                    0.0
                }
            })
            .collect();
        net.liability_matrix.push(row);
    }
    net
}

// ─── Registry ───────────────────────────────────────────────────────────────

pub fn presets() -> Vec<Preset> {
    vec![
        Preset { name: "CHAIN_3", label: "Three-node chain", topology: Topology::Fixed(chain) },
        Preset { name: "RING_6", label: "Six-node ring, one failure", topology: Topology::Fixed(ring) },
        Preset {
            name: "EMERGENT_DISASTER_10",
            label: "Ten-node emergent disaster",
            topology: Topology::Fixed(emergent_disaster),
        },
        Preset {
            name: "RANDOM_8",
            label: "Random 8 nodes, 10% links",
            topology: Topology::Random { nodes: 8, density: 0.1 },
        },
        Preset {
            name: "RANDOM_64",
            label: "Random 64 nodes, 10% links",
            topology: Topology::Random { nodes: 64, density: 0.1 },
        },
        Preset {
            name: "RANDOM_256",
            label: "Random 256 nodes, 3% links",
            topology: Topology::Random { nodes: 256, density: 0.03 },
        },
    ]
}
