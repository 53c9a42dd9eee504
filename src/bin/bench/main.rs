// Contagion Bench Runner v0.2.0
// Sequential vs row-parallel solver agreement and timing, seedable PRNG
//
// Usage:
//   cargo run --release --bin bench                          # All presets, all models
//   cargo run --release --bin bench -- --runs 5              # 5 seeds per random preset
//   cargo run --release --bin bench -- RANDOM                # Filter by preset name
//   cargo run --release --bin bench -- --model Merton        # One valuation model
//   cargo run --release --bin bench -- --threads 4 --seed 42 # Pool size, base seed
//   cargo run --release --bin bench -- --json                # Write JSON report
//   cargo run --release --bin bench -- --scenario net.json   # Run one scenario file

mod monte_carlo;
mod report;
mod scenarios;

use contagion_engine::{ComputeDispatch, EngineError, ModelKind, Scenario};
use report::*;
use scenarios::*;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    threads: usize,
    json: bool,
    model: Option<String>,
    scenario: Option<String>,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 10,
        seed: 0,
        threads: 0,
        json: false,
        model: None,
        scenario: None,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(10);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--threads" => {
                i += 1;
                if i < args.len() {
                    cli.threads = args[i].parse().unwrap_or(0);
                }
            }
            "--model" => {
                i += 1;
                cli.model = args.get(i).cloned();
            }
            "--scenario" => {
                i += 1;
                cli.scenario = args.get(i).cloned();
            }
            "--json" => {
                cli.json = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Scenario File ──────────────────────────────────────────────────────────

fn run_scenario_file(path: &str, dispatch: &ComputeDispatch) -> Result<BenchResult, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
    let run = || -> Result<BenchResult, EngineError> {
        let scenario = Scenario::from_json(&json)?;
        monte_carlo::run_single(&scenario, path, 0, dispatch)
    };
    run().map_err(|e| format!("{path}: {e}"))
}

fn print_row(label: &str, model: &str, pass_pct: f64, iterations: f64, defaulted: f64, seq_ms: f64, par_ms: f64, disagreement: f64) {
    let status = if pass_pct >= 100.0 { "PASS" } else { "FAIL" };
    println!("  {:<32} {:<9} {:>4}% {:>7.0} {:>7.1} {:>9.2}ms {:>9.2}ms {:>9.1e}  {}",
        label,
        model,
        pass_pct as u32,
        iterations,
        defaulted,
        seq_ms,
        par_ms,
        disagreement,
        status,
    );
}

fn print_header() {
    println!("  {:<32} {:<9} {:>5} {:>7} {:>7} {:>11} {:>11} {:>9}",
        "Preset", "Model", "Pass%", "Iters", "Dflt", "Seq", "RowPar", "MaxDiff");
    println!("  {}", "-".repeat(104));
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let cli = parse_args();

    let dispatch = match ComputeDispatch::new(cli.threads) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to start worker pool: {e}");
            std::process::exit(1);
        }
    };

    println!("\n  Contagion Bench Runner v0.2.0");
    println!("  PRNG: ChaCha8Rng | Runs/random preset: {} | Base seed: {} | Threads: {}",
        cli.runs, cli.seed, dispatch.threads());

    if let Some(path) = &cli.scenario {
        println!();
        print_header();
        match run_scenario_file(path, &dispatch) {
            Ok(r) => {
                print_row(path, &r.model, if r.pass { 100.0 } else { 0.0 }, r.iterations as f64,
                    r.defaulted as f64, r.sequential_ms, r.row_parallel_ms, r.max_disagreement);
                if cli.json {
                    match serde_json::to_string_pretty(&r) {
                        Ok(json) => println!("\n{json}"),
                        Err(e) => eprintln!("Failed to serialize result: {e}"),
                    }
                }
                if !r.pass {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("  {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let models: Vec<ModelKind> = match &cli.model {
        Some(name) => match name.parse() {
            Ok(kind) => vec![kind],
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => ModelKind::all(),
    };

    let all_presets = presets();
    let to_run: Vec<&Preset> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_presets.iter()
                .filter(|p| p.name.to_lowercase().contains(&f_lower)
                          || p.label.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_presets.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No presets match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    println!("  Running {} preset(s) x {} model(s)...\n", to_run.len(), models.len());
    print_header();

    let suite_start = Instant::now();
    let mut reports = Vec::new();

    for preset in &to_run {
        for &model in &models {
            let report = match monte_carlo::run_monte_carlo(preset, model, cli.runs, cli.seed, &dispatch) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("  {} / {}: {e}", preset.name, model.name());
                    std::process::exit(1);
                }
            };
            print_row(
                &report.label,
                &report.model,
                report.pass_rate * 100.0,
                report.iterations.mean,
                report.defaulted.mean,
                report.sequential_ms.mean,
                report.row_parallel_ms.mean,
                report.max_disagreement,
            );
            reports.push(report);
        }
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = reports.len();
    let passed = reports.iter().filter(|r| r.pass_rate >= 1.0).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(104));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    if cli.json {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let timestamp = format!("{}", ts);

        let report = BenchReport {
            timestamp: timestamp.clone(),
            version: "0.2.0",
            prng: "ChaCha8Rng",
            threads: dispatch.threads(),
            n_runs_per_preset: cli.runs,
            summary: Summary {
                total,
                passed,
                failed,
                pass_rate: passed as f64 / total as f64,
            },
            presets: reports,
        };

        let dir = std::path::Path::new("benchmark-results");
        let path = dir.join(format!("bench-{}.json", timestamp));
        let written = std::fs::create_dir_all(dir)
            .map_err(|e| e.to_string())
            .and_then(|_| serde_json::to_string_pretty(&report).map_err(|e| e.to_string()))
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("  Results saved to: {}\n", path.display()),
            Err(e) => eprintln!("  Failed to write {}: {e}\n", path.display()),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
