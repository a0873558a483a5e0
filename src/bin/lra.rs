//! LRA CLI: demo driver for the low-rank adaptation core
//!
//! Commands:
//!   lra decompose  — factorize a random matrix at a given rank
//!   lra analyze    — recommend a rank by singular-value energy
//!   lra adapt      — build an adapter and run a forward pass
//!   lra demo       — end-to-end walkthrough

use lra_core::{analyze_rank, decompose, InitStrategy, LoraAdapter};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::process::ExitCode;

fn print_usage() {
    println!(
        r#"
LRA v{} : Low-Rank Adaptation core

Usage: lra <command> [options]

Commands:
  decompose <m> <n> <rank>            Factorize a random m x n matrix at the given rank
  analyze   <m> <n> [threshold]       Recommend a rank capturing the energy threshold (default 0.95)
  adapt     <out> <in> <rank> [alpha] Build an adapter over a random frozen base and run it
  demo                                Run the full walkthrough

Examples:
  lra decompose 100 80 8
  lra analyze 100 80 0.9
  lra adapt 64 64 4 8.0
  lra demo
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let result = match args[1].as_str() {
        "decompose" => cmd_decompose(&args[2..]),
        "analyze" => cmd_analyze(&args[2..]),
        "adapt" => cmd_adapt(&args[2..]),
        "demo" => cmd_demo(),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_usize(args: &[String], idx: usize, name: &str) -> Result<usize, String> {
    args.get(idx)
        .ok_or_else(|| format!("missing argument: {}", name))?
        .parse()
        .map_err(|_| format!("invalid {}: {}", name, args[idx]))
}

fn cmd_decompose(args: &[String]) -> Result<(), String> {
    let m = parse_usize(args, 0, "m")?;
    let n = parse_usize(args, 1, "n")?;
    let rank = parse_usize(args, 2, "rank")?;

    let w = DMatrix::new_random(m, n);
    let factors = decompose(&w, rank).map_err(|e| e.to_string())?;

    println!("  W: {}x{} | rank {} factors: A {}x{}, B {}x{}", m, n, rank, m, rank, rank, n);
    println!("  reconstruction error (Frobenius): {:.6}", factors.reconstruction_error(&w));
    println!("  compression: {:.1}x", factors.compression_ratio());
    Ok(())
}

fn cmd_analyze(args: &[String]) -> Result<(), String> {
    let m = parse_usize(args, 0, "m")?;
    let n = parse_usize(args, 1, "n")?;
    let threshold: f64 = match args.get(2) {
        Some(t) => t.parse().map_err(|_| format!("invalid threshold: {}", t))?,
        None => 0.95,
    };

    let w = DMatrix::new_random(m, n);
    let analysis = analyze_rank(&w, threshold).map_err(|e| e.to_string())?;

    println!(
        "  {} singular values | top={:.4} | recommended rank={} | compression={:.1}x",
        analysis.singular_values.len(),
        analysis.singular_values[0],
        analysis.recommended_rank,
        analysis.compression_ratio,
    );
    Ok(())
}

fn cmd_adapt(args: &[String]) -> Result<(), String> {
    let out = parse_usize(args, 0, "out")?;
    let inp = parse_usize(args, 1, "in")?;
    let rank = parse_usize(args, 2, "rank")?;
    let alpha: f64 = match args.get(3) {
        Some(a) => a.parse().map_err(|_| format!("invalid alpha: {}", a))?,
        None => 1.0,
    };

    let mut rng = StdRng::seed_from_u64(0);
    let base_weight = DMatrix::new_random(out, inp);
    let base_bias = DVector::new_random(out);
    let adapter =
        LoraAdapter::new(base_weight, base_bias, rank, alpha, InitStrategy::default(), &mut rng)
            .map_err(|e| e.to_string())?;

    println!("  {}", adapter.summary());
    let x = DVector::new_random(inp);
    let y = adapter.forward(&x).map_err(|e| e.to_string())?;
    println!("  forward: input dim {} -> output dim {}", x.len(), y.len());

    let json = serde_json::to_string(&adapter).map_err(|e| e.to_string())?;
    println!("  JSON export: {} bytes", json.len());
    Ok(())
}

fn cmd_demo() -> Result<(), String> {
    println!("== 1. Decompose a 100x80 matrix at rank 8");
    cmd_decompose(&["100".into(), "80".into(), "8".into()])?;

    println!("== 2. Recommend a rank for 95% energy");
    cmd_analyze(&["100".into(), "80".into()])?;

    println!("== 3. Adapt a frozen 64x64 base at rank 4, alpha 8");
    cmd_adapt(&["64".into(), "64".into(), "4".into(), "8.0".into()])?;

    println!("== done");
    Ok(())
}
