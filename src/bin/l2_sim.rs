//! 链路层场景仿真
//!
//! 读取场景 JSON，运行仿真，逐行打印传输结果。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use l2sim_rs::net::{NetWorld, TxReport};
use l2sim_rs::sim::{SimTime, Simulator};
use l2sim_rs::topo::{ScenarioError, build_scenario, load_scenario};
use l2sim_rs::viz::VizLogger;

#[derive(Debug, Parser)]
#[command(name = "l2_sim", about = "Run a link-layer scenario (hubs, switches, CSMA/CD, sliding window)")]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Run until this time (ms); defaults to running until no events remain
    #[arg(long)]
    until_ms: Option<u64>,

    /// Override the scenario's backoff seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output viz JSON file (replay log)
    #[arg(long)]
    viz_json: Option<PathBuf>,
}

fn format_report(r: &TxReport) -> String {
    let mut line = format!(
        "report at_ns={} outcome={:?} src={} dst={} retries={}",
        r.at.0, r.outcome, r.src, r.dst, r.retries
    );
    if let Some((first, last)) = r.seq_range {
        line.push_str(&format!(" seq={first}..={last}"));
    }
    if let Some(id) = r.transfer {
        line.push_str(&format!(" transfer={id}"));
    }
    line
}

fn run(args: Args) -> Result<(), ScenarioError> {
    let mut spec = load_scenario(&args.scenario)?;
    if args.seed.is_some() {
        spec.seed = args.seed;
    }

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let built = build_scenario(&mut world, &mut sim, &spec)?;

    if args.viz_json.is_some() {
        world.net.viz = Some(VizLogger::default());
        world.net.emit_viz_meta();
    }

    match args.until_ms {
        Some(ms) => sim.run_until(SimTime::from_millis(ms), &mut world),
        None => sim.run(&mut world),
    }

    for r in &world.net.reports {
        println!("{}", format_report(r));
    }
    for id in &built.transfers {
        if let Some(conn) = world.net.transfer(*id) {
            println!(
                "transfer id={} state={:?} received={:?}",
                id,
                conn.state(),
                String::from_utf8_lossy(conn.received_message())
            );
        }
    }

    let stats = &world.net.stats;
    println!(
        "done @ {:?}, delivered_frames={}, delivered_bytes={}, collisions={}, integrity_drops={}, reports={}",
        sim.now(),
        stats.delivered_frames,
        stats.delivered_bytes,
        stats.collisions,
        stats.integrity_drops,
        world.net.reports.len()
    );

    if let (Some(path), Some(v)) = (args.viz_json, &world.net.viz) {
        let json = serde_json::to_string_pretty(&v.events)?;
        fs::write(&path, json).map_err(|source| ScenarioError::Io {
            path: path.clone(),
            source,
        })?;
        eprintln!("wrote viz events to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    // 日志写到 stderr，stdout 只留结果行
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
