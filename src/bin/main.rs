//! Place service chains onto a substrate network and report the resulting load.

#![deny(missing_docs, missing_debug_implementations)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use kette::{
    input::{load_chains, load_functions, load_topology},
    placement::{Kette, PlacementReport},
    solver::SolverBackend,
};

#[derive(Debug, Parser)]
#[command(long_about = None)]
struct Args {
    /// The substrate topology (json).
    topology: PathBuf,
    /// The network function catalog (json).
    functions: PathBuf,
    /// The service chains to place (json).
    chains: PathBuf,
    /// Balance between link load and node load in the path cost.
    #[arg(short, long, default_value_t = 0.5)]
    alpha: f64,
    /// Number of candidate paths to score per demand.
    #[arg(short = 'k', long, default_value_t = 3)]
    num_paths: usize,
    /// The assignment backend. One of: dp, milp.
    #[arg(short, long, default_value_t = SolverBackend::Dp)]
    backend: SolverBackend,
    /// Keep going when a demand cannot be placed instead of aborting.
    #[arg(long, default_value_t = false)]
    continue_on_error: bool,
    /// Allow reservations to exceed node and link capacities.
    #[arg(long, default_value_t = false)]
    allow_oversubscription: bool,
    /// Hide the progress bar.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
    /// Write every placement to this file (json).
    #[arg(short, long)]
    placements: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let substrate = load_topology(&args.topology).context("loading the topology")?;
    let catalog = load_functions(&args.functions).context("loading the function catalog")?;
    let chains =
        load_chains(&args.chains, &substrate, &catalog).context("loading the service chains")?;

    let mut kette = Kette::new(substrate, chains);
    kette
        .set_alpha(args.alpha)
        .set_num_paths(args.num_paths)
        .set_backend(args.backend)
        .allow_oversubscription(args.allow_oversubscription)
        .continue_on_error(args.continue_on_error);
    if args.quiet {
        kette.hide_progress();
    }

    let report = kette.place().context("placing the service chains")?;

    print_report(&report);

    if let Some(path) = args.placements {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report.placements)
            .context("writing the placements")?;
    }

    Ok(())
}

fn print_report(report: &PlacementReport) {
    for p in &report.placements {
        println!(
            "{: >12} {: <6} {: <40} [{}]",
            p.chain,
            p.user,
            p.path.iter().join(" -> "),
            p.assigned.iter().join(", "),
        );
    }

    println!();
    println!(
        "placed {} demands, {} failed, in {:.3}s",
        report.placements.len(),
        report.num_failed,
        report.elapsed_sec,
    );
    println!(
        "worst node: {} cpu, {} mem | worst link: {}",
        fmt_perc(report.max_node_cpu_utilization_percent()),
        fmt_perc(report.max_node_mem_utilization_percent()),
        fmt_perc(report.max_link_utilization_percent()),
    );
}

fn fmt_perc(p: f64) -> String {
    if approx::relative_eq!(p, 0.0, epsilon = 1e-9) {
        "0%".to_string()
    } else {
        format!("{p:.3}%")
    }
}
