use anyhow::Context;
use clap::Parser;

use feels_auction_sim::{create_example_config, run, SimConfig};

#[derive(Parser, Debug)]
#[command(name = "feels-auction-sim")]
#[command(about = "Replay a scripted trade sequence against the Feels launch auction")]
struct Args {
    /// Path to simulation configuration file
    #[arg(short, long, default_value = "sim.toml")]
    config: String,

    /// Print the slug layout of every epoch instead of the report
    #[arg(long)]
    dump_slugs: bool,

    /// Write an example configuration to this path and exit
    #[arg(long)]
    init_config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    if let Some(path) = args.init_config {
        create_example_config(&path).with_context(|| format!("writing {}", path))?;
        return Ok(());
    }

    let config = SimConfig::load(&args.config)?;
    log::info!(
        "Loaded auction: ticks {} -> {}, {} epochs, {} scripted trades",
        config.auction.start_tick,
        config.auction.end_tick,
        config.auction.num_epochs(),
        config.trades.len()
    );

    let report = run(&config).context("simulation failed")?;
    log::info!(
        "Auction {}: proceeds={}, sold={}, final tick={}",
        if report.snapshot.success { "graduated" } else { "exited" },
        report.snapshot.total_proceeds,
        report.snapshot.total_sold,
        report.snapshot.final_tick
    );

    let output = if args.dump_slugs {
        serde_json::to_string_pretty(&report.slug_dump())?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", output);
    Ok(())
}
